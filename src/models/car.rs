use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const AVAILABLE: &str = "Available";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Car {
    pub fn is_available(&self) -> bool {
        self.availability.as_deref() == Some(AVAILABLE)
    }

    /// Applies a partial update the way a `$set` would: named fields are
    /// overwritten, everything else is left alone. Returns whether any
    /// value actually changed.
    pub fn merge(&mut self, fields: &Map<String, Value>) -> bool {
        let before = self.clone();

        for (key, value) in fields {
            match key.as_str() {
                "_id" | "id" => {}
                "ownerEmail" => self.owner_email = value.as_str().map(str::to_string),
                "availability" => self.availability = value.as_str().map(str::to_string),
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }

        *self != before
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarInput {
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CarInput {
    pub fn into_car(mut self, id: String) -> Car {
        self.extra.remove("_id");
        self.extra.remove("id");
        Car {
            id,
            owner_email: self.owner_email,
            availability: self.availability,
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Car {
        CarInput {
            owner_email: Some("o@x.com".into()),
            availability: Some(AVAILABLE.into()),
            extra: json!({"carModel": "Civic"}).as_object().cloned().unwrap(),
        }
        .into_car("car-1".into())
    }

    #[test]
    fn test_merge_overwrites_named_fields() {
        let mut car = sample();
        let fields = json!({"availability": "Unavailable", "dailyPrice": 40, "_id": "other"});
        assert!(car.merge(fields.as_object().unwrap()));
        assert_eq!(car.id, "car-1");
        assert!(!car.is_available());
        assert_eq!(car.extra.get("dailyPrice"), Some(&json!(40)));
        assert_eq!(car.extra.get("carModel"), Some(&json!("Civic")));
    }

    #[test]
    fn test_merge_same_values_reports_unchanged() {
        let mut car = sample();
        let fields = json!({"availability": "Available", "carModel": "Civic"});
        assert!(!car.merge(fields.as_object().unwrap()));
    }

    #[test]
    fn test_serializes_with_mongo_style_id() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["_id"], "car-1");
        assert_eq!(value["ownerEmail"], "o@x.com");
        assert_eq!(value["carModel"], "Civic");
    }
}
