use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fields the server owns; client copies of these are dropped on write.
const RESERVED_FIELDS: &[&str] = &["_id", "id", "bookingDate", "sessionId"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Paid => "Paid",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(BookingStatus::Pending),
            "Confirmed" => Some(BookingStatus::Confirmed),
            "Paid" => Some(BookingStatus::Paid),
            "Cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled)
    }

    /// Statuses a client may attach to a booking it creates directly.
    /// `Confirmed` is only ever written after the payment provider reports
    /// the checkout session as paid.
    pub fn allowed_on_create(status: Option<BookingStatus>) -> bool {
        matches!(
            status,
            None | Some(BookingStatus::Pending) | Some(BookingStatus::Paid)
        )
    }

    /// Transition table for existing records. `None` is a record stored
    /// without a status.
    pub fn can_transition(from: Option<BookingStatus>, to: BookingStatus) -> bool {
        use BookingStatus::*;

        match (from, to) {
            (Some(Cancelled), _) => false,
            (_, Cancelled) => true,
            (None | Some(Pending), Confirmed | Paid) => true,
            (Some(Confirmed), Paid) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored booking as it goes over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
    pub booking_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Booking {
    pub fn from_input(id: String, input: BookingInput, booking_date: DateTime<Utc>) -> Self {
        Self {
            id,
            car_id: input.car_id,
            owner_email: input.owner_email,
            customer_email: input.customer_email,
            start_date: input.start_date,
            end_date: input.end_date,
            price: input.price,
            total_price: input.total_price,
            status: input.status,
            booking_date,
            session_id: None,
            extra: input.extra,
        }
    }
}

/// Client-supplied booking payload. Unknown fields are kept in `extra`
/// and stored untouched.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    #[serde(default)]
    pub car_id: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default, alias = "userEmail")]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookingInput {
    /// Rebuilds a booking payload from checkout-session metadata, where the
    /// provider hands every value back as a string.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Self {
        let mut input = BookingInput::default();

        for (key, value) in metadata {
            match key.as_str() {
                "carId" => input.car_id = Some(value.clone()),
                "ownerEmail" => input.owner_email = Some(value.clone()),
                "customerEmail" | "userEmail" => input.customer_email = Some(value.clone()),
                "startDate" => input.start_date = Some(value.clone()),
                "endDate" => input.end_date = Some(value.clone()),
                "price" => input.price = parse_amount(value),
                "totalPrice" => input.total_price = parse_amount(value),
                "status" => {}
                _ => {
                    input.extra.insert(key.clone(), Value::String(value.clone()));
                }
            }
        }

        input.strip_reserved();
        input
    }

    pub fn strip_reserved(&mut self) {
        for field in RESERVED_FIELDS {
            self.extra.remove(*field);
        }
    }
}

/// Body of a date modification request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateChange {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl DateChange {
    /// Both boundaries, or `None` if either is missing or blank.
    pub fn both(&self) -> Option<(&str, &str)> {
        let start = self.start_date.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let end = self.end_date.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((start, end))
    }
}

/// Accepts `2024-01-05` as well as full RFC 3339 timestamps.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Rejects a window whose end precedes its start. Values that are not
/// recognisable dates are stored as sent.
pub fn check_window(start: &str, end: &str) -> Result<(), String> {
    match (parse_date(start), parse_date(end)) {
        (Some(s), Some(e)) if e < s => Err("End date must not be before start date.".to_string()),
        _ => Ok(()),
    }
}

fn parse_amount(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_amount(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid number: {s}"))),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}
