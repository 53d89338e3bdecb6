pub mod bookings;
pub mod cars;
pub mod dashboard;
pub mod payments;

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::AppError;

pub async fn welcome() -> &'static str {
    "welcome to car rental server"
}

/// Deserializes a JSON body, turning shape errors into a 400 instead of
/// axum's default 422.
fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

/// Reads a request body as JSON regardless of its content type. An empty
/// body reads as `{}` so field validation still runs.
fn json_body(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))
}
