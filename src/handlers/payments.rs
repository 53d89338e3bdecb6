use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::bookings::Confirmation;
use crate::state::AppState;

// POST /create-payment-intent
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = json_body(&body)?;
    let total_price = body.get("totalPrice").and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    });

    let client_secret = state.bookings.initiate_payment(total_price).await?;
    Ok(Json(json!({ "clientSecret": client_secret })))
}

// POST /confirm-booking
pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Confirmation>, AppError> {
    let body = json_body(&body)?;
    let session_id = body
        .get("sessionId")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let confirmation = state.bookings.confirm(session_id).await?;
    Ok(Json(confirmation))
}

#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub email: Option<String>,
}

// GET /payments?email=
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;

    let filter = BookingFilter {
        customer_email: Some(&email),
        status: Some(BookingStatus::Paid),
        newest_first: true,
        ..Default::default()
    };

    let db = state.conn("Failed to fetch payments")?;
    let payments = queries::list_bookings(&db, &filter)
        .map_err(|e| AppError::server("Failed to fetch payments", e))?;
    Ok(Json(payments))
}
