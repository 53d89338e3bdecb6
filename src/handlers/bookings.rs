use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use super::{json_body, parse_body};
use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingInput, DateChange};
use crate::state::AppState;

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let input: BookingInput = parse_body(json_body(&body)?)?;
    let id = state.bookings.create(input)?;

    Ok(Json(json!({ "acknowledged": true, "insertedId": id })))
}

// GET /bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let db = state.conn("Failed to fetch bookings")?;
    let bookings = queries::list_bookings(&db, &BookingFilter::default())
        .map_err(|e| AppError::server("Failed to fetch bookings", e))?;
    Ok(Json(bookings))
}

// GET /my-bookings/:email
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let db = state.conn("Failed to fetch bookings")?;
    let bookings = queries::list_bookings(&db, &BookingFilter::owner(&email))
        .map_err(|e| AppError::server("Failed to fetch bookings", e))?;
    Ok(Json(bookings))
}

// PATCH /bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.bookings.cancel(&id)?;
    Ok(Json(json!({ "message": "Booking canceled successfully." })))
}

// PATCH /bookings/:id/modify
pub async fn modify_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Booking>, AppError> {
    let change: DateChange = parse_body(json_body(&body)?)?;
    let updated = state.bookings.modify(&id, &change)?;
    Ok(Json(updated))
}
