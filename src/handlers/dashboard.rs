use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::state::AppState;

// GET /my-cars/count/:email
pub async fn car_count(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let db = state.conn("Failed to fetch car count")?;
    let count = queries::count_cars(&db, &email)
        .map_err(|e| AppError::server("Failed to fetch car count", e))?;
    Ok(Json(json!({ "count": count })))
}

// GET /bookings/count/:email, bookings made as a renter
pub async fn booking_count(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let db = state.conn("Failed to fetch booking count")?;
    let count = queries::count_bookings(&db, &BookingFilter::customer(&email))
        .map_err(|e| AppError::server("Failed to fetch booking count", e))?;
    Ok(Json(json!({ "count": count })))
}

// GET /earnings/:email, as a car owner
pub async fn earnings(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let db = state.conn("Failed to fetch earnings")?;
    let total = queries::sum_booking_prices(&db, &BookingFilter::owner(&email))
        .map_err(|e| AppError::server("Failed to fetch earnings", e))?;
    Ok(Json(json!({ "total": total })))
}
