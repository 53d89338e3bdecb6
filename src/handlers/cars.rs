use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{json_body, parse_body};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Car, CarInput};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CarsQuery {
    pub available: Option<String>,
}

// GET /cars?available=true
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CarsQuery>,
) -> Result<Json<Vec<Car>>, AppError> {
    let available_only = query.available.as_deref() == Some("true");

    let db = state.conn("Failed to fetch cars")?;
    let cars = queries::list_cars(&db, None, available_only)
        .map_err(|e| AppError::server("Failed to fetch cars", e))?;
    Ok(Json(cars))
}

// POST /add-car
pub async fn add_car(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let input: CarInput = parse_body(json_body(&body)?)?;
    let car = input.into_car(Uuid::new_v4().to_string());

    let db = state.conn("Failed to add car")?;
    queries::insert_car(&db, &car).map_err(|e| AppError::server("Failed to add car", e))?;

    tracing::info!(car_id = %car.id, owner = ?car.owner_email, "car added");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "acknowledged": true, "insertedId": car.id, "message": "Car added" })),
    ))
}

// GET /cars/:id
pub async fn get_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Car>, (StatusCode, Json<Value>)> {
    let car = {
        let db = state.conn("Failed to fetch car").map_err(car_error)?;
        queries::get_car(&db, &id).map_err(|e| car_error(AppError::server("Failed to fetch car", e)))?
    };

    car.map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({ "error": "Car not found" }))))
}

// PUT /cars/:id
pub async fn update_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = json_body(&body)?;
    let fields = body
        .as_object()
        .ok_or_else(|| AppError::Validation("Car update must be a JSON object".to_string()))?;

    let db = state.conn("Failed to update car")?;
    let result = queries::update_car(&db, &id, fields)
        .map_err(|e| AppError::server("Failed to update car", e))?;

    Ok(Json(json!({
        "acknowledged": true,
        "matchedCount": result.matched,
        "modifiedCount": result.modified,
    })))
}

// DELETE /cars/:id
pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let db = state.conn("Failed to delete car")?;
    let deleted = queries::delete_car(&db, &id)
        .map_err(|e| AppError::server("Failed to delete car", e))?;

    if !deleted {
        return Err(AppError::NotFound("Car not found".to_string()));
    }
    tracing::info!(car_id = %id, "car deleted");
    Ok(Json(json!({ "deletedCount": 1 })))
}

// GET /my-cars/:email
pub async fn my_cars(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Car>>, AppError> {
    let db = state.conn("Failed to fetch cars")?;
    let cars = queries::list_cars(&db, Some(&email), false)
        .map_err(|e| AppError::server("Failed to fetch cars", e))?;
    Ok(Json(cars))
}

fn car_error(err: AppError) -> (StatusCode, Json<Value>) {
    (
        err.status(),
        Json(json!({ "error": err.to_string() })),
    )
}
