pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        .route("/", get(handlers::welcome))
        .route("/cars", get(handlers::cars::list_cars))
        .route("/add-car", post(handlers::cars::add_car))
        .route(
            "/cars/:id",
            get(handlers::cars::get_car)
                .put(handlers::cars::update_car)
                .delete(handlers::cars::delete_car),
        )
        .route("/my-cars/:email", get(handlers::cars::my_cars))
        .route("/my-cars/count/:email", get(handlers::dashboard::car_count))
        .route(
            "/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/my-bookings/:email", get(handlers::bookings::my_bookings))
        .route("/bookings/:id/cancel", patch(handlers::bookings::cancel_booking))
        .route("/bookings/:id/modify", patch(handlers::bookings::modify_booking))
        .route("/bookings/count/:email", get(handlers::dashboard::booking_count))
        .route("/earnings/:email", get(handlers::dashboard::earnings))
        .route(
            "/create-payment-intent",
            post(handlers::payments::create_payment_intent),
        )
        .route("/confirm-booking", post(handlers::payments::confirm_booking))
        .route("/payments", get(handlers::payments::list_payments))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
