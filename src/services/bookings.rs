use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::check_window;
use crate::models::{Booking, BookingInput, BookingStatus, DateChange};
use crate::services::payments::{to_minor_units, PaymentGateway};

const CANCEL_NOT_FOUND: &str = "Booking not found or already canceled.";
const MODIFY_NOT_FOUND: &str = "Booking not found.";
const DATES_REQUIRED: &str = "Start and end dates are required.";

/// Result of a checkout confirmation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub success: bool,
    pub booking_id: String,
    /// Set when the session had already been turned into a booking and
    /// nothing new was written.
    pub already_confirmed: bool,
}

/// Owns every booking status transition. Storage and the payment provider
/// are handed in at construction.
pub struct BookingLifecycle {
    db: Arc<Mutex<Connection>>,
    payments: Arc<dyn PaymentGateway>,
    currency: String,
}

impl BookingLifecycle {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        payments: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            db,
            payments,
            currency: currency.into(),
        }
    }

    fn conn(&self, context: &'static str) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::server(context, "database lock poisoned"))
    }

    pub fn create(&self, mut input: BookingInput) -> Result<String, AppError> {
        if !BookingStatus::allowed_on_create(input.status) {
            let status = input.status.map(|s| s.as_str()).unwrap_or_default();
            return Err(AppError::Validation(format!(
                "Bookings cannot be created with status {status}."
            )));
        }
        if let (Some(start), Some(end)) = (input.start_date.as_deref(), input.end_date.as_deref()) {
            check_window(start, end).map_err(AppError::Validation)?;
        }

        input.strip_reserved();
        let booking = Booking::from_input(Uuid::new_v4().to_string(), input, Utc::now());

        let db = self.conn("Failed to create booking")?;
        queries::insert_booking(&db, &booking)
            .map_err(|e| AppError::server("Failed to create booking", e))?;

        tracing::info!(
            booking_id = %booking.id,
            car_id = ?booking.car_id,
            status = ?booking.status,
            "booking created"
        );
        Ok(booking.id)
    }

    pub fn cancel(&self, id: &str) -> Result<(), AppError> {
        let db = self.conn("Server error")?;

        let current = queries::get_booking(&db, id)
            .map_err(|e| AppError::server("Server error", e))?
            .ok_or_else(|| AppError::NotFound(CANCEL_NOT_FOUND.to_string()))?;

        if !BookingStatus::can_transition(current.status, BookingStatus::Cancelled) {
            return Err(AppError::NotFound(CANCEL_NOT_FOUND.to_string()));
        }

        let result = queries::update_booking_status(&db, id, BookingStatus::Cancelled)
            .map_err(|e| AppError::server("Server error", e))?;
        if result.modified == 0 {
            return Err(AppError::NotFound(CANCEL_NOT_FOUND.to_string()));
        }

        tracing::info!(booking_id = %id, from = ?current.status, "booking cancelled");
        Ok(())
    }

    pub fn modify(&self, id: &str, change: &DateChange) -> Result<Booking, AppError> {
        let (start, end) = change
            .both()
            .ok_or_else(|| AppError::Validation(DATES_REQUIRED.to_string()))?;
        check_window(start, end).map_err(AppError::Validation)?;

        let db = self.conn("Server error")?;

        let current = queries::get_booking(&db, id)
            .map_err(|e| AppError::server("Server error", e))?
            .ok_or_else(|| AppError::NotFound(MODIFY_NOT_FOUND.to_string()))?;
        if current.status.is_some_and(|s| s.is_terminal()) {
            return Err(AppError::Conflict(
                "Cancelled bookings cannot be modified.".to_string(),
            ));
        }

        let updated = queries::update_booking_dates(&db, id, start, end, Utc::now())
            .map_err(|e| AppError::server("Server error", e))?
            .ok_or_else(|| AppError::NotFound(MODIFY_NOT_FOUND.to_string()))?;

        tracing::info!(booking_id = %id, start_date = %start, end_date = %end, "booking dates modified");
        Ok(updated)
    }

    /// Starts a card payment and returns the client secret. Nothing is
    /// stored locally.
    pub async fn initiate_payment(&self, total_price: Option<f64>) -> Result<String, AppError> {
        let amount = total_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or(AppError::InvalidAmount)?;
        let amount_minor = to_minor_units(amount)
            .filter(|m| *m > 0)
            .ok_or(AppError::InvalidAmount)?;

        let intent = self
            .payments
            .create_payment_intent(amount_minor, &self.currency)
            .await
            .map_err(|e| AppError::gateway("Failed to create payment intent", e))?;

        tracing::info!(
            payment_intent = %intent.id,
            amount_minor,
            currency = %self.currency,
            "payment intent created"
        );
        Ok(intent.client_secret)
    }

    /// Records a booking for a checkout session the provider reports as
    /// paid. The session id doubles as the idempotency key.
    pub async fn confirm(&self, session_id: &str) -> Result<Confirmation, AppError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AppError::Validation("Session id is required.".to_string()));
        }

        if let Some(existing) = self.find_by_session(session_id)? {
            tracing::info!(session_id, booking_id = %existing.id, "session already confirmed");
            return Ok(Confirmation {
                success: true,
                booking_id: existing.id,
                already_confirmed: true,
            });
        }

        let session = self
            .payments
            .retrieve_checkout_session(session_id)
            .await
            .map_err(|e| AppError::gateway("Failed to confirm booking", e))?;

        if !session.is_paid() {
            tracing::warn!(session_id, payment_status = %session.payment_status, "checkout session not paid");
            return Err(AppError::PaymentNotCompleted);
        }

        let mut input = BookingInput::from_metadata(&session.metadata);
        if let (Some(total), Some(charged)) = (input.total_price, session.amount_total) {
            if to_minor_units(total) != Some(charged) {
                tracing::warn!(session_id, total, charged, "checkout amount does not match booking total");
                return Err(AppError::AmountMismatch);
            }
        }
        input.status = Some(BookingStatus::Confirmed);

        let mut booking = Booking::from_input(Uuid::new_v4().to_string(), input, Utc::now());
        booking.session_id = Some(session_id.to_string());

        let db = self.conn("Failed to confirm booking")?;

        if let Some(car_id) = booking.car_id.as_deref() {
            let car = queries::get_car(&db, car_id)
                .map_err(|e| AppError::server("Failed to confirm booking", e))?;
            if car.is_some_and(|c| !c.is_available()) {
                return Err(AppError::Conflict("Car is no longer available.".to_string()));
            }
        }

        let inserted = queries::insert_booking(&db, &booking)
            .map_err(|e| AppError::server("Failed to confirm booking", e))?;

        if !inserted {
            let existing = queries::get_booking_by_session(&db, session_id)
                .map_err(|e| AppError::server("Failed to confirm booking", e))?
                .ok_or_else(|| {
                    AppError::server("Failed to confirm booking", "session conflict without a record")
                })?;
            tracing::info!(session_id, booking_id = %existing.id, "lost confirmation race, reusing booking");
            return Ok(Confirmation {
                success: true,
                booking_id: existing.id,
                already_confirmed: true,
            });
        }

        tracing::info!(session_id, booking_id = %booking.id, "booking confirmed from payment");
        Ok(Confirmation {
            success: true,
            booking_id: booking.id,
            already_confirmed: false,
        })
    }

    fn find_by_session(&self, session_id: &str) -> Result<Option<Booking>, AppError> {
        let db = self.conn("Failed to confirm booking")?;
        queries::get_booking_by_session(&db, session_id)
            .map_err(|e| AppError::server("Failed to confirm booking", e))
    }
}
