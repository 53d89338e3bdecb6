use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::bookings::BookingLifecycle;
use crate::services::payments::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub bookings: BookingLifecycle,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig, payments: Arc<dyn PaymentGateway>) -> Self {
        let db = Arc::new(Mutex::new(db));
        let bookings = BookingLifecycle::new(Arc::clone(&db), payments, config.currency.clone());
        Self {
            db,
            config,
            bookings,
        }
    }

    pub fn conn(&self, context: &'static str) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::server(context, "database lock poisoned"))
    }
}
