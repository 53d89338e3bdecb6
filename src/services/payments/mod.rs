pub mod stripe;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider-side pre-authorization. Only the client secret leaves the
/// service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Hosted checkout session as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    /// Amount charged in minor units, when the provider reports it.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> anyhow::Result<PaymentIntent>;

    async fn retrieve_checkout_session(&self, session_id: &str) -> anyhow::Result<CheckoutSession>;
}

/// Converts a major-unit amount (dollars) to the provider's minor units
/// (cents), rounding to the nearest unit. `None` when the result is not a
/// finite value that fits in an `i64`.
pub fn to_minor_units(amount: f64) -> Option<i64> {
    let minor = (amount * 100.0).round();
    if !minor.is_finite() || minor.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(minor as i64)
}
