use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutSession, PaymentGateway, PaymentIntent};

pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn read_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        what: &str,
    ) -> anyhow::Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Stripe {what} failed");
            anyhow::bail!("Stripe API error ({status}) during {what}");
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("failed to parse Stripe {what} response"))
    }
}

#[derive(Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> anyhow::Result<PaymentIntent> {
        let amount = amount_minor.to_string();
        let resp = self
            .client
            .post(format!("{}/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("payment_method_types[]", "card"),
            ])
            .send()
            .await
            .context("failed to call Stripe payment_intents")?;

        let intent: StripePaymentIntent = Self::read_response(resp, "payment intent").await?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| anyhow::anyhow!("missing client_secret in Stripe response"))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> anyhow::Result<CheckoutSession> {
        anyhow::ensure!(
            !session_id.is_empty() && !session_id.contains('/'),
            "invalid checkout session id"
        );

        let resp = self
            .client
            .get(format!("{}/checkout/sessions/{session_id}", self.api_base))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .context("failed to call Stripe checkout sessions")?;

        Self::read_response(resp, "checkout session").await
    }
}
