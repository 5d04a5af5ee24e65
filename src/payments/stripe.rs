//! Stripe gateway adapter
//!
//! Stripe's API is form-encoded over HTTPS with the secret key as HTTP
//! basic-auth username. Errors come back as `{"error": {"message": ...}}`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{Customer, PaymentError, PaymentGateway, PaymentIntent, RefundReceipt};
use crate::core::config::StripeConfig;

pub struct StripeGateway {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{path}", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.secret_key, None::<&str>)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::Upstream(format!("Request to {path} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Upstream(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error")?
                        .get("message")?
                        .as_str()
                        .map(|s| s.to_string())
                })
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(PaymentError::Upstream(message));
        }

        serde_json::from_str(&body)
            .map_err(|e| PaymentError::Upstream(format!("Unexpected response shape: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, PaymentError> {
        self.post_form(
            "/customers",
            &[("email", email.to_string()), ("name", name.to_string())],
        )
        .await
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        let _: serde_json::Value = self
            .post_form(
                &format!("/payment_methods/{payment_method_id}/attach"),
                &[("customer", customer_id.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        customer_id: Option<&str>,
        order_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut params = vec![
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_string()),
            ("metadata[order_id]", order_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        if let Some(customer) = customer_id {
            params.push(("customer", customer.to_string()));
        }
        self.post_form("/payment_intents", &params).await
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        self.post_form(
            &format!("/payment_intents/{intent_id}/confirm"),
            &[("payment_method", payment_method_id.to_string())],
        )
        .await
    }

    async fn refund(&self, intent_id: &str) -> Result<RefundReceipt, PaymentError> {
        self.post_form("/refunds", &[("payment_intent", intent_id.to_string())])
            .await
    }
}
