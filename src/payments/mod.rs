//! Payments
//!
//! Payment processing behind a gateway trait. The production adapter
//! talks to Stripe over HTTPS; tests run against a mock. Asynchronous
//! confirmation arrives through signed webhooks and is reconciled onto
//! orders idempotently.

pub mod service;
pub mod stripe;
pub mod webhook;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use service::PaymentService;
pub use stripe::StripeGateway;

use crate::utils::AppError;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider error: {0}")]
    Upstream(String),

    #[error("Invalid webhook signature: {0}")]
    Signature(String),

    #[error("Malformed webhook payload: {0}")]
    Payload(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Upstream(msg) => AppError::payment(msg),
            PaymentError::Signature(_) | PaymentError::Payload(_) => {
                AppError::invalid(err.to_string())
            }
        }
    }
}

/// Payment intent as returned by the processor
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Processor-side status string, e.g. "requires_payment_method",
    /// "processing", "succeeded"
    pub status: String,
    pub client_secret: Option<String>,
    pub latest_charge: Option<String>,
}

/// Processor-side customer
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// Refund as returned by the processor
#[derive(Debug, Clone, Deserialize)]
pub struct RefundReceipt {
    pub id: String,
    pub status: String,
}

/// Outbound port to the payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a processor-side customer for a user
    async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, PaymentError>;

    /// Attach a payment method to a customer
    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError>;

    /// Create a payment intent for an amount in minor units
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        customer_id: Option<&str>,
        order_id: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Confirm an intent with a payment method
    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Refund a payment intent in full
    async fn refund(&self, intent_id: &str) -> Result<RefundReceipt, PaymentError>;
}
