//! Payment Service
//!
//! Orchestrates the gateway and the order domain: intent creation with
//! lazy customer provisioning, synchronous confirmation, refunds, and
//! webhook handling. All order-side effects funnel through the order
//! service's idempotent payment reconciliation.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::webhook::{self, WebhookEvent, WebhookEventKind};
use super::PaymentGateway;
use crate::auth::CurrentUser;
use crate::core::config::{PricingConfig, StripeConfig};
use crate::db::models::{Order, PaymentStatus, UserRole};
use crate::db::repository::UserRepository;
use crate::orders::{pricing, OrderService};
use crate::realtime::Notifier;
use crate::utils::{AppError, AppResult};

/// Response for intent creation: the client finishes the payment with
/// the processor's client secret
#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub intent_id: String,
    pub client_secret: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Clone)]
pub struct PaymentService {
    db: Surreal<Db>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    stripe: StripeConfig,
    pricing: PricingConfig,
}

impl PaymentService {
    pub fn new(
        db: Surreal<Db>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        stripe: StripeConfig,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            notifier,
            stripe,
            pricing,
        }
    }

    fn orders(&self) -> OrderService {
        OrderService::new(
            self.db.clone(),
            self.notifier.clone(),
            self.pricing.clone(),
        )
    }

    fn users(&self) -> UserRepository {
        UserRepository::new(self.db.clone())
    }

    async fn load_own_order(&self, user: &CurrentUser, order_id: &str) -> AppResult<Order> {
        let order = self.orders().get(order_id).await.map_err(AppError::from)?;
        if user.role != UserRole::Admin && order.customer.to_string() != user.id {
            return Err(AppError::forbidden("Not your order"));
        }
        Ok(order)
    }

    /// Ensure the user has a processor-side customer, creating one lazily.
    async fn ensure_customer(&self, user_id: &str) -> AppResult<String> {
        let users = self.users();
        let user = users
            .find_by_id(user_id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        if let Some(customer_id) = user.stripe_customer_id {
            return Ok(customer_id);
        }

        let customer = self.gateway.create_customer(&user.email, &user.name).await?;
        users
            .set_stripe_customer(user_id, &customer.id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        tracing::info!("Created payment customer {} for {}", customer.id, user.email);
        Ok(customer.id)
    }

    /// Create a payment intent for an unpaid order.
    pub async fn create_intent(
        &self,
        user: &CurrentUser,
        order_id: &str,
    ) -> AppResult<IntentResponse> {
        let order = self.load_own_order(user, order_id).await?;
        if !matches!(
            order.payment.status,
            PaymentStatus::Pending | PaymentStatus::Failed
        ) {
            return Err(AppError::conflict(format!(
                "Payment already {}",
                order.payment.status
            )));
        }

        let customer_id = self.ensure_customer(&order.customer.to_string()).await?;
        let amount_minor = pricing::to_minor_units(order.pricing.total);
        let intent = self
            .gateway
            .create_intent(
                amount_minor,
                &self.stripe.currency,
                Some(&customer_id),
                &order.id_string(),
            )
            .await?;

        self.orders()
            .attach_intent(order_id, &intent.id, None)
            .await
            .map_err(AppError::from)?;

        Ok(IntentResponse {
            intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_minor,
            currency: self.stripe.currency.clone(),
        })
    }

    /// Confirm an intent server-side with a payment method. The webhook
    /// remains the source of truth; a synchronous "succeeded" is applied
    /// eagerly and the later webhook delivery becomes a no-op.
    pub async fn confirm(
        &self,
        user: &CurrentUser,
        order_id: &str,
        payment_method_id: &str,
    ) -> AppResult<Order> {
        let order = self.load_own_order(user, order_id).await?;
        let intent_id = order
            .payment
            .intent_id
            .clone()
            .ok_or_else(|| AppError::business_rule("Order has no payment intent"))?;

        // Attach the method to the processor-side customer so later orders
        // can reuse it, and remember it as the user's default.
        let customer_id = self.ensure_customer(&order.customer.to_string()).await?;
        self.gateway
            .attach_payment_method(&customer_id, payment_method_id)
            .await?;
        self.users()
            .set_default_payment_method(&order.customer.to_string(), payment_method_id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let intent = self
            .gateway
            .confirm_intent(&intent_id, payment_method_id)
            .await?;

        let status = match intent.status.as_str() {
            "succeeded" => PaymentStatus::Completed,
            "processing" => PaymentStatus::Processing,
            other => {
                tracing::info!("Intent {} confirmed into state {other}", intent.id);
                PaymentStatus::Processing
            }
        };

        let mut updated = self
            .orders()
            .apply_payment_update(&intent_id, status, intent.latest_charge)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found("Order vanished during confirmation"))?;
        if updated.payment.method.is_none() {
            updated = self
                .orders()
                .attach_intent(order_id, &intent_id, Some(payment_method_id.to_string()))
                .await
                .map_err(AppError::from)?;
        }
        Ok(updated)
    }

    /// Refund a completed payment in full. Restaurant owners and admins
    /// only; ownership is checked by the API layer.
    pub async fn refund(&self, order_id: &str) -> AppResult<Order> {
        let order = self.orders().get(order_id).await.map_err(AppError::from)?;
        if order.payment.status != PaymentStatus::Completed {
            return Err(AppError::business_rule(format!(
                "Only completed payments can be refunded (payment is {})",
                order.payment.status
            )));
        }
        let intent_id = order
            .payment
            .intent_id
            .clone()
            .ok_or_else(|| AppError::business_rule("Order has no payment intent"))?;

        let receipt = self.gateway.refund(&intent_id).await?;
        tracing::info!(
            "Refund {} ({}) issued for {}",
            receipt.id,
            receipt.status,
            order.order_number
        );

        self.orders()
            .apply_payment_update(&intent_id, PaymentStatus::Refunded, None)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found("Order vanished during refund"))
    }

    /// Handle a raw webhook delivery: verify the signature, parse the
    /// event and reconcile it onto the matching order.
    pub async fn handle_webhook(&self, signature_header: &str, body: &str) -> AppResult<()> {
        webhook::verify_signature(
            &self.stripe.webhook_secret,
            signature_header,
            body,
            Utc::now().timestamp(),
        )?;

        let event = webhook::parse_event(body)?;
        self.apply_event(event).await
    }

    async fn apply_event(&self, event: WebhookEvent) -> AppResult<()> {
        let status = match &event.kind {
            WebhookEventKind::PaymentSucceeded => PaymentStatus::Completed,
            WebhookEventKind::PaymentFailed => PaymentStatus::Failed,
            WebhookEventKind::ChargeRefunded => PaymentStatus::Refunded,
            WebhookEventKind::Other(kind) => {
                tracing::debug!("Ignoring webhook event type {kind}");
                return Ok(());
            }
        };
        let Some(intent_id) = event.intent_id else {
            return Err(AppError::invalid("Event carries no payment intent id"));
        };

        self.orders()
            .apply_payment_update(&intent_id, status, event.charge_id)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
