//! Payment service tests: mock gateway against an in-memory database

use std::sync::Arc;

use chrono::Utc;
use ring::hmac;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::mock::MockGateway;
use super::{PaymentGateway, PaymentService};
use crate::auth::CurrentUser;
use crate::core::config::{PricingConfig, StripeConfig};
use crate::db::DbService;
use crate::db::models::*;
use crate::db::repository::{MenuItemRepository, RestaurantRepository, UserRepository};
use crate::orders::{Actor, OrderCreateInput, OrderItemInput, OrderService};
use crate::realtime::Notifier;

const WEBHOOK_SECRET: &str = "whsec_test";

fn test_pricing() -> PricingConfig {
    PricingConfig {
        tax_rate: 0.08,
        service_fee_rate: 0.02,
        delivery_extra_minutes: 20,
        promo_code: "TASTY10".to_string(),
        promo_percent: 10.0,
    }
}

fn test_stripe() -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test_x".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        currency: "usd".to_string(),
        api_base: "http://localhost:0".to_string(),
    }
}

struct Fixture {
    db: Surreal<Db>,
    gateway: Arc<MockGateway>,
    payments: PaymentService,
    orders: OrderService,
    customer: CurrentUser,
    order: Order,
}

async fn fixture() -> Fixture {
    let db = DbService::memory().await.unwrap().db;

    let user = UserRepository::new(db.clone())
        .create(User {
            id: None,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "x".to_string(),
            role: UserRole::Customer,
            phone: None,
            addresses: vec![],
            stripe_customer_id: None,
            default_payment_method: None,
            created_at: Utc::now().to_rfc3339(),
        })
        .await
        .unwrap();

    let restaurant = RestaurantRepository::new(db.clone())
        .create(Restaurant {
            id: None,
            owner: surrealdb::RecordId::from(("user", "owner1")),
            name: "Testaurant".to_string(),
            description: None,
            cuisine: vec![],
            address: Address {
                street: "Plaza Mayor 1".to_string(),
                city: "Madrid".to_string(),
                postal_code: "28012".to_string(),
                latitude: 40.4168,
                longitude: -3.7038,
            },
            phone: None,
            is_active: true,
            opening_hours: vec![],
            timezone: "UTC".to_string(),
            delivery_radius_km: 5.0,
            delivery_fee: 3.0,
            minimum_order: 0.0,
            rating: 0.0,
            rating_count: 0,
            created_at: Utc::now().to_rfc3339(),
        })
        .await
        .unwrap();

    let item = MenuItemRepository::new(db.clone())
        .create(MenuItem {
            id: None,
            restaurant: restaurant.id.clone().unwrap(),
            name: "Tortilla".to_string(),
            description: None,
            price: 10.0,
            discounted_price: None,
            customization_groups: vec![],
            dietary: vec![],
            preparation_minutes: 15,
            is_available: true,
            created_at: Utc::now().to_rfc3339(),
        })
        .await
        .unwrap();

    let orders = OrderService::new(db.clone(), Notifier::disabled(), test_pricing());
    let actor = Actor {
        id: user.id_string(),
        name: user.name.clone(),
        role: UserRole::Customer,
    };
    let order = orders
        .create_order(
            &actor,
            OrderCreateInput {
                restaurant: restaurant.id_string(),
                order_type: OrderType::Pickup,
                items: vec![OrderItemInput {
                    menu_item: item.id_string(),
                    quantity: 2,
                    customizations: vec![],
                }],
                delivery_address: None,
                promo_code: None,
            },
        )
        .await
        .unwrap();

    let gateway = Arc::new(MockGateway::new());
    let payments = PaymentService::new(
        db.clone(),
        gateway.clone() as Arc<dyn PaymentGateway>,
        Notifier::disabled(),
        test_stripe(),
        test_pricing(),
    );
    let customer = CurrentUser {
        id: user.id_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: UserRole::Customer,
    };

    Fixture {
        db,
        gateway,
        payments,
        orders,
        customer,
        order,
    }
}

fn sign(payload: &str, timestamp: i64) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, WEBHOOK_SECRET.as_bytes());
    let tag = hmac::sign(&key, format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(tag.as_ref()))
}

fn succeeded_event(intent_id: &str) -> String {
    format!(
        r#"{{"type":"payment_intent.succeeded","data":{{"object":{{"id":"{intent_id}","latest_charge":"ch_hook"}}}}}}"#
    )
}

#[tokio::test]
async fn test_create_intent_provisions_customer_lazily() {
    let fx = fixture().await;

    let response = fx
        .payments
        .create_intent(&fx.customer, &fx.order.id_string())
        .await
        .unwrap();
    // 22.00 total in minor units
    assert_eq!(response.amount_minor, 2200);
    assert_eq!(fx.gateway.call_count("create_customer"), 1);

    let user = UserRepository::new(fx.db.clone())
        .find_by_id(&fx.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert!(user.stripe_customer_id.is_some());

    let order = fx.orders.get(&fx.order.id_string()).await.unwrap();
    assert_eq!(order.payment.intent_id.as_deref(), Some(response.intent_id.as_str()));

    // Second intent reuses the stored customer
    fx.payments
        .create_intent(&fx.customer, &fx.order.id_string())
        .await
        .unwrap();
    assert_eq!(fx.gateway.call_count("create_customer"), 1);
}

#[tokio::test]
async fn test_confirm_completes_payment_and_confirms_order() {
    let fx = fixture().await;
    let id = fx.order.id_string();

    fx.payments.create_intent(&fx.customer, &id).await.unwrap();
    let order = fx
        .payments
        .confirm(&fx.customer, &id, "pm_card")
        .await
        .unwrap();

    assert_eq!(order.payment.status, PaymentStatus::Completed);
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert!(order.payment.transaction_id.is_some());
}

#[tokio::test]
async fn test_confirm_attaches_method_to_customer() {
    let fx = fixture().await;
    let id = fx.order.id_string();

    fx.payments.create_intent(&fx.customer, &id).await.unwrap();
    fx.payments
        .confirm(&fx.customer, &id, "pm_card")
        .await
        .unwrap();

    assert_eq!(fx.gateway.call_count("attach"), 1);
    let user = UserRepository::new(fx.db.clone())
        .find_by_id(&fx.customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.default_payment_method.as_deref(), Some("pm_card"));
}

#[tokio::test]
async fn test_foreign_order_is_forbidden() {
    let fx = fixture().await;
    let stranger = CurrentUser {
        id: "user:other".to_string(),
        name: "Mallory".to_string(),
        email: "m@example.com".to_string(),
        role: UserRole::Customer,
    };
    let err = fx
        .payments
        .create_intent(&stranger, &fx.order.id_string())
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_create_intent_conflicts_once_paid() {
    let fx = fixture().await;
    let id = fx.order.id_string();

    fx.payments.create_intent(&fx.customer, &id).await.unwrap();
    fx.payments
        .confirm(&fx.customer, &id, "pm_card")
        .await
        .unwrap();

    let err = fx
        .payments
        .create_intent(&fx.customer, &id)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::AppError::Conflict(_)));
}

#[tokio::test]
async fn test_webhook_end_to_end_and_replay() {
    let fx = fixture().await;
    let id = fx.order.id_string();

    let response = fx.payments.create_intent(&fx.customer, &id).await.unwrap();
    let body = succeeded_event(&response.intent_id);
    let now = Utc::now().timestamp();

    fx.payments
        .handle_webhook(&sign(&body, now), &body)
        .await
        .unwrap();
    let order = fx.orders.get(&id).await.unwrap();
    assert_eq!(order.payment.status, PaymentStatus::Completed);
    assert_eq!(order.status, OrderStatus::Confirmed);
    let timeline_len = order.timeline.len();

    // Replayed delivery is accepted but changes nothing
    fx.payments
        .handle_webhook(&sign(&body, now), &body)
        .await
        .unwrap();
    let order = fx.orders.get(&id).await.unwrap();
    assert_eq!(order.timeline.len(), timeline_len);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let fx = fixture().await;
    let body = succeeded_event("pi_whatever");
    let err = fx
        .payments
        .handle_webhook("t=0,v1=deadbeef", &body)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::AppError::Invalid(_)));
}

#[tokio::test]
async fn test_refund_requires_completed_payment() {
    let fx = fixture().await;
    let id = fx.order.id_string();

    let err = fx.payments.refund(&id).await.unwrap_err();
    assert!(matches!(err, crate::utils::AppError::BusinessRule(_)));

    fx.payments.create_intent(&fx.customer, &id).await.unwrap();
    fx.payments
        .confirm(&fx.customer, &id, "pm_card")
        .await
        .unwrap();

    let order = fx.payments.refund(&id).await.unwrap();
    assert_eq!(order.payment.status, PaymentStatus::Refunded);
    assert_eq!(order.status, OrderStatus::Refunded);
    assert_eq!(fx.gateway.call_count("refund"), 1);
}

#[tokio::test]
async fn test_gateway_failure_surfaces_as_upstream_error() {
    let fx = fixture().await;
    *fx.gateway.fail_next.lock().unwrap() = true;
    let err = fx
        .payments
        .create_intent(&fx.customer, &fx.order.id_string())
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::AppError::PaymentUpstream(_)));
}
