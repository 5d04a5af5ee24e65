//! Order service tests against an in-memory database

use chrono::Utc;
use surrealdb::RecordId;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::*;
use crate::core::config::PricingConfig;
use crate::db::DbService;
use crate::db::models::*;
use crate::db::repository::{MenuItemRepository, OrderRepository, RestaurantRepository};
use crate::realtime::Notifier;

// ========== Fixtures ==========

fn test_pricing() -> PricingConfig {
    PricingConfig {
        tax_rate: 0.08,
        service_fee_rate: 0.02,
        delivery_extra_minutes: 20,
        promo_code: "TASTY10".to_string(),
        promo_percent: 10.0,
    }
}

async fn test_db() -> Surreal<Db> {
    DbService::memory().await.unwrap().db
}

fn service(db: &Surreal<Db>) -> OrderService {
    OrderService::new(db.clone(), Notifier::disabled(), test_pricing())
}

fn customer() -> Actor {
    Actor {
        id: "user:cust1".to_string(),
        name: "Alice".to_string(),
        role: UserRole::Customer,
    }
}

fn restaurant_actor() -> Actor {
    Actor {
        id: "user:owner1".to_string(),
        name: "Bob".to_string(),
        role: UserRole::Restaurant,
    }
}

fn courier() -> Actor {
    Actor {
        id: "user:courier1".to_string(),
        name: "Carol".to_string(),
        role: UserRole::Delivery,
    }
}

// Madrid city centre
const REST_LAT: f64 = 40.4168;
const REST_LNG: f64 = -3.7038;

fn near_address() -> Address {
    Address {
        street: "Calle Mayor 1".to_string(),
        city: "Madrid".to_string(),
        postal_code: "28013".to_string(),
        latitude: 40.42,
        longitude: -3.70,
    }
}

async fn seed_restaurant(db: &Surreal<Db>, minimum_order: f64) -> Restaurant {
    let repo = RestaurantRepository::new(db.clone());
    repo.create(Restaurant {
        id: None,
        owner: RecordId::from(("user", "owner1")),
        name: "Testaurant".to_string(),
        description: None,
        cuisine: vec!["tapas".to_string()],
        address: Address {
            street: "Plaza Mayor 1".to_string(),
            city: "Madrid".to_string(),
            postal_code: "28012".to_string(),
            latitude: REST_LAT,
            longitude: REST_LNG,
        },
        phone: None,
        is_active: true,
        opening_hours: Vec::new(),
        timezone: "UTC".to_string(),
        delivery_radius_km: 5.0,
        delivery_fee: 3.0,
        minimum_order,
        rating: 0.0,
        rating_count: 0,
        created_at: Utc::now().to_rfc3339(),
    })
    .await
    .unwrap()
}

async fn seed_item(db: &Surreal<Db>, restaurant: &Restaurant, price: f64) -> MenuItem {
    let repo = MenuItemRepository::new(db.clone());
    repo.create(MenuItem {
        id: None,
        restaurant: restaurant.id.clone().unwrap(),
        name: "Tortilla".to_string(),
        description: None,
        price,
        discounted_price: None,
        customization_groups: vec![CustomizationGroup {
            name: "Size".to_string(),
            options: vec![
                CustomizationOption {
                    name: "Regular".to_string(),
                    surcharge: 0.0,
                },
                CustomizationOption {
                    name: "Large".to_string(),
                    surcharge: 1.25,
                },
            ],
        }],
        dietary: vec!["vegetarian".to_string()],
        preparation_minutes: 15,
        is_available: true,
        created_at: Utc::now().to_rfc3339(),
    })
    .await
    .unwrap()
}

fn delivery_input(restaurant: &Restaurant, item: &MenuItem, quantity: i32) -> OrderCreateInput {
    OrderCreateInput {
        restaurant: restaurant.id_string(),
        order_type: OrderType::Delivery,
        items: vec![OrderItemInput {
            menu_item: item.id_string(),
            quantity,
            customizations: Vec::new(),
        }],
        delivery_address: Some(near_address()),
        promo_code: None,
    }
}

async fn place_order(db: &Surreal<Db>) -> (OrderService, Order) {
    let restaurant = seed_restaurant(db, 5.0).await;
    let item = seed_item(db, &restaurant, 10.0).await;
    let svc = service(db);
    let order = svc
        .create_order(&customer(), delivery_input(&restaurant, &item, 2))
        .await
        .unwrap();
    (svc, order)
}

/// Walk an order to delivered through the normal pipeline
async fn deliver(svc: &OrderService, order_id: &str) -> Order {
    svc.transition_status(order_id, OrderStatus::ReadyForPickup, &restaurant_actor())
        .await
        .unwrap();
    svc.assign_courier(order_id, &courier()).await.unwrap();
    svc.transition_status(order_id, OrderStatus::Delivered, &courier())
        .await
        .unwrap()
}

// ========== Creation & pricing ==========

#[tokio::test]
async fn test_create_order_pricing_and_snapshot() {
    let db = test_db().await;
    let (_, order) = place_order(&db).await;

    // subtotal $20 -> tax $1.60, delivery $3, service $0.40, total $25.00
    assert_eq!(order.pricing.subtotal, 20.0);
    assert_eq!(order.pricing.tax, 1.60);
    assert_eq!(order.pricing.delivery_fee, 3.0);
    assert_eq!(order.pricing.service_fee, 0.40);
    assert_eq!(order.pricing.total, 25.0);

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Pending);
    assert_eq!(order.timeline.len(), 1);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.items[0].name, "Tortilla");
    assert!(order.delivery.is_some());
    assert!(order.delivery.as_ref().unwrap().courier.is_none());
}

#[tokio::test]
async fn test_customization_surcharge_in_unit_price() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 2);
    input.items[0].customizations = vec![CustomizationChoice {
        group: "Size".to_string(),
        option: "Large".to_string(),
    }];
    let order = svc.create_order(&customer(), input).await.unwrap();

    assert_eq!(order.items[0].unit_price, 11.25);
    assert_eq!(order.items[0].line_total, 22.50);
    assert_eq!(order.items[0].customizations[0].surcharge, 1.25);
}

#[tokio::test]
async fn test_unknown_customization_rejected() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 1);
    input.items[0].customizations = vec![CustomizationChoice {
        group: "Size".to_string(),
        option: "Gigantic".to_string(),
    }];
    let err = svc.create_order(&customer(), input).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidItem(_)));
}

#[tokio::test]
async fn test_below_minimum_rejected_at_minimum_accepted() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 20.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let err = svc
        .create_order(&customer(), delivery_input(&restaurant, &item, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::BelowMinimum { .. }));

    // Exactly at the minimum passes
    let order = svc
        .create_order(&customer(), delivery_input(&restaurant, &item, 2))
        .await
        .unwrap();
    assert_eq!(order.pricing.subtotal, 20.0);
}

#[tokio::test]
async fn test_delivery_out_of_radius_rejected() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 1);
    // ~0.1 deg latitude north is roughly 11 km, radius is 5 km
    input.delivery_address = Some(Address {
        latitude: REST_LAT + 0.1,
        ..near_address()
    });
    let err = svc.create_order(&customer(), input).await.unwrap_err();
    assert!(matches!(err, OrderError::OutOfRange { .. }));
}

#[tokio::test]
async fn test_delivery_requires_address() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 1);
    input.delivery_address = None;
    let err = svc.create_order(&customer(), input).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}

#[tokio::test]
async fn test_pickup_skips_delivery_fee_and_tracking() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 2);
    input.order_type = OrderType::Pickup;
    input.delivery_address = None;
    let order = svc.create_order(&customer(), input).await.unwrap();

    assert_eq!(order.pricing.delivery_fee, 0.0);
    assert_eq!(order.pricing.total, 22.0);
    assert!(order.delivery.is_none());
}

#[tokio::test]
async fn test_inactive_restaurant_rejected() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    RestaurantRepository::new(db.clone())
        .update(
            &restaurant.id_string(),
            RestaurantUpdate {
                name: None,
                description: None,
                cuisine: None,
                address: None,
                phone: None,
                is_active: Some(false),
                opening_hours: None,
                timezone: None,
                delivery_radius_km: None,
                delivery_fee: None,
                minimum_order: None,
            },
        )
        .await
        .unwrap();

    let svc = service(&db);
    let err = svc
        .create_order(&customer(), delivery_input(&restaurant, &item, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotAvailable(_)));
}

#[tokio::test]
async fn test_unavailable_item_rejected() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    MenuItemRepository::new(db.clone())
        .update(
            &item.id_string(),
            MenuItemUpdate {
                name: None,
                description: None,
                price: None,
                discounted_price: None,
                customization_groups: None,
                dietary: None,
                preparation_minutes: None,
                is_available: Some(false),
            },
        )
        .await
        .unwrap();

    let svc = service(&db);
    let err = svc
        .create_order(&customer(), delivery_input(&restaurant, &item, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidItem(_)));
}

#[tokio::test]
async fn test_quantity_bounds() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 0.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    for quantity in [0, -1, 100] {
        let err = svc
            .create_order(&customer(), delivery_input(&restaurant, &item, quantity))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }
}

#[tokio::test]
async fn test_promo_code() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 2);
    input.promo_code = Some("tasty10".to_string());
    let order = svc.create_order(&customer(), input).await.unwrap();
    assert_eq!(order.pricing.discount, 2.0);
    assert_eq!(order.pricing.total, 23.0);

    let mut input = delivery_input(&restaurant, &item, 2);
    input.promo_code = Some("BOGUS".to_string());
    let err = svc.create_order(&customer(), input).await.unwrap_err();
    assert!(matches!(err, OrderError::UnknownPromoCode(_)));
}

// ========== Status pipeline ==========

#[tokio::test]
async fn test_transition_appends_one_timeline_entry() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    let order = svc
        .transition_status(&id, OrderStatus::Confirmed, &restaurant_actor())
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.timeline.len(), 2);

    let order = svc
        .transition_status(&id, OrderStatus::Preparing, &restaurant_actor())
        .await
        .unwrap();
    assert_eq!(order.timeline.len(), 3);
    assert_eq!(order.timeline[2].status, OrderStatus::Preparing);
    assert_eq!(order.timeline[2].actor_name, "Bob");
}

#[tokio::test]
async fn test_backward_transition_rejected() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.transition_status(&id, OrderStatus::Preparing, &restaurant_actor())
        .await
        .unwrap();
    let err = svc
        .transition_status(&id, OrderStatus::Confirmed, &restaurant_actor())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_role_restrictions_on_transition() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    // Customers cannot drive the pipeline
    let err = svc
        .transition_status(&id, OrderStatus::Confirmed, &customer())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    // Restaurants cannot set courier-side statuses
    let err = svc
        .transition_status(&id, OrderStatus::OnTheWay, &restaurant_actor())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
}

#[tokio::test]
async fn test_courier_transitions_require_assignment() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.transition_status(&id, OrderStatus::ReadyForPickup, &restaurant_actor())
        .await
        .unwrap();

    // A courier cannot grab the order by driving the status directly;
    // claiming goes through assignment
    let err = svc
        .transition_status(&id, OrderStatus::PickedUp, &courier())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
    let order = svc.get(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::ReadyForPickup);
    assert!(order.delivery.as_ref().unwrap().courier.is_none());

    svc.assign_courier(&id, &courier()).await.unwrap();

    // A foreign courier cannot touch an assigned order
    let other = Actor {
        id: "user:courier2".to_string(),
        name: "Dave".to_string(),
        role: UserRole::Delivery,
    };
    let err = svc
        .transition_status(&id, OrderStatus::Delivered, &other)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    // The assigned courier drives it to the end
    let order = svc
        .transition_status(&id, OrderStatus::Delivered, &courier())
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
}

// ========== Courier assignment ==========

#[tokio::test]
async fn test_assign_courier() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.transition_status(&id, OrderStatus::ReadyForPickup, &restaurant_actor())
        .await
        .unwrap();
    let order = svc.assign_courier(&id, &courier()).await.unwrap();

    assert_eq!(order.status, OrderStatus::PickedUp);
    let delivery = order.delivery.as_ref().unwrap();
    assert_eq!(delivery.courier_name.as_deref(), Some("Carol"));
    assert!(delivery.estimated_delivery_at.is_some());
}

#[tokio::test]
async fn test_assign_requires_ready_for_pickup() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let err = svc
        .assign_courier(&order.id_string(), &courier())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_assign_rejected_for_pickup_order() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    let mut input = delivery_input(&restaurant, &item, 2);
    input.order_type = OrderType::Pickup;
    input.delivery_address = None;
    let order = svc.create_order(&customer(), input).await.unwrap();

    let err = svc
        .assign_courier(&order.id_string(), &courier())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}

// ========== Cancellation ==========

#[tokio::test]
async fn test_cancel_pending_order() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;

    let order = svc
        .cancel(&order.id_string(), "Changed my mind", &customer())
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.cancellation.as_ref().unwrap().reason, "Changed my mind");
    assert_eq!(order.timeline.len(), 2);
}

#[tokio::test]
async fn test_cancel_rejected_after_pickup() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.transition_status(&id, OrderStatus::ReadyForPickup, &restaurant_actor())
        .await
        .unwrap();
    svc.assign_courier(&id, &courier()).await.unwrap();

    let err = svc.cancel(&id, "Too late", &customer()).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::NotCancellable(OrderStatus::PickedUp)
    ));
}

#[tokio::test]
async fn test_customer_cannot_cancel_foreign_order() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;

    let stranger = Actor {
        id: "user:other".to_string(),
        name: "Mallory".to_string(),
        role: UserRole::Customer,
    };
    let err = svc
        .cancel(&order.id_string(), "Not mine", &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
}

// ========== Rating ==========

#[tokio::test]
async fn test_rate_only_after_delivery_and_once() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    let rating = RatingInput {
        food: 5,
        delivery: 4,
        overall: 5,
        comment: Some("Great tortilla".to_string()),
    };

    let err = svc.rate(&id, &customer(), rating.clone()).await.unwrap_err();
    assert!(matches!(err, OrderError::NotDelivered));

    deliver(&svc, &id).await;
    let order = svc.rate(&id, &customer(), rating.clone()).await.unwrap();
    assert_eq!(order.rating.as_ref().unwrap().overall, 5);

    let err = svc.rate(&id, &customer(), rating).await.unwrap_err();
    assert!(matches!(err, OrderError::AlreadyRated));
}

#[tokio::test]
async fn test_rating_updates_restaurant_average() {
    let db = test_db().await;
    let restaurant = seed_restaurant(&db, 5.0).await;
    let item = seed_item(&db, &restaurant, 10.0).await;
    let svc = service(&db);

    for overall in [5, 3] {
        let order = svc
            .create_order(&customer(), delivery_input(&restaurant, &item, 2))
            .await
            .unwrap();
        let id = order.id_string();
        deliver(&svc, &id).await;
        svc.rate(
            &id,
            &customer(),
            RatingInput {
                food: overall,
                delivery: overall,
                overall,
                comment: None,
            },
        )
        .await
        .unwrap();
    }

    let updated = RestaurantRepository::new(db.clone())
        .find_by_id(&restaurant.id_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.rating_count, 2);
    assert!((updated.rating - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_rating_score_bounds() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let err = svc
        .rate(
            &order.id_string(),
            &customer(),
            RatingInput {
                food: 6,
                delivery: 5,
                overall: 5,
                comment: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}

// ========== Location pings ==========

#[tokio::test]
async fn test_location_ping_by_assigned_courier_only() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.transition_status(&id, OrderStatus::ReadyForPickup, &restaurant_actor())
        .await
        .unwrap();
    svc.assign_courier(&id, &courier()).await.unwrap();

    let order = svc
        .add_location_ping(&id, &courier(), 40.418, -3.702)
        .await
        .unwrap();
    assert_eq!(order.delivery.as_ref().unwrap().location_pings.len(), 1);

    let other = Actor {
        id: "user:courier2".to_string(),
        name: "Dave".to_string(),
        role: UserRole::Delivery,
    };
    let err = svc
        .add_location_ping(&id, &other, 40.0, -3.0)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
}

// ========== Payment reconciliation ==========

#[tokio::test]
async fn test_payment_completed_confirms_and_replay_is_noop() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.attach_intent(&id, "pi_123", Some("card".to_string()))
        .await
        .unwrap();

    let order = svc
        .apply_payment_update("pi_123", PaymentStatus::Completed, Some("ch_1".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment.status, PaymentStatus::Completed);
    assert!(order.payment.paid_at.is_some());
    let timeline_len = order.timeline.len();
    let version = order.version;

    // Replayed delivery of the same event changes nothing
    let replay = svc
        .apply_payment_update("pi_123", PaymentStatus::Completed, Some("ch_1".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replay.timeline.len(), timeline_len);
    assert_eq!(replay.version, version);
}

#[tokio::test]
async fn test_payment_failed_keeps_order_pending() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.attach_intent(&id, "pi_fail", None).await.unwrap();
    let order = svc
        .apply_payment_update("pi_fail", PaymentStatus::Failed, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment.status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_refund_moves_order_to_refunded() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    svc.attach_intent(&id, "pi_ref", None).await.unwrap();
    svc.apply_payment_update("pi_ref", PaymentStatus::Completed, None)
        .await
        .unwrap();
    let order = svc
        .apply_payment_update("pi_ref", PaymentStatus::Refunded, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);
    assert!(order.payment.refunded_at.is_some());
}

#[tokio::test]
async fn test_unknown_intent_is_ignored() {
    let db = test_db().await;
    let svc = service(&db);
    let result = svc
        .apply_payment_update("pi_nobody", PaymentStatus::Completed, None)
        .await
        .unwrap();
    assert!(result.is_none());
}

// ========== Concurrency ==========

#[tokio::test]
async fn test_stale_save_is_rejected() {
    let db = test_db().await;
    let (svc, order) = place_order(&db).await;
    let id = order.id_string();

    let repo = OrderRepository::new(db.clone());
    let stale = repo.find_by_id(&id).await.unwrap().unwrap();

    // First writer wins
    svc.transition_status(&id, OrderStatus::Confirmed, &restaurant_actor())
        .await
        .unwrap();

    // Second writer holds the old version; its CAS save must fail
    let mut stale = stale;
    stale.set_status(OrderStatus::Confirmed, "stale write", "user:x", "X");
    let result = repo.save(&stale).await.unwrap();
    assert!(result.is_none());
}
