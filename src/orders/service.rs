//! Order Service
//!
//! Owns the order lifecycle: creation with catalog snapshotting and
//! pricing, the forward-only status pipeline, courier assignment,
//! cancellation, rating and payment reconciliation. Every mutation is
//! persisted through the version compare-and-swap save, so two racing
//! writers cannot silently overwrite each other.

use chrono::{Duration, Utc};
use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::error::{OrderError, OrderResult};
use super::pricing;
use crate::auth::CurrentUser;
use crate::core::config::PricingConfig;
use crate::db::models::{
    Address, CancellationInfo, ChosenCustomization, DeliveryTracking, Order, OrderItem,
    OrderRating, OrderStatus, OrderType, PaymentInfo, PaymentStatus, Restaurant, UserRole,
    generate_order_number,
};
use crate::db::repository::{
    MenuItemRepository, OrderRepository, RestaurantRepository, parse_record_id,
};
use crate::realtime::Notifier;
use crate::utils::geo::haversine_km;
use crate::utils::validation::{validate_quantity, validate_rating_score};

/// Who is performing an operation
#[derive(Debug, Clone)]
pub struct Actor {
    /// User record id as "user:xxx", or "system" for processor-driven updates
    pub id: String,
    pub name: String,
    pub role: UserRole,
}

impl Actor {
    /// Actor for payment-processor driven mutations
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            name: "payment-processor".to_string(),
            role: UserRole::Admin,
        }
    }
}

impl From<&CurrentUser> for Actor {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CustomizationChoice {
    pub group: String,
    pub option: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
    /// Menu item id as "menu_item:xxx"
    pub menu_item: String,
    pub quantity: i32,
    #[serde(default)]
    pub customizations: Vec<CustomizationChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderCreateInput {
    /// Restaurant id as "restaurant:xxx"
    pub restaurant: String,
    pub order_type: OrderType,
    pub items: Vec<OrderItemInput>,
    pub delivery_address: Option<Address>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingInput {
    pub food: i32,
    pub delivery: i32,
    pub overall: i32,
    pub comment: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct OrderService {
    db: Surreal<Db>,
    notifier: Notifier,
    pricing: PricingConfig,
}

impl OrderService {
    pub fn new(db: Surreal<Db>, notifier: Notifier, pricing: PricingConfig) -> Self {
        Self {
            db,
            notifier,
            pricing,
        }
    }

    fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.db.clone())
    }

    fn restaurants(&self) -> RestaurantRepository {
        RestaurantRepository::new(self.db.clone())
    }

    fn menu_items(&self) -> MenuItemRepository {
        MenuItemRepository::new(self.db.clone())
    }

    pub async fn get(&self, order_id: &str) -> OrderResult<Order> {
        self.orders()
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {order_id} not found")))
    }

    /// Persist through the version CAS; a failed version check surfaces as
    /// a conflict for the caller to retry.
    async fn save(&self, order: &Order) -> OrderResult<Order> {
        self.orders()
            .save(order)
            .await?
            .ok_or(OrderError::ConcurrentUpdate)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create an order.
    ///
    /// Validates availability, range and minimum, snapshots the catalog
    /// items into line items, prices the order and persists it in
    /// `pending` status with a pending payment. The restaurant is notified
    /// over the realtime channel.
    pub async fn create_order(
        &self,
        customer: &Actor,
        input: OrderCreateInput,
    ) -> OrderResult<Order> {
        let now = Utc::now();

        let restaurant = self
            .restaurants()
            .find_by_id(&input.restaurant)
            .await?
            .ok_or_else(|| {
                OrderError::NotFound(format!("Restaurant {} not found", input.restaurant))
            })?;

        if !restaurant.is_active {
            return Err(OrderError::NotAvailable(
                "Restaurant is not accepting orders".to_string(),
            ));
        }
        if !restaurant.is_open_at(now) {
            return Err(OrderError::NotAvailable(
                "Restaurant is currently closed".to_string(),
            ));
        }

        if input.items.is_empty() {
            return Err(OrderError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }

        let delivery_address = self.check_delivery_address(&restaurant, &input)?;

        // Snapshot line items from the live catalog
        let mut items: Vec<OrderItem> = Vec::with_capacity(input.items.len());
        let mut max_prep_minutes: i64 = 0;
        for item_input in &input.items {
            let item = self.snapshot_item(&restaurant, item_input).await?;
            max_prep_minutes = max_prep_minutes.max(item.1);
            items.push(item.0);
        }

        let subtotal = pricing::subtotal(&items);
        if subtotal < restaurant.minimum_order {
            return Err(OrderError::BelowMinimum {
                subtotal,
                minimum: restaurant.minimum_order,
            });
        }

        let promo_code = self.check_promo_code(input.promo_code.as_deref())?;
        let is_delivery = input.order_type == OrderType::Delivery;
        let delivery_fee = if is_delivery {
            restaurant.delivery_fee
        } else {
            0.0
        };
        let order_pricing = pricing::price_order(&self.pricing, subtotal, delivery_fee, promo_code);

        // ETA: preparation of the slowest item, plus the delivery buffer
        let mut eta_minutes = max_prep_minutes;
        if is_delivery {
            eta_minutes += self.pricing.delivery_extra_minutes;
        }
        let estimated_at = now + Duration::minutes(eta_minutes);

        let order = Order {
            id: None,
            order_number: generate_order_number(now),
            customer: parse_record_id(&customer.id, "user")?,
            customer_name: customer.name.clone(),
            restaurant: parse_record_id(&input.restaurant, "restaurant")?,
            restaurant_name: restaurant.name.clone(),
            order_type: input.order_type,
            items,
            pricing: order_pricing,
            status: OrderStatus::Pending,
            payment: PaymentInfo::pending(),
            delivery_address,
            delivery: is_delivery.then(|| DeliveryTracking::unassigned(estimated_at)),
            rating: None,
            cancellation: None,
            timeline: vec![crate::db::models::TimelineEntry {
                status: OrderStatus::Pending,
                message: "Order placed".to_string(),
                at: now,
                actor_id: customer.id.clone(),
                actor_name: customer.name.clone(),
            }],
            version: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.orders().create(order).await?;
        tracing::info!(
            "Order created: {} for {} ({} items, total {:.2})",
            created.order_number,
            created.restaurant_name,
            created.items.len(),
            created.pricing.total
        );
        self.notifier.order_created(&created).await;
        Ok(created)
    }

    fn check_delivery_address(
        &self,
        restaurant: &Restaurant,
        input: &OrderCreateInput,
    ) -> OrderResult<Option<Address>> {
        if input.order_type != OrderType::Delivery {
            return Ok(None);
        }
        let address = input.delivery_address.clone().ok_or_else(|| {
            OrderError::Validation("Delivery orders require a delivery address".to_string())
        })?;
        let distance_km = haversine_km(
            restaurant.address.latitude,
            restaurant.address.longitude,
            address.latitude,
            address.longitude,
        );
        if distance_km > restaurant.delivery_radius_km {
            return Err(OrderError::OutOfRange {
                distance_km,
                radius_km: restaurant.delivery_radius_km,
            });
        }
        Ok(Some(address))
    }

    /// Resolve one input line against the catalog. Returns the snapshotted
    /// line item and the item's preparation time.
    async fn snapshot_item(
        &self,
        restaurant: &Restaurant,
        input: &OrderItemInput,
    ) -> OrderResult<(OrderItem, i64)> {
        validate_quantity(input.quantity).map_err(OrderError::from_validation)?;

        let item = self
            .menu_items()
            .find_by_id(&input.menu_item)
            .await?
            .ok_or_else(|| OrderError::InvalidItem(format!("{} does not exist", input.menu_item)))?;

        if item.restaurant.to_string() != restaurant.id_string() {
            return Err(OrderError::InvalidItem(format!(
                "{} does not belong to this restaurant",
                item.name
            )));
        }
        if !item.is_available {
            return Err(OrderError::InvalidItem(format!(
                "{} is currently unavailable",
                item.name
            )));
        }

        let mut customizations = Vec::with_capacity(input.customizations.len());
        let mut surcharges = Vec::with_capacity(input.customizations.len());
        for choice in &input.customizations {
            let surcharge = item
                .option_surcharge(&choice.group, &choice.option)
                .ok_or_else(|| {
                    OrderError::InvalidItem(format!(
                        "{} has no option {}/{}",
                        item.name, choice.group, choice.option
                    ))
                })?;
            surcharges.push(surcharge);
            customizations.push(ChosenCustomization {
                group: choice.group.clone(),
                option: choice.option.clone(),
                surcharge,
            });
        }

        let unit_price = pricing::unit_price(item.effective_price(), &surcharges);
        let line_total = pricing::line_total(unit_price, input.quantity);

        Ok((
            OrderItem {
                menu_item: parse_record_id(&input.menu_item, "menu_item")?,
                name: item.name.clone(),
                unit_price,
                quantity: input.quantity,
                customizations,
                line_total,
            },
            item.preparation_minutes,
        ))
    }

    fn check_promo_code<'a>(&self, code: Option<&'a str>) -> OrderResult<Option<&'a str>> {
        match code {
            None => Ok(None),
            Some(c) if c.eq_ignore_ascii_case(&self.pricing.promo_code) => Ok(Some(c)),
            Some(c) => Err(OrderError::UnknownPromoCode(c.to_string())),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Move an order forward along the pipeline.
    ///
    /// The target must be in the actor's role subset and strictly ahead of
    /// the current status. When a delivery order becomes ready for pickup
    /// without a courier, couriers are notified it is up for grabs.
    pub async fn transition_status(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor: &Actor,
    ) -> OrderResult<Order> {
        let mut order = self.get(order_id).await?;

        if !OrderStatus::allowed_for_role(actor.role).contains(&target) {
            return Err(OrderError::Forbidden(format!(
                "Role {} cannot set status {target}",
                actor.role
            )));
        }
        // Couriers may only drive orders assigned to them; claiming an
        // unassigned order goes through assignment, never through here.
        if actor.role == UserRole::Delivery {
            let assigned = order
                .delivery
                .as_ref()
                .and_then(|d| d.courier.as_ref())
                .is_some_and(|c| c.to_string() == actor.id);
            if !assigned {
                return Err(OrderError::Forbidden(
                    "Only the assigned courier can update this order".to_string(),
                ));
            }
        }
        if !order.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        if target == OrderStatus::Delivered
            && let Some(delivery) = order.delivery.as_mut()
        {
            delivery.actual_delivery_at = Some(Utc::now());
        }

        order.set_status(
            target,
            format!("Status changed to {target}"),
            &actor.id,
            &actor.name,
        );
        let saved = self.save(&order).await?;

        self.notifier.order_status(&saved).await;
        let up_for_grabs = saved.status == OrderStatus::ReadyForPickup
            && saved.order_type == OrderType::Delivery
            && saved
                .delivery
                .as_ref()
                .is_some_and(|d| d.courier.is_none());
        if up_for_grabs {
            self.notifier.order_available(&saved).await;
        }
        Ok(saved)
    }

    /// Courier claims a ready delivery order. First come, first served:
    /// the version CAS makes the second claimant lose with a conflict.
    pub async fn assign_courier(&self, order_id: &str, courier: &Actor) -> OrderResult<Order> {
        let mut order = self.get(order_id).await?;

        if order.order_type != OrderType::Delivery {
            return Err(OrderError::Validation(
                "Pickup orders have no courier".to_string(),
            ));
        }
        if order.status != OrderStatus::ReadyForPickup {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::PickedUp,
            });
        }
        let delivery = order
            .delivery
            .as_mut()
            .ok_or_else(|| OrderError::Storage("Delivery order missing tracking".to_string()))?;
        if delivery.courier.is_some() {
            return Err(OrderError::AlreadyAssigned);
        }

        delivery.courier = Some(parse_record_id(&courier.id, "user")?);
        delivery.courier_name = Some(courier.name.clone());
        delivery.estimated_delivery_at =
            Some(Utc::now() + Duration::minutes(self.pricing.delivery_extra_minutes));

        order.set_status(
            OrderStatus::PickedUp,
            format!("Picked up by {}", courier.name),
            &courier.id,
            &courier.name,
        );
        let saved = self.save(&order).await?;
        self.notifier.order_assigned(&saved, &courier.id).await;
        Ok(saved)
    }

    /// Cancel an order while it is still cancellable. Customers can only
    /// cancel their own orders; restaurant ownership is checked by the API
    /// layer, which knows the caller's restaurant.
    pub async fn cancel(
        &self,
        order_id: &str,
        reason: impl Into<String>,
        actor: &Actor,
    ) -> OrderResult<Order> {
        let mut order = self.get(order_id).await?;

        if actor.role == UserRole::Customer && order.customer.to_string() != actor.id {
            return Err(OrderError::Forbidden(
                "You can only cancel your own orders".to_string(),
            ));
        }
        if !order.can_be_cancelled() {
            return Err(OrderError::NotCancellable(order.status));
        }

        let reason = reason.into();
        order.cancellation = Some(CancellationInfo {
            reason: reason.clone(),
            cancelled_by: actor.id.clone(),
            cancelled_at: Utc::now(),
        });
        order.set_status(
            OrderStatus::Cancelled,
            format!("Cancelled: {reason}"),
            &actor.id,
            &actor.name,
        );
        let saved = self.save(&order).await?;
        self.notifier.order_cancelled(&saved).await;
        Ok(saved)
    }

    /// Rate a delivered order, at most once, then fold the score into the
    /// restaurant's running average.
    pub async fn rate(
        &self,
        order_id: &str,
        customer: &Actor,
        input: RatingInput,
    ) -> OrderResult<Order> {
        for (label, score) in [
            ("food", input.food),
            ("delivery", input.delivery),
            ("overall", input.overall),
        ] {
            validate_rating_score(score, label).map_err(OrderError::from_validation)?;
        }

        let mut order = self.get(order_id).await?;
        if order.customer.to_string() != customer.id {
            return Err(OrderError::Forbidden(
                "You can only rate your own orders".to_string(),
            ));
        }
        if order.status != OrderStatus::Delivered {
            return Err(OrderError::NotDelivered);
        }
        if order.rating.is_some() {
            return Err(OrderError::AlreadyRated);
        }

        order.rating = Some(OrderRating {
            food: input.food,
            delivery: input.delivery,
            overall: input.overall,
            comment: input.comment,
            rated_at: Utc::now(),
        });
        order.updated_at = Utc::now();
        let saved = self.save(&order).await?;

        self.recompute_restaurant_rating(&saved.restaurant.to_string())
            .await?;
        Ok(saved)
    }

    async fn recompute_restaurant_rating(&self, restaurant_id: &str) -> OrderResult<()> {
        let scores = self.orders().rated_overall_scores(restaurant_id).await?;
        if scores.is_empty() {
            return Ok(());
        }
        let count = scores.len() as i64;
        let average = scores.iter().sum::<i64>() as f64 / count as f64;
        self.restaurants()
            .update_rating(restaurant_id, average, count)
            .await?;
        Ok(())
    }

    /// Record a courier location ping and relay it to the customer.
    pub async fn add_location_ping(
        &self,
        order_id: &str,
        courier: &Actor,
        latitude: f64,
        longitude: f64,
    ) -> OrderResult<Order> {
        let mut order = self.get(order_id).await?;

        let delivery = order.delivery.as_mut().ok_or_else(|| {
            OrderError::Validation("Pickup orders have no delivery tracking".to_string())
        })?;
        if delivery
            .courier
            .as_ref()
            .is_none_or(|c| c.to_string() != courier.id)
        {
            return Err(OrderError::Forbidden(
                "Only the assigned courier can report location".to_string(),
            ));
        }
        if !matches!(
            order.status,
            OrderStatus::PickedUp | OrderStatus::OnTheWay
        ) {
            return Err(OrderError::Validation(format!(
                "Order is not in transit (status: {})",
                order.status
            )));
        }

        if let Some(delivery) = order.delivery.as_mut() {
            delivery.location_pings.push(crate::db::models::LocationPing {
                latitude,
                longitude,
                at: Utc::now(),
            });
        }
        order.updated_at = Utc::now();
        let saved = self.save(&order).await?;
        self.notifier
            .delivery_location(&saved, latitude, longitude)
            .await;
        Ok(saved)
    }

    // =========================================================================
    // Payment reconciliation
    // =========================================================================

    /// Apply a payment-status update keyed by the external intent id.
    ///
    /// Idempotent: an update carrying the status the order already has is
    /// a no-op, so replayed webhook deliveries cause no double side
    /// effects. A completed payment confirms a pending order. Returns
    /// `None` when no order carries the intent.
    pub async fn apply_payment_update(
        &self,
        intent_id: &str,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> OrderResult<Option<Order>> {
        let Some(mut order) = self.orders().find_by_intent(intent_id).await? else {
            tracing::warn!("Payment update for unknown intent {intent_id}, ignoring");
            return Ok(None);
        };

        if order.payment.status == status {
            tracing::debug!(
                "Duplicate payment update for {} ({status}), no-op",
                order.order_number
            );
            return Ok(Some(order));
        }

        let system = Actor::system();
        let now = Utc::now();
        order.payment.status = status;
        if let Some(txn) = transaction_id {
            order.payment.transaction_id = Some(txn);
        }

        match status {
            PaymentStatus::Completed => {
                order.payment.paid_at = Some(now);
                if order.status == OrderStatus::Pending {
                    order.set_status(
                        OrderStatus::Confirmed,
                        "Payment completed",
                        &system.id,
                        &system.name,
                    );
                }
            }
            PaymentStatus::Refunded => {
                order.payment.refunded_at = Some(now);
                if order.status != OrderStatus::Refunded {
                    order.set_status(
                        OrderStatus::Refunded,
                        "Payment refunded",
                        &system.id,
                        &system.name,
                    );
                }
            }
            PaymentStatus::Failed => {
                // Order stays pending; the customer can retry payment.
                tracing::info!("Payment failed for {}", order.order_number);
            }
            PaymentStatus::Pending | PaymentStatus::Processing => {}
        }

        order.updated_at = now;
        let saved = self.save(&order).await?;
        self.notifier.payment_updated(&saved).await;
        if saved.status != OrderStatus::Pending {
            self.notifier.order_status(&saved).await;
        }
        Ok(Some(saved))
    }

    /// Attach a freshly created payment intent to the order.
    pub async fn attach_intent(
        &self,
        order_id: &str,
        intent_id: &str,
        method: Option<String>,
    ) -> OrderResult<Order> {
        let mut order = self.get(order_id).await?;
        order.payment.intent_id = Some(intent_id.to_string());
        if method.is_some() {
            order.payment.method = method;
        }
        order.updated_at = Utc::now();
        self.save(&order).await
    }
}
