//! Realtime notifier
//!
//! Thin wrapper over the socket server used by the domain services to push
//! events. Emission is fire-and-forget: a realtime failure is logged and
//! never fails the HTTP request that triggered it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use socketioxide::SocketIo;

use super::{DELIVERY_ROOM, events};
use crate::db::models::{Order, OrderStatus, PaymentStatus};

/// Payload for order lifecycle events
#[derive(Debug, Clone, Serialize)]
pub struct OrderEvent {
    pub order_id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub restaurant_name: String,
    pub total: f64,
    pub at: DateTime<Utc>,
}

impl From<&Order> for OrderEvent {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id_string(),
            order_number: order.order_number.clone(),
            status: order.status,
            restaurant_name: order.restaurant_name.clone(),
            total: order.pricing.total,
            at: order.updated_at,
        }
    }
}

/// Payload for courier location updates
#[derive(Debug, Clone, Serialize)]
pub struct LocationEvent {
    pub order_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub at: DateTime<Utc>,
}

/// Payload for payment updates
#[derive(Debug, Clone, Serialize)]
pub struct PaymentEvent {
    pub order_id: String,
    pub order_number: String,
    pub payment_status: PaymentStatus,
    pub at: DateTime<Utc>,
}

/// Pushes domain events to connected clients.
///
/// `disabled()` produces a notifier with no socket server behind it; every
/// emit becomes a no-op. Services in tests run with a disabled notifier.
#[derive(Clone)]
pub struct Notifier {
    io: Option<SocketIo>,
}

impl Notifier {
    pub fn new(io: SocketIo) -> Self {
        Self { io: Some(io) }
    }

    pub fn disabled() -> Self {
        Self { io: None }
    }

    /// New order placed, pushed to the restaurant's room
    pub async fn order_created(&self, order: &Order) {
        self.emit(
            order.restaurant.to_string(),
            events::ORDER_CREATED,
            &OrderEvent::from(order),
        )
        .await;
    }

    /// Status change, pushed to the customer's room
    pub async fn order_status(&self, order: &Order) {
        self.emit(
            order.customer.to_string(),
            events::ORDER_STATUS,
            &OrderEvent::from(order),
        )
        .await;
    }

    /// Delivery order ready for pickup, broadcast to all couriers
    pub async fn order_available(&self, order: &Order) {
        self.emit(
            DELIVERY_ROOM.to_string(),
            events::ORDER_AVAILABLE,
            &OrderEvent::from(order),
        )
        .await;
    }

    /// Courier assigned, pushed to the customer and the courier
    pub async fn order_assigned(&self, order: &Order, courier_id: &str) {
        let event = OrderEvent::from(order);
        self.emit(order.customer.to_string(), events::ORDER_ASSIGNED, &event)
            .await;
        self.emit(courier_id.to_string(), events::ORDER_ASSIGNED, &event)
            .await;
    }

    /// Cancellation, pushed to the customer and the restaurant
    pub async fn order_cancelled(&self, order: &Order) {
        let event = OrderEvent::from(order);
        self.emit(order.customer.to_string(), events::ORDER_CANCELLED, &event)
            .await;
        self.emit(
            order.restaurant.to_string(),
            events::ORDER_CANCELLED,
            &event,
        )
        .await;
    }

    /// Courier location ping, pushed to the customer's room
    pub async fn delivery_location(&self, order: &Order, latitude: f64, longitude: f64) {
        self.emit(
            order.customer.to_string(),
            events::DELIVERY_LOCATION,
            &LocationEvent {
                order_id: order.id_string(),
                latitude,
                longitude,
                at: Utc::now(),
            },
        )
        .await;
    }

    /// Payment status change, pushed to the customer's room
    pub async fn payment_updated(&self, order: &Order) {
        self.emit(
            order.customer.to_string(),
            events::PAYMENT_UPDATED,
            &PaymentEvent {
                order_id: order.id_string(),
                order_number: order.order_number.clone(),
                payment_status: order.payment.status,
                at: Utc::now(),
            },
        )
        .await;
    }

    async fn emit<T: Serialize + ?Sized>(&self, room: String, event: &'static str, payload: &T) {
        let Some(io) = &self.io else {
            return;
        };
        if let Err(err) = io.to(room.clone()).emit(event, payload).await {
            tracing::warn!("Realtime emit failed (room={room}, event={event}): {err}");
        }
    }
}
