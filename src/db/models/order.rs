//! Order Model
//!
//! The order aggregate: line-item snapshots, pricing, payment and delivery
//! sub-records and an append-only timeline. Orders are never physically
//! deleted; cancellation and refund are soft terminal states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;
use crate::db::models::UserRole;

// =============================================================================
// Status enums
// =============================================================================

/// Order status
///
/// Forward pipeline: pending -> confirmed -> preparing -> ready_for_pickup
/// -> picked_up -> on_the_way -> delivered. Cancelled and refunded are
/// terminal side-exits reachable from any non-terminal state, subject to
/// the cancellability/refundability checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    PickedUp,
    OnTheWay,
    Delivered,
    Cancelled,
    Refunded,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl OrderStatus {
    /// Position along the forward delivery pipeline; None for side-exits
    pub fn pipeline_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Preparing => Some(2),
            OrderStatus::ReadyForPickup => Some(3),
            OrderStatus::PickedUp => Some(4),
            OrderStatus::OnTheWay => Some(5),
            OrderStatus::Delivered => Some(6),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Whether an order in this status may still be cancelled.
    ///
    /// Once food is out the door (picked_up, on_the_way) or the order is
    /// already terminal, cancellation is no longer allowed.
    pub fn can_be_cancelled(&self) -> bool {
        !matches!(
            self,
            OrderStatus::PickedUp
                | OrderStatus::OnTheWay
                | OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
        )
    }

    /// Whether `self -> target` is a legal forward pipeline move
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        match (self.pipeline_rank(), target.pipeline_rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    /// Pipeline statuses a role is allowed to set directly
    pub fn allowed_for_role(role: UserRole) -> &'static [OrderStatus] {
        match role {
            UserRole::Restaurant => &[
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::ReadyForPickup,
            ],
            UserRole::Delivery => &[
                OrderStatus::PickedUp,
                OrderStatus::OnTheWay,
                OrderStatus::Delivered,
            ],
            UserRole::Admin => &[
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::ReadyForPickup,
                OrderStatus::PickedUp,
                OrderStatus::OnTheWay,
                OrderStatus::Delivered,
            ],
            UserRole::Customer => &[],
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// Order type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Delivery,
    Pickup,
}

// =============================================================================
// Sub-records
// =============================================================================

/// Chosen customization, snapshotted with its surcharge at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChosenCustomization {
    pub group: String,
    pub option: String,
    pub surcharge: f64,
}

/// Line-item snapshot. Name and prices are copied from the catalog at
/// creation so later catalog edits cannot retroactively alter the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(with = "serde_helpers::record_id")]
    pub menu_item: RecordId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub customizations: Vec<ChosenCustomization>,
    pub line_total: f64,
}

/// Computed pricing breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPricing {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_fee: f64,
    pub service_fee: f64,
    pub discount: f64,
    pub promo_code: Option<String>,
    pub total: f64,
}

/// Payment sub-record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: Option<String>,
    pub status: PaymentStatus,
    /// External payment-intent id
    pub intent_id: Option<String>,
    /// External charge/transaction id
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl PaymentInfo {
    pub fn pending() -> Self {
        Self {
            method: None,
            status: PaymentStatus::Pending,
            intent_id: None,
            transaction_id: None,
            paid_at: None,
            refunded_at: None,
        }
    }
}

/// Courier location ping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPing {
    pub latitude: f64,
    pub longitude: f64,
    pub at: DateTime<Utc>,
}

/// Delivery-tracking sub-record (delivery orders only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTracking {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub courier: Option<RecordId>,
    pub courier_name: Option<String>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location_pings: Vec<LocationPing>,
}

impl DeliveryTracking {
    pub fn unassigned(estimated_delivery_at: DateTime<Utc>) -> Self {
        Self {
            courier: None,
            courier_name: None,
            estimated_delivery_at: Some(estimated_delivery_at),
            actual_delivery_at: None,
            location_pings: Vec::new(),
        }
    }
}

/// Customer rating, set at most once after delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRating {
    pub food: i32,
    pub delivery: i32,
    pub overall: i32,
    pub comment: Option<String>,
    pub rated_at: DateTime<Utc>,
}

/// Cancellation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationInfo {
    pub reason: String,
    pub cancelled_by: String,
    pub cancelled_at: DateTime<Utc>,
}

/// Append-only timeline entry; the audit trail of status changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub message: String,
    pub at: DateTime<Utc>,
    pub actor_id: String,
    pub actor_name: String,
}

// =============================================================================
// Order
// =============================================================================

/// Order aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    /// Human-readable unique order number, assigned at creation
    pub order_number: String,
    #[serde(with = "serde_helpers::record_id")]
    pub customer: RecordId,
    pub customer_name: String,
    #[serde(with = "serde_helpers::record_id")]
    pub restaurant: RecordId,
    pub restaurant_name: String,
    pub order_type: OrderType,
    pub items: Vec<OrderItem>,
    pub pricing: OrderPricing,
    pub status: OrderStatus,
    pub payment: PaymentInfo,
    pub delivery_address: Option<super::Address>,
    pub delivery: Option<DeliveryTracking>,
    pub rating: Option<OrderRating>,
    pub cancellation: Option<CancellationInfo>,
    pub timeline: Vec<TimelineEntry>,
    /// Optimistic-concurrency counter, bumped on every save
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    /// Set a new status and append exactly one timeline entry.
    ///
    /// This is the only place order status is mutated; the timeline is
    /// only ever extended, never rewritten.
    pub fn set_status(
        &mut self,
        status: OrderStatus,
        message: impl Into<String>,
        actor_id: &str,
        actor_name: &str,
    ) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;
        self.timeline.push(TimelineEntry {
            status,
            message: message.into(),
            at: now,
            actor_id: actor_id.to_string(),
            actor_name: actor_name.to_string(),
        });
    }
}

/// Generate a human-readable unique order number, e.g. "ORD-20260823-4F2A9C"
pub fn generate_order_number(at: DateTime<Utc>) -> String {
    let entropy = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        at.format("%Y%m%d"),
        entropy[..6].to_uppercase()
    )
}
