//! Order domain errors

use thiserror::Error;

use crate::db::models::OrderStatus;
use crate::db::repository::RepoError;
use crate::utils::AppError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Restaurant is not available: {0}")]
    NotAvailable(String),

    #[error("Delivery address is out of range ({distance_km:.1} km away, radius {radius_km:.1} km)")]
    OutOfRange { distance_km: f64, radius_km: f64 },

    #[error("Invalid order item: {0}")]
    InvalidItem(String),

    #[error("Order subtotal {subtotal:.2} is below the restaurant minimum {minimum:.2}")]
    BelowMinimum { subtotal: f64, minimum: f64 },

    #[error("Unknown promo code: {0}")]
    UnknownPromoCode(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order can no longer be cancelled (status: {0})")]
    NotCancellable(OrderStatus),

    #[error("Order already has an assigned courier")]
    AlreadyAssigned,

    #[error("Order has already been rated")]
    AlreadyRated,

    #[error("Only delivered orders can be rated")]
    NotDelivered,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Order was modified concurrently, please retry")]
    ConcurrentUpdate,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    /// Adopt a request-validation failure into the domain error
    pub fn from_validation(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => OrderError::Validation(msg),
            other => OrderError::Validation(other.to_string()),
        }
    }
}

impl From<RepoError> for OrderError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => OrderError::NotFound(msg),
            RepoError::Duplicate(msg) => OrderError::Storage(msg),
            RepoError::Database(msg) => OrderError::Storage(msg),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotAvailable(_)
            | OrderError::OutOfRange { .. }
            | OrderError::InvalidItem(_)
            | OrderError::BelowMinimum { .. }
            | OrderError::InvalidTransition { .. }
            | OrderError::NotCancellable(_)
            | OrderError::AlreadyAssigned
            | OrderError::AlreadyRated
            | OrderError::NotDelivered => AppError::business_rule(err.to_string()),
            OrderError::UnknownPromoCode(_) | OrderError::Validation(_) => {
                AppError::validation(err.to_string())
            }
            OrderError::Forbidden(msg) => AppError::forbidden(msg),
            OrderError::NotFound(msg) => AppError::not_found(msg),
            OrderError::ConcurrentUpdate => AppError::conflict(err.to_string()),
            OrderError::Storage(msg) => AppError::database(msg),
        }
    }
}
