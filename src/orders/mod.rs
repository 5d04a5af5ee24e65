//! Order Domain
//!
//! Order lifecycle management: pricing, creation, the status pipeline,
//! courier assignment, cancellation, rating and payment reconciliation.

pub mod error;
pub mod pricing;
pub mod service;

#[cfg(test)]
mod tests;

pub use error::{OrderError, OrderResult};
pub use service::{
    Actor, CustomizationChoice, OrderCreateInput, OrderItemInput, OrderService, RatingInput,
};
