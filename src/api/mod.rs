//! API Routes
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`auth`] - registration, login, profile
//! - [`restaurants`] - restaurant catalog and management
//! - [`menu_items`] - menu management
//! - [`orders`] - order lifecycle
//! - [`payments`] - payment intents, confirmation, refunds, webhooks
//!
//! Every route lives under `/api`. The auth middleware guards all of them
//! except the public handful (login, register, health, payment webhook).

pub mod auth;
pub mod health;
pub mod menu_items;
pub mod orders;
pub mod payments;
pub mod restaurants;

use axum::{Router, middleware};

use crate::core::ServerState;

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(restaurants::router())
        .merge(menu_items::router())
        .merge(orders::router())
        .merge(payments::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::require_auth,
        ))
        .with_state(state)
}
