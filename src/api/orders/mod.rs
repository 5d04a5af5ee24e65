//! Order Routes
//!
//! All mutations go through the order service; handlers only authorize
//! and translate.
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/orders | GET | required (role-scoped) |
//! | /api/orders | POST | customer |
//! | /api/orders/{id} | GET | participant |
//! | /api/orders/{id}/status | PATCH | restaurant/delivery/admin |
//! | /api/orders/{id}/assign | POST | delivery |
//! | /api/orders/{id}/cancel | POST | customer/restaurant/admin |
//! | /api/orders/{id}/rating | POST | customer |
//! | /api/orders/{id}/location | POST | assigned courier |

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", get(handler::list).post(handler::create))
        .route("/api/orders/{id}", get(handler::get_by_id))
        .route("/api/orders/{id}/status", patch(handler::update_status))
        .route("/api/orders/{id}/assign", post(handler::assign))
        .route("/api/orders/{id}/cancel", post(handler::cancel))
        .route("/api/orders/{id}/rating", post(handler::rate))
        .route("/api/orders/{id}/location", post(handler::report_location))
}
