//! Payment Routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/payments/intent | POST | customer |
//! | /api/payments/confirm | POST | customer |
//! | /api/payments/refund | POST | restaurant owner or admin |
//! | /api/payments/webhook | POST | signature-verified |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/payments/intent", post(handler::create_intent))
        .route("/api/payments/confirm", post(handler::confirm))
        .route("/api/payments/refund", post(handler::refund))
        .route("/api/payments/webhook", post(handler::webhook))
}
