//! Restaurant Routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/restaurants | GET | required |
//! | /api/restaurants | POST | restaurant role |
//! | /api/restaurants/{id} | GET | required |
//! | /api/restaurants/{id} | PATCH | owner or admin |
//! | /api/restaurants/{id}/menu | GET | required |

pub(crate) mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route(
            "/api/restaurants",
            get(handler::list).post(handler::create),
        )
        .route(
            "/api/restaurants/{id}",
            get(handler::get_by_id).patch(handler::update),
        )
        .route("/api/restaurants/{id}/menu", get(handler::menu))
}
