//! Menu Item Routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/menu-items | POST | restaurant owner |
//! | /api/menu-items/{id} | GET | required |
//! | /api/menu-items/{id} | PATCH | owner or admin |
//! | /api/menu-items/{id} | DELETE | owner or admin |

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/menu-items", post(handler::create))
        .route(
            "/api/menu-items/{id}",
            get(handler::get_by_id)
                .patch(handler::update)
                .delete(handler::delete),
        )
}
