//! Realtime Layer
//!
//! Socket.IO endpoint for live order updates. Clients authenticate with
//! the same JWT as the REST API, passed in the handshake auth payload as
//! `{ "token": "..." }`. On connect the socket joins its channels:
//!
//! - every user joins their own room (the user record id)
//! - restaurant owners additionally join their restaurant's room
//! - couriers additionally join the shared `delivery` room
//!
//! Invalid or missing tokens get the socket disconnected immediately.

pub mod notifier;
pub mod session;

use std::sync::Arc;

use serde::Deserialize;
use socketioxide::extract::{SocketRef, State, TryData};
use socketioxide::layer::SocketIoLayer;
use socketioxide::SocketIo;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

pub use notifier::{LocationEvent, Notifier, OrderEvent, PaymentEvent};
pub use session::Session;

use crate::auth::JwtService;
use crate::db::models::UserRole;
use crate::db::repository::RestaurantRepository;
use crate::security_log;

/// Shared room every courier joins
pub const DELIVERY_ROOM: &str = "delivery";

/// Event names pushed to clients
pub mod events {
    pub const ORDER_CREATED: &str = "order:created";
    pub const ORDER_STATUS: &str = "order:status";
    pub const ORDER_AVAILABLE: &str = "order:available";
    pub const ORDER_ASSIGNED: &str = "order:assigned";
    pub const ORDER_CANCELLED: &str = "order:cancelled";
    pub const DELIVERY_LOCATION: &str = "delivery:location";
    pub const PAYMENT_UPDATED: &str = "payment:updated";
}

/// State available to socket handlers
#[derive(Clone)]
pub struct RealtimeCtx {
    pub jwt: Arc<JwtService>,
    pub db: Surreal<Db>,
}

/// Build the Socket.IO layer and handle. The layer goes onto the axum
/// router; the handle feeds the [`Notifier`].
pub fn build_layer(ctx: RealtimeCtx) -> (SocketIoLayer, SocketIo) {
    let (layer, io) = SocketIo::builder().with_state(ctx).build_layer();
    io.ns("/", on_connect);
    (layer, io)
}

#[derive(Debug, Deserialize)]
struct ConnectAuth {
    token: String,
}

async fn on_connect(
    socket: SocketRef,
    TryData(auth): TryData<ConnectAuth>,
    State(ctx): State<RealtimeCtx>,
) {
    let Ok(auth) = auth else {
        security_log!("WARN", "socket_auth_missing", sid = socket.id.to_string());
        let _ = socket.disconnect();
        return;
    };

    let claims = match ctx.jwt.validate_token(&auth.token) {
        Ok(claims) => claims,
        Err(err) => {
            security_log!(
                "WARN",
                "socket_auth_failed",
                sid = socket.id.to_string(),
                error = format!("{err}")
            );
            let _ = socket.disconnect();
            return;
        }
    };

    let mut session = Session {
        user_id: claims.sub.clone(),
        role: claims.role,
        restaurant_id: None,
    };

    socket.join(session.user_id.clone());

    match claims.role {
        UserRole::Restaurant => {
            // Owners follow their restaurant's room; resolved here once so
            // emits never need an owner lookup.
            let repo = RestaurantRepository::new(ctx.db.clone());
            match repo.find_by_owner(&session.user_id).await {
                Ok(Some(restaurant)) => {
                    let rid = restaurant.id_string();
                    socket.join(rid.clone());
                    session.restaurant_id = Some(rid);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Restaurant lookup failed on socket connect: {err}");
                }
            }
        }
        UserRole::Delivery => {
            socket.join(DELIVERY_ROOM);
        }
        UserRole::Customer | UserRole::Admin => {}
    }

    tracing::debug!(
        "Socket connected: sid={}, user={}, role={}",
        socket.id,
        session.user_id,
        session.role
    );
    socket.extensions.insert(session);
}
