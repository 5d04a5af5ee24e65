//! Payment Handlers
//!
//! Thin shims over the payment service. The webhook endpoint is public;
//! its authentication is the signature over the raw body.

use axum::{Json, extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Order, UserRole};
use crate::db::repository::RestaurantRepository;
use crate::payments::service::IntentResponse;
use crate::payments::webhook::SIGNATURE_HEADER;
use crate::utils::{ApiResponse, AppError, AppResult, ok, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    /// Order id as "order:xxx"
    pub order_id: String,
}

/// Create a payment intent for an order
pub async fn create_intent(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<IntentRequest>,
) -> AppResult<Json<ApiResponse<IntentResponse>>> {
    user.require_role(&[UserRole::Customer])?;
    let response = state.payments().create_intent(&user, &req.order_id).await?;
    Ok(ok(response))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub order_id: String,
    /// Processor-side payment method id
    pub payment_method: String,
}

/// Confirm the order's payment intent server-side
pub async fn confirm(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<ConfirmRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_role(&[UserRole::Customer])?;
    let order = state
        .payments()
        .confirm(&user, &req.order_id, &req.payment_method)
        .await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub order_id: String,
}

/// Refund a completed payment; restaurant owner or admin
pub async fn refund(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<RefundRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_role(&[UserRole::Restaurant])?;
    if user.role == UserRole::Restaurant {
        let order = state.orders().get(&req.order_id).await?;
        let restaurant = RestaurantRepository::new(state.db.clone())
            .find_by_owner(&user.id)
            .await
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| AppError::forbidden("You have no restaurant"))?;
        if order.restaurant.to_string() != restaurant.id_string() {
            return Err(AppError::forbidden("Not your restaurant's order"));
        }
    }
    let order = state.payments().refund(&req.order_id).await?;
    Ok(ok_with_message(order, "Refund issued"))
}

/// Payment processor webhook. Takes the raw body; the JSON is only
/// parsed after the signature over the exact bytes verifies.
pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Json<ApiResponse<()>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::invalid("Missing signature header"))?;

    state.payments().handle_webhook(signature, &body).await?;
    Ok(ok(()))
}
