//! Order Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Order, OrderStatus, UserRole};
use crate::db::repository::{OrderRepository, RestaurantRepository};
use crate::orders::{Actor, OrderCreateInput, RatingInput};
use crate::utils::validation::{MAX_NOTE_LEN, validate_coordinates, validate_optional_text};
use crate::utils::{ApiResponse, AppError, AppResult, ok, ok_with_message};

/// Place an order
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<OrderCreateInput>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_role(&[UserRole::Customer])?;
    let order = state
        .orders()
        .create_order(&Actor::from(&user), req)
        .await?;
    Ok(ok_with_message(order, "Order placed"))
}

/// List orders visible to the caller:
/// customers see their own, restaurants their restaurant's, couriers
/// their deliveries, admins the most recent across the board.
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let repo = OrderRepository::new(state.db.clone());
    let orders = match user.role {
        UserRole::Customer => repo.list_for_customer(&user.id).await,
        UserRole::Delivery => repo.list_for_courier(&user.id).await,
        UserRole::Restaurant => {
            let restaurant = RestaurantRepository::new(state.db.clone())
                .find_by_owner(&user.id)
                .await
                .map_err(|e| AppError::database(e.to_string()))?
                .ok_or_else(|| AppError::not_found("You have no restaurant yet"))?;
            repo.list_for_restaurant(&restaurant.id_string()).await
        }
        UserRole::Admin => repo.list_recent(100).await,
    }
    .map_err(|e| AppError::database(e.to_string()))?;
    Ok(ok(orders))
}

/// Order detail, participants only
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders().get(&id).await?;
    ensure_participant(&state, &user, &order).await?;
    Ok(ok(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Move the order forward along the pipeline
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    // Restaurants may only drive their own orders; the role/status checks
    // live in the service.
    if user.role == UserRole::Restaurant {
        let order = state.orders().get(&id).await?;
        ensure_own_restaurant_order(&state, &user, &order).await?;
    }
    let order = state
        .orders()
        .transition_status(&id, req.status, &Actor::from(&user))
        .await?;
    Ok(ok(order))
}

/// Courier claims a ready delivery order
pub async fn assign(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_role(&[UserRole::Delivery])?;
    let order = state
        .orders()
        .assign_courier(&id, &Actor::from(&user))
        .await?;
    Ok(ok_with_message(order, "Order assigned"))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    validate_optional_text(&req.reason, "reason", MAX_NOTE_LEN)?;
    user.require_role(&[UserRole::Customer, UserRole::Restaurant])?;
    if user.role == UserRole::Restaurant {
        let order = state.orders().get(&id).await?;
        ensure_own_restaurant_order(&state, &user, &order).await?;
    }
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "No reason given".to_string());
    let order = state
        .orders()
        .cancel(&id, reason, &Actor::from(&user))
        .await?;
    Ok(ok_with_message(order, "Order cancelled"))
}

pub async fn rate(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RatingInput>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_role(&[UserRole::Customer])?;
    validate_optional_text(&req.comment, "comment", MAX_NOTE_LEN)?;
    let order = state.orders().rate(&id, &Actor::from(&user), req).await?;
    Ok(ok_with_message(order, "Thanks for your rating"))
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Courier reports their position while delivering
pub async fn report_location(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    user.require_role(&[UserRole::Delivery])?;
    validate_coordinates(req.latitude, req.longitude)?;
    let order = state
        .orders()
        .add_location_ping(&id, &Actor::from(&user), req.latitude, req.longitude)
        .await?;
    Ok(ok(order))
}

// ── Authorization helpers ───────────────────────────────────────────

async fn ensure_own_restaurant_order(
    state: &ServerState,
    user: &CurrentUser,
    order: &Order,
) -> AppResult<()> {
    let restaurant = RestaurantRepository::new(state.db.clone())
        .find_by_owner(&user.id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::forbidden("You have no restaurant"))?;
    if order.restaurant.to_string() != restaurant.id_string() {
        return Err(AppError::forbidden("Not your restaurant's order"));
    }
    Ok(())
}

async fn ensure_participant(
    state: &ServerState,
    user: &CurrentUser,
    order: &Order,
) -> AppResult<()> {
    match user.role {
        UserRole::Admin => Ok(()),
        UserRole::Customer if order.customer.to_string() == user.id => Ok(()),
        UserRole::Delivery
            if order
                .delivery
                .as_ref()
                .and_then(|d| d.courier.as_ref())
                .is_some_and(|c| c.to_string() == user.id) =>
        {
            Ok(())
        }
        UserRole::Restaurant => ensure_own_restaurant_order(state, user, order).await,
        _ => Err(AppError::forbidden("Not a participant of this order")),
    }
}
