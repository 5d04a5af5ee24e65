//! Menu Item Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::Serialize;

use crate::api::restaurants::handler::ensure_owner_or_admin;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{MenuItem, MenuItemCreate, MenuItemUpdate};
use crate::db::repository::{
    MenuItemRepository, OrderRepository, RepoError, RestaurantRepository, parse_record_id,
};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, validate_optional_text, validate_price, validate_required_text,
};
use crate::utils::{ApiResponse, AppError, AppResult, ok, ok_with_message};

fn repo_err(e: RepoError) -> AppError {
    match e {
        RepoError::NotFound(msg) => AppError::not_found(msg),
        other => AppError::database(other.to_string()),
    }
}

/// Create a menu item on the caller's restaurant
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<MenuItemCreate>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&req.description, "description", MAX_NOTE_LEN)?;
    validate_price(req.price, "price")?;
    if let Some(discounted) = req.discounted_price {
        validate_price(discounted, "discounted_price")?;
        if discounted > req.price {
            return Err(AppError::validation(
                "discounted_price must not exceed price",
            ));
        }
    }
    for group in &req.customization_groups {
        validate_required_text(&group.name, "customization group name", MAX_NAME_LEN)?;
        for option in &group.options {
            validate_required_text(&option.name, "customization option name", MAX_NAME_LEN)?;
            validate_price(option.surcharge, "surcharge")?;
        }
    }

    let restaurants = RestaurantRepository::new(state.db.clone());
    ensure_owner_or_admin(&restaurants, &user, &req.restaurant).await?;

    let item = MenuItemRepository::new(state.db.clone())
        .create(MenuItem {
            id: None,
            restaurant: parse_record_id(&req.restaurant, "restaurant").map_err(repo_err)?,
            name: req.name.trim().to_string(),
            description: req.description,
            price: req.price,
            discounted_price: req.discounted_price,
            customization_groups: req.customization_groups,
            dietary: req.dietary,
            preparation_minutes: req.preparation_minutes.unwrap_or(15),
            is_available: true,
            created_at: Utc::now().to_rfc3339(),
        })
        .await
        .map_err(repo_err)?;
    Ok(ok_with_message(item, "Menu item created"))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let item = MenuItemRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .map_err(repo_err)?
        .ok_or_else(|| AppError::not_found(format!("Menu item {id} not found")))?;
    Ok(ok(item))
}

pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<MenuItemUpdate>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    if let Some(name) = &req.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&req.description, "description", MAX_NOTE_LEN)?;
    if let Some(price) = req.price {
        validate_price(price, "price")?;
    }
    if let Some(discounted) = req.discounted_price {
        validate_price(discounted, "discounted_price")?;
    }

    let repo = MenuItemRepository::new(state.db.clone());
    let item = repo
        .find_by_id(&id)
        .await
        .map_err(repo_err)?
        .ok_or_else(|| AppError::not_found(format!("Menu item {id} not found")))?;

    let restaurants = RestaurantRepository::new(state.db.clone());
    ensure_owner_or_admin(&restaurants, &user, &item.restaurant.to_string()).await?;

    let updated = repo.update(&id, req).await.map_err(repo_err)?;
    Ok(ok(updated))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    /// false when the item was only marked unavailable because past
    /// orders reference it
    pub deleted: bool,
}

/// Delete a menu item. Items referenced by past orders are kept for
/// history and marked unavailable instead.
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<DeleteResponse>>> {
    let repo = MenuItemRepository::new(state.db.clone());
    let item = repo
        .find_by_id(&id)
        .await
        .map_err(repo_err)?
        .ok_or_else(|| AppError::not_found(format!("Menu item {id} not found")))?;

    let restaurants = RestaurantRepository::new(state.db.clone());
    ensure_owner_or_admin(&restaurants, &user, &item.restaurant.to_string()).await?;

    let referenced = OrderRepository::new(state.db.clone())
        .references_menu_item(&id)
        .await
        .map_err(repo_err)?;

    if referenced {
        repo.update(
            &id,
            MenuItemUpdate {
                name: None,
                description: None,
                price: None,
                discounted_price: None,
                customization_groups: None,
                dietary: None,
                preparation_minutes: None,
                is_available: Some(false),
            },
        )
        .await
        .map_err(repo_err)?;
        Ok(ok_with_message(
            DeleteResponse { id, deleted: false },
            "Item is referenced by orders; marked unavailable instead",
        ))
    } else {
        repo.delete(&id).await.map_err(repo_err)?;
        Ok(ok(DeleteResponse { id, deleted: true }))
    }
}
