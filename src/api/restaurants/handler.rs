//! Restaurant Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{
    MenuItem, Restaurant, RestaurantCreate, RestaurantUpdate, UserRole,
};
use crate::db::repository::{MenuItemRepository, RestaurantRepository, parse_record_id};
use crate::utils::geo::haversine_km;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, validate_coordinates, validate_optional_text, validate_price,
    validate_required_text,
};
use crate::utils::{ApiResponse, AppError, AppResult, ok, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// When both coordinates are given, only restaurants whose delivery
    /// radius covers the point are returned
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Listed restaurant with the distance from the queried point
#[derive(Debug, Serialize)]
pub struct ListedRestaurant {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// List active restaurants, optionally filtered by delivery coverage
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<ListedRestaurant>>>> {
    let restaurants = RestaurantRepository::new(state.db.clone())
        .find_active()
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    let listed = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            validate_coordinates(lat, lng)?;
            let mut covered: Vec<ListedRestaurant> = restaurants
                .into_iter()
                .filter_map(|r| {
                    let distance =
                        haversine_km(r.address.latitude, r.address.longitude, lat, lng);
                    (distance <= r.delivery_radius_km).then_some(ListedRestaurant {
                        restaurant: r,
                        distance_km: Some((distance * 10.0).round() / 10.0),
                    })
                })
                .collect();
            covered.sort_by(|a, b| {
                a.distance_km
                    .partial_cmp(&b.distance_km)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            covered
        }
        _ => restaurants
            .into_iter()
            .map(|r| ListedRestaurant {
                restaurant: r,
                distance_km: None,
            })
            .collect(),
    };
    Ok(ok(listed))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    let restaurant = RestaurantRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Restaurant {id} not found")))?;
    Ok(ok(restaurant))
}

fn validate_profile(req: &RestaurantCreate) -> AppResult<()> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&req.description, "description", MAX_NOTE_LEN)?;
    validate_coordinates(req.address.latitude, req.address.longitude)?;
    validate_price(req.delivery_fee, "delivery_fee")?;
    validate_price(req.minimum_order, "minimum_order")?;
    if !req.delivery_radius_km.is_finite() || req.delivery_radius_km <= 0.0 {
        return Err(AppError::validation("delivery_radius_km must be positive"));
    }
    Ok(())
}

/// Create a restaurant. Restaurant accounts only; one restaurant per owner.
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(req): Json<RestaurantCreate>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    user.require_role(&[UserRole::Restaurant])?;
    validate_profile(&req)?;

    let repo = RestaurantRepository::new(state.db.clone());
    if repo
        .find_by_owner(&user.id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::conflict("You already manage a restaurant"));
    }

    let restaurant = repo
        .create(Restaurant {
            id: None,
            owner: parse_record_id(&user.id, "user")
                .map_err(|e| AppError::database(e.to_string()))?,
            name: req.name.trim().to_string(),
            description: req.description,
            cuisine: req.cuisine,
            address: req.address,
            phone: req.phone,
            is_active: true,
            opening_hours: req.opening_hours,
            timezone: req.timezone.unwrap_or_else(|| "UTC".to_string()),
            delivery_radius_km: req.delivery_radius_km,
            delivery_fee: req.delivery_fee,
            minimum_order: req.minimum_order,
            rating: 0.0,
            rating_count: 0,
            created_at: Utc::now().to_rfc3339(),
        })
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!("Restaurant created: {} by {}", restaurant.name, user.email);
    Ok(ok_with_message(restaurant, "Restaurant created"))
}

/// Partial update by the owner (or an admin)
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<RestaurantUpdate>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    if let Some(name) = &req.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&req.description, "description", MAX_NOTE_LEN)?;
    if let Some(fee) = req.delivery_fee {
        validate_price(fee, "delivery_fee")?;
    }
    if let Some(minimum) = req.minimum_order {
        validate_price(minimum, "minimum_order")?;
    }

    let repo = RestaurantRepository::new(state.db.clone());
    ensure_owner_or_admin(&repo, &user, &id).await?;

    let updated = repo.update(&id, req).await.map_err(|e| match e {
        crate::db::repository::RepoError::NotFound(msg) => AppError::not_found(msg),
        other => AppError::database(other.to_string()),
    })?;
    Ok(ok(updated))
}

/// Restaurant menu. Owners and admins also see unavailable items.
pub async fn menu(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<MenuItem>>>> {
    let repo = RestaurantRepository::new(state.db.clone());
    let restaurant = repo
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Restaurant {id} not found")))?;

    let is_manager = user.is_admin() || restaurant.owner.to_string() == user.id;
    let items = MenuItemRepository::new(state.db.clone())
        .find_by_restaurant(&id, !is_manager)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(ok(items))
}

/// Load the restaurant and require the caller to be its owner or an admin
pub async fn ensure_owner_or_admin(
    repo: &RestaurantRepository,
    user: &CurrentUser,
    restaurant_id: &str,
) -> AppResult<Restaurant> {
    let restaurant = repo
        .find_by_id(restaurant_id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Restaurant {restaurant_id} not found")))?;
    if !user.is_admin() && restaurant.owner.to_string() != user.id {
        return Err(AppError::forbidden("Not your restaurant"));
    }
    Ok(restaurant)
}
