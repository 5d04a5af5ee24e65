//! Auth Handlers
//!
//! Registration, login and the current-user profile.

use std::time::Duration;

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{User, UserProfile, UserRole};
use crate::db::repository::{RepoError, UserRepository};
use crate::security_log;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_email, validate_optional_text, validate_password,
    validate_required_text,
};
use crate::utils::{ApiResponse, AppError, AppResult, ok, ok_with_message};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// customer | restaurant | delivery; defaults to customer
    pub role: Option<UserRole>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Register a new account
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_optional_text(&req.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    let role = req.role.unwrap_or(UserRole::Customer);
    if role == UserRole::Admin {
        return Err(AppError::forbidden("Cannot self-register as admin"));
    }

    let email = req.email.trim().to_lowercase();
    let repo = UserRepository::new(state.db.clone());
    if repo
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::conflict("Email is already registered"));
    }

    let password_hash = User::hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let user = repo
        .create(User {
            id: None,
            name: req.name.trim().to_string(),
            email,
            password_hash,
            role,
            phone: req.phone,
            addresses: Vec::new(),
            stripe_customer_id: None,
            default_payment_method: None,
            created_at: Utc::now().to_rfc3339(),
        })
        .await
        .map_err(|e| match e {
            // The unique index can still race a concurrent registration
            RepoError::Duplicate(_) => AppError::conflict("Email is already registered"),
            other => AppError::database(other.to_string()),
        })?;

    let token = state
        .jwt_service
        .generate_token(&user.id_string(), &user.name, &user.email, user.role)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    security_log!("INFO", "user_registered", email = user.email.clone());
    Ok(ok_with_message(
        LoginResponse {
            token,
            user: user.into(),
        },
        "Account created",
    ))
}

/// Login with email and password
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let email = req.email.trim().to_lowercase();
    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_email(&email)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Unified error message to prevent account enumeration
    let user = match user {
        Some(user) => {
            let password_valid = user
                .verify_password(&req.password)
                .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
            if !password_valid {
                security_log!(
                    "WARN",
                    "login_failed",
                    email = email.clone(),
                    reason = "invalid_credentials"
                );
                return Err(AppError::invalid_credentials());
            }
            user
        }
        None => {
            security_log!(
                "WARN",
                "login_failed",
                email = email.clone(),
                reason = "user_not_found"
            );
            return Err(AppError::invalid_credentials());
        }
    };

    let token = state
        .jwt_service
        .generate_token(&user.id_string(), &user.name, &user.email, user.role)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    tracing::info!("User logged in: {}", user.email);
    Ok(ok(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// Current user profile
pub async fn me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = UserRepository::new(state.db.clone())
        .find_by_id(&user.id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ok(profile.into()))
}
