//! Input validation helpers
//!
//! Centralized text length constants and request validation functions.
//! Validation is explicit and lives here, decoupled from the storage layer.

use crate::utils::AppError;
use crate::utils::error::FieldError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: restaurants, menu items, customization options
pub const MAX_NAME_LEN: usize = 200;

/// Notes, descriptions, cancellation reasons, rating comments
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone numbers, promo codes, labels
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Street addresses
pub const MAX_ADDRESS_LEN: usize = 500;

/// Maximum quantity per order line
pub const MAX_QUANTITY: i32 = 99;

/// Maximum price for a menu item
pub const MAX_PRICE: f64 = 10_000.0;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Minimal email shape check: one '@' with something on both sides
pub fn validate_email(email: &str) -> Result<(), AppError> {
    validate_required_text(email, "email", MAX_EMAIL_LEN)?;
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AppError::validation("email is not a valid address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a monetary amount: finite, non-negative, bounded
pub fn validate_price(value: f64, field: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{field} must be a finite number"
        )));
    }
    if value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be non-negative"
        )));
    }
    if value > MAX_PRICE {
        return Err(AppError::validation(format!(
            "{field} exceeds maximum allowed ({MAX_PRICE})"
        )));
    }
    Ok(())
}

pub fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity <= 0 {
        return Err(AppError::validation("quantity must be positive"));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY})"
        )));
    }
    Ok(())
}

/// Rating scores are 1..=5
pub fn validate_rating_score(score: i32, field: &str) -> Result<(), AppError> {
    if !(1..=5).contains(&score) {
        return Err(AppError::validation(format!(
            "{field} must be between 1 and 5"
        )));
    }
    Ok(())
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        errors.push(FieldError::new(
            "latitude",
            "must be between -90 and 90",
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        errors.push(FieldError::new(
            "longitude",
            "must be between -180 and 180",
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationFields(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Pizza", "name", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(300), "name", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@nodot").is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating_score(1, "overall").is_ok());
        assert!(validate_rating_score(5, "overall").is_ok());
        assert!(validate_rating_score(0, "overall").is_err());
        assert!(validate_rating_score(6, "overall").is_err());
    }

    #[test]
    fn test_coordinates() {
        assert!(validate_coordinates(40.4, -3.7).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 181.0).is_err());
    }
}
