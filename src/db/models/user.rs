//! User Model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Restaurant,
    Delivery,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Customer => "customer",
            UserRole::Restaurant => "restaurant",
            UserRole::Delivery => "delivery",
            UserRole::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// Saved delivery address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAddress {
    pub label: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub is_default: bool,
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default,
        with = "serde_helpers::option_record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RecordId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<UserAddress>,
    /// External payment-processor customer id, created lazily on first use
    pub stripe_customer_id: Option<String>,
    /// Default external payment-method reference
    pub default_payment_method: Option<String>,
    pub created_at: String,
}

impl User {
    /// Verify password using argon2
    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let parsed_hash = PasswordHash::new(&self.password_hash)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash password using argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    /// Record id as "user:xxx" string (empty when not yet persisted)
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}

/// Public view of a user (no credentials)
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub addresses: Vec<UserAddress>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id_string(),
            name: u.name,
            email: u.email,
            role: u.role,
            phone: u.phone,
            addresses: u.addresses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = User::hash_password("hunter2hunter2").unwrap();
        let user = User {
            id: None,
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password_hash: hash,
            role: UserRole::Customer,
            phone: None,
            addresses: vec![],
            stripe_customer_id: None,
            default_payment_method: None,
            created_at: String::new(),
        };

        assert!(user.verify_password("hunter2hunter2").unwrap());
        assert!(!user.verify_password("wrong-password").unwrap());
    }
}
