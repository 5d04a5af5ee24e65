//! Socket session
//!
//! Built once from the validated handshake token and stored in the
//! socket's extensions. Immutable for the lifetime of the connection.

use crate::db::models::UserRole;

#[derive(Debug, Clone)]
pub struct Session {
    /// User record id as "user:xxx"
    pub user_id: String,
    pub role: UserRole,
    /// Owned restaurant id, resolved at connect time for restaurant users
    pub restaurant_id: Option<String>,
}
