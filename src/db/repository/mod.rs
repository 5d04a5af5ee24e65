//! Repository Module
//!
//! CRUD access to the SurrealDB tables. One repository per entity, all
//! sharing [`BaseRepository`] for the database handle.

pub mod menu_item;
pub mod order;
pub mod restaurant;
pub mod user;

pub use menu_item::MenuItemRepository;
pub use order::OrderRepository;
pub use restaurant::RestaurantRepository;
pub use user::UserRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        // Unique-index violations read "Database index `x` already contains ..."
        if message.contains("already contains") {
            RepoError::Duplicate(message)
        } else {
            RepoError::Database(message)
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

/// Parse a "table:key" id string, rejecting ids from other tables
pub fn parse_record_id(id: &str, table: &str) -> RepoResult<surrealdb::RecordId> {
    let record_id: surrealdb::RecordId = id
        .parse()
        .map_err(|_| RepoError::NotFound(format!("Invalid id format: {}", id)))?;
    if record_id.table() != table {
        return Err(RepoError::NotFound(format!(
            "Expected {} id, got: {}",
            table, id
        )));
    }
    Ok(record_id)
}
