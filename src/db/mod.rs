//! Database Module
//!
//! Embedded SurrealDB storage (RocksDB on disk, in-memory for tests).

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "feast";
const DATABASE: &str = "main";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database at the given path
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        define_indexes(&db).await?;
        tracing::info!(path = %db_path, "Database connection established");

        Ok(Self { db })
    }

    /// In-memory database for tests
    #[cfg(test)]
    pub async fn memory() -> Result<Self, AppError> {
        use surrealdb::engine::local::Mem;

        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        define_indexes(&db).await?;
        Ok(Self { db })
    }
}

/// Uniqueness constraints and lookup indexes
async fn define_indexes(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "
        DEFINE INDEX IF NOT EXISTS user_email_unique ON TABLE user FIELDS email UNIQUE;
        DEFINE INDEX IF NOT EXISTS order_number_unique ON TABLE order FIELDS order_number UNIQUE;
        DEFINE INDEX IF NOT EXISTS order_payment_intent ON TABLE order FIELDS payment.intent_id;
        DEFINE INDEX IF NOT EXISTS restaurant_owner ON TABLE restaurant FIELDS owner;
        DEFINE INDEX IF NOT EXISTS menu_item_restaurant ON TABLE menu_item FIELDS restaurant;
        ",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define indexes: {e}")))?;
    Ok(())
}
