//! Order Repository
//!
//! Persistence for the order aggregate. Saves go through a version
//! compare-and-swap so concurrent mutations of the same order surface as
//! conflicts instead of silently overwriting each other.

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::Order;

const TABLE: &str = "order";

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create(TABLE).content(order).await?;
        created.ok_or_else(|| RepoError::Database("Create returned no record".into()))
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let record_id = parse_record_id(id, TABLE)?;
        Ok(self.base.db().select(record_id).await?)
    }

    /// Look up an order by the external payment-intent id stored on it
    pub async fn find_by_intent(&self, intent_id: &str) -> RepoResult<Option<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM order WHERE payment.intent_id = $intent LIMIT 1")
            .bind(("intent", intent_id.to_string()))
            .await?;
        let order: Option<Order> = result.take(0)?;
        Ok(order)
    }

    pub async fn list_for_customer(&self, customer_id: &str) -> RepoResult<Vec<Order>> {
        self.list_where("customer = $p", customer_id).await
    }

    pub async fn list_for_restaurant(&self, restaurant_id: &str) -> RepoResult<Vec<Order>> {
        self.list_where("restaurant = $p", restaurant_id).await
    }

    pub async fn list_for_courier(&self, courier_id: &str) -> RepoResult<Vec<Order>> {
        self.list_where("delivery.courier = $p", courier_id).await
    }

    /// Most recent orders across all restaurants (admin view)
    pub async fn list_recent(&self, limit: usize) -> RepoResult<Vec<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM order ORDER BY created_at DESC LIMIT $limit")
            .bind(("limit", limit))
            .await?;
        Ok(result.take(0)?)
    }

    async fn list_where(&self, cond: &str, param: &str) -> RepoResult<Vec<Order>> {
        let sql = format!("SELECT * FROM order WHERE {cond} ORDER BY created_at DESC");
        let mut result = self
            .base
            .db()
            .query(sql)
            .bind(("p", param.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Whether any order's line items snapshot the given menu item
    pub async fn references_menu_item(&self, menu_item_id: &str) -> RepoResult<bool> {
        let mut result = self
            .base
            .db()
            .query("SELECT VALUE id FROM order WHERE $mid IN items[*].menu_item LIMIT 1")
            .bind(("mid", menu_item_id.to_string()))
            .await?;
        let ids: Vec<surrealdb::RecordId> = result.take(0)?;
        Ok(!ids.is_empty())
    }

    /// Overall scores of every rated order for a restaurant, for the
    /// running-average recompute
    pub async fn rated_overall_scores(&self, restaurant_id: &str) -> RepoResult<Vec<i64>> {
        let mut result = self
            .base
            .db()
            .query("SELECT VALUE rating.overall FROM order WHERE restaurant = $rid AND rating != NONE")
            .bind(("rid", restaurant_id.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Save with optimistic concurrency control.
    ///
    /// Expects `order.version` to be the version that was loaded; the
    /// stored record is replaced only if it still carries that version.
    /// Returns `None` when the version check fails (lost race).
    pub async fn save(&self, order: &Order) -> RepoResult<Option<Order>> {
        let id = order
            .id
            .clone()
            .ok_or_else(|| RepoError::Database("Cannot save an unpersisted order".into()))?;
        let expected = order.version;

        let mut next = order.clone();
        next.version = expected + 1;

        let mut data = serde_json::to_value(&next)
            .map_err(|e| RepoError::Database(format!("Serialization failed: {e}")))?;
        if let Some(obj) = data.as_object_mut() {
            obj.remove("id");
        }

        let mut result = self
            .base
            .db()
            .query("UPDATE $id CONTENT $data WHERE version = $expected RETURN AFTER")
            .bind(("id", id))
            .bind(("data", data))
            .bind(("expected", expected))
            .await?;
        let updated: Vec<Order> = result.take(0)?;
        Ok(updated.into_iter().next())
    }
}

/// Parse and validate an order id string
pub fn order_record_id(id: &str) -> RepoResult<surrealdb::RecordId> {
    parse_record_id(id, TABLE)
}
