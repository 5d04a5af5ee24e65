//! Menu Item Repository

use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{MenuItem, MenuItemUpdate};

const TABLE: &str = "menu_item";

#[derive(Clone)]
pub struct MenuItemRepository {
    base: BaseRepository,
}

impl MenuItemRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, item: MenuItem) -> RepoResult<MenuItem> {
        let created: Option<MenuItem> = self.base.db().create(TABLE).content(item).await?;
        created.ok_or_else(|| RepoError::Database("Create returned no record".into()))
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<MenuItem>> {
        let record_id = parse_record_id(id, TABLE)?;
        Ok(self.base.db().select(record_id).await?)
    }

    /// All menu items for a restaurant; optionally only available ones
    pub async fn find_by_restaurant(
        &self,
        restaurant_id: &str,
        only_available: bool,
    ) -> RepoResult<Vec<MenuItem>> {
        let sql = if only_available {
            "SELECT * FROM menu_item WHERE restaurant = $rid AND is_available = true ORDER BY name"
        } else {
            "SELECT * FROM menu_item WHERE restaurant = $rid ORDER BY name"
        };
        let mut result = self
            .base
            .db()
            .query(sql)
            .bind(("rid", restaurant_id.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Partial update; only the provided fields are merged
    pub async fn update(&self, id: &str, update: MenuItemUpdate) -> RepoResult<MenuItem> {
        let record_id = parse_record_id(id, TABLE)?;

        let mut merge = serde_json::Map::new();
        if let Some(v) = update.name {
            merge.insert("name".into(), json!(v));
        }
        if let Some(v) = update.description {
            merge.insert("description".into(), json!(v));
        }
        if let Some(v) = update.price {
            merge.insert("price".into(), json!(v));
        }
        if let Some(v) = update.discounted_price {
            merge.insert("discounted_price".into(), json!(v));
        }
        if let Some(v) = update.customization_groups {
            merge.insert("customization_groups".into(), json!(v));
        }
        if let Some(v) = update.dietary {
            merge.insert("dietary".into(), json!(v));
        }
        if let Some(v) = update.preparation_minutes {
            merge.insert("preparation_minutes".into(), json!(v));
        }
        if let Some(v) = update.is_available {
            merge.insert("is_available".into(), json!(v));
        }

        let updated: Option<MenuItem> = self
            .base
            .db()
            .update(record_id)
            .merge(serde_json::Value::Object(merge))
            .await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Menu item {} not found", id)))
    }

    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let record_id = parse_record_id(id, TABLE)?;
        let deleted: Option<MenuItem> = self.base.db().delete(record_id).await?;
        Ok(deleted.is_some())
    }
}
