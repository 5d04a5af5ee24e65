//! Restaurant Repository

use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{Restaurant, RestaurantUpdate};

const TABLE: &str = "restaurant";

#[derive(Clone)]
pub struct RestaurantRepository {
    base: BaseRepository,
}

impl RestaurantRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, restaurant: Restaurant) -> RepoResult<Restaurant> {
        let created: Option<Restaurant> =
            self.base.db().create(TABLE).content(restaurant).await?;
        created.ok_or_else(|| RepoError::Database("Create returned no record".into()))
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Restaurant>> {
        let record_id = parse_record_id(id, TABLE)?;
        Ok(self.base.db().select(record_id).await?)
    }

    /// All active restaurants
    pub async fn find_active(&self) -> RepoResult<Vec<Restaurant>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM restaurant WHERE is_active = true ORDER BY name")
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn find_by_owner(&self, owner_id: &str) -> RepoResult<Option<Restaurant>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM restaurant WHERE owner = $owner LIMIT 1")
            .bind(("owner", owner_id.to_string()))
            .await?;
        let restaurant: Option<Restaurant> = result.take(0)?;
        Ok(restaurant)
    }

    /// Partial update; only the provided fields are merged
    pub async fn update(&self, id: &str, update: RestaurantUpdate) -> RepoResult<Restaurant> {
        let record_id = parse_record_id(id, TABLE)?;

        let mut merge = serde_json::Map::new();
        if let Some(v) = update.name {
            merge.insert("name".into(), json!(v));
        }
        if let Some(v) = update.description {
            merge.insert("description".into(), json!(v));
        }
        if let Some(v) = update.cuisine {
            merge.insert("cuisine".into(), json!(v));
        }
        if let Some(v) = update.address {
            merge.insert("address".into(), json!(v));
        }
        if let Some(v) = update.phone {
            merge.insert("phone".into(), json!(v));
        }
        if let Some(v) = update.is_active {
            merge.insert("is_active".into(), json!(v));
        }
        if let Some(v) = update.opening_hours {
            merge.insert("opening_hours".into(), json!(v));
        }
        if let Some(v) = update.timezone {
            merge.insert("timezone".into(), json!(v));
        }
        if let Some(v) = update.delivery_radius_km {
            merge.insert("delivery_radius_km".into(), json!(v));
        }
        if let Some(v) = update.delivery_fee {
            merge.insert("delivery_fee".into(), json!(v));
        }
        if let Some(v) = update.minimum_order {
            merge.insert("minimum_order".into(), json!(v));
        }

        let updated: Option<Restaurant> = self
            .base
            .db()
            .update(record_id)
            .merge(serde_json::Value::Object(merge))
            .await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Restaurant {} not found", id)))
    }

    /// Replace the running average rating and count
    pub async fn update_rating(&self, id: &str, rating: f64, count: i64) -> RepoResult<()> {
        let record_id = parse_record_id(id, TABLE)?;
        self.base
            .db()
            .query("UPDATE $id SET rating = $rating, rating_count = $count")
            .bind(("id", record_id))
            .bind(("rating", rating))
            .bind(("count", count))
            .await?;
        Ok(())
    }
}
