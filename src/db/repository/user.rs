//! User Repository

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::User;

const TABLE: &str = "user";

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, user: User) -> RepoResult<User> {
        let created: Option<User> = self.base.db().create(TABLE).content(user).await?;
        created.ok_or_else(|| RepoError::Database("Create returned no record".into()))
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let record_id = parse_record_id(id, TABLE)?;
        Ok(self.base.db().select(record_id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE email = $email LIMIT 1")
            .bind(("email", email.to_string()))
            .await?;
        let user: Option<User> = result.take(0)?;
        Ok(user)
    }

    /// Persist the lazily-created external payment-processor customer id
    pub async fn set_stripe_customer(&self, id: &str, customer_id: &str) -> RepoResult<()> {
        let record_id = parse_record_id(id, TABLE)?;
        self.base
            .db()
            .query("UPDATE $id SET stripe_customer_id = $cid")
            .bind(("id", record_id))
            .bind(("cid", customer_id.to_string()))
            .await?;
        Ok(())
    }

    /// Remember the payment method last used for a successful confirmation
    pub async fn set_default_payment_method(&self, id: &str, method_id: &str) -> RepoResult<()> {
        let record_id = parse_record_id(id, TABLE)?;
        self.base
            .db()
            .query("UPDATE $id SET default_payment_method = $pm")
            .bind(("id", record_id))
            .bind(("pm", method_id.to_string()))
            .await?;
        Ok(())
    }
}
