use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{NewUsage, NewUser, UsageRecord, User};
use super::{usage, users, RecordStore, StoreResult};

/// key: record-store-postgres -> durable backing
///
/// Anonymous usage rows are written but never counted.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn upsert_user(&self, user: NewUser) -> StoreResult<User> {
        users::upsert(&self.pool, &user).await
    }

    async fn get_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        users::get_by_id(&self.pool, id).await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        users::get_by_email(&self.pool, email).await
    }

    async fn record_usage(&self, input: NewUsage) -> StoreResult<UsageRecord> {
        usage::insert(&self.pool, &input).await
    }

    async fn record_usage_within_quota(
        &self,
        input: NewUsage,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Option<UsageRecord>> {
        let Some(user_id) = input.user_id.clone() else {
            return usage::insert(&self.pool, &input).await.map(Some);
        };

        let mut tx = self.pool.begin().await?;
        usage::lock_user(&mut tx, &user_id).await?;
        let used = usage::count_since(&mut tx, &user_id, since).await?;
        if used >= limit {
            tx.rollback().await?;
            return Ok(None);
        }
        let record = usage::insert(&mut tx, &input).await?;
        tx.commit().await?;
        Ok(Some(record))
    }

    async fn get_history(&self, user_id: &str, limit: usize) -> StoreResult<Vec<UsageRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        usage::list_for_user(&self.pool, user_id, limit).await
    }

    async fn count_usage_since(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        match user_id {
            Some(user_id) => usage::count_since(&self.pool, user_id, since).await,
            None => Ok(0),
        }
    }
}
