//! Record store for users and usage records.
//!
//! Two backings share the [`RecordStore`] contract: [`MemoryStore`] for local
//! development and tests, [`PgStore`] for production. They differ in one place:
//! `count_usage_since(None, ..)` counts anonymous records in memory but
//! always returns `0` in PostgreSQL, where anonymous usage is not tracked.

pub mod memory;
pub mod models;
pub mod store;
pub mod usage;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryStore;
pub use models::{NewUsage, NewUser, Plan, UsageRecord, User};
pub use store::PgStore;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed row: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// key: record-store -> users,usage
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts or overwrites the mutable fields of a user, keeping the original
    /// `created_at` when the id already exists.
    async fn upsert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn record_usage(&self, usage: NewUsage) -> StoreResult<UsageRecord>;

    /// Records `usage` only while the identity has fewer than `limit` records
    /// created after `since`. The count and the insert are atomic per identity.
    async fn record_usage_within_quota(
        &self,
        usage: NewUsage,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Option<UsageRecord>>;

    /// Most recent first, at most `limit` records.
    async fn get_history(&self, user_id: &str, limit: usize) -> StoreResult<Vec<UsageRecord>>;

    async fn count_usage_since(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StoreResult<i64>;
}
