use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{now_millis, NewUsage, NewUser, UsageRecord, User};
use super::{RecordStore, StoreResult};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<String, User>,
    usage: Vec<UsageRecord>,
    next_usage_id: i64,
}

impl MemoryState {
    fn count_since(&self, user_id: Option<&str>, since: DateTime<Utc>) -> i64 {
        self.usage
            .iter()
            .filter(|record| record.user_id.as_deref() == user_id && record.created_at > since)
            .count() as i64
    }

    fn push(&mut self, usage: NewUsage) -> UsageRecord {
        self.next_usage_id += 1;
        let record = UsageRecord {
            id: self.next_usage_id,
            user_id: usage.user_id,
            subject_url: usage.subject_url,
            payload_snapshot: usage.payload_snapshot,
            tone_label: usage.tone_label,
            created_at: now_millis(),
        };
        self.usage.push(record.clone());
        record
    }
}

/// key: record-store-memory -> development backing
///
/// Anonymous usage is tracked: a `None` identity matches records stored without a
/// user id.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        let created_at = state
            .users
            .get(&user.id)
            .map(|existing| existing.created_at)
            .or(user.created_at)
            .unwrap_or_else(now_millis);
        let stored = User {
            id: user.id,
            email: user.email,
            plan: user.plan,
            subscription_ref: user.subscription_ref,
            created_at,
        };
        state.users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn record_usage(&self, usage: NewUsage) -> StoreResult<UsageRecord> {
        Ok(self.state.write().await.push(usage))
    }

    async fn record_usage_within_quota(
        &self,
        usage: NewUsage,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Option<UsageRecord>> {
        let mut state = self.state.write().await;
        if state.count_since(usage.user_id.as_deref(), since) >= limit {
            return Ok(None);
        }
        Ok(Some(state.push(usage)))
    }

    async fn get_history(&self, user_id: &str, limit: usize) -> StoreResult<Vec<UsageRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<UsageRecord> = state
            .usage
            .iter()
            .filter(|record| record.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn count_usage_since(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        Ok(self.state.read().await.count_since(user_id, since))
    }
}
