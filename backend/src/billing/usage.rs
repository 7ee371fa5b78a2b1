use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;

use super::entitlement::{window_start, FREE_LIMIT};
use crate::db::{NewUsage, RecordStore, StoreResult, UsageRecord};

/// How usage recording relates to the preceding entitlement check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuotaMode {
    /// Record unconditionally. Concurrent requests from one free identity can
    /// exceed the quota by the number of requests that raced the check.
    #[default]
    Optimistic,
    /// Re-check the free quota atomically with the insert; losers record nothing.
    Strict,
}

impl FromStr for QuotaMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(QuotaMode::Optimistic),
            "strict" => Ok(QuotaMode::Strict),
            other => Err(format!("unknown quota mode `{other}`")),
        }
    }
}

/// One completed generation.
#[derive(Debug, Clone)]
pub struct UsageEntry {
    pub identity: Option<String>,
    pub subject_url: String,
    pub payload_snapshot: Option<String>,
    pub tone_label: Option<String>,
    pub is_pro: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Stored(UsageRecord),
    /// Strict mode only: the free allowance was used up after the check passed.
    QuotaExhausted,
}

/// key: billing-usage -> append-only generation ledger
#[derive(Clone)]
pub struct UsageRecorder {
    store: Arc<dyn RecordStore>,
    mode: QuotaMode,
}

impl UsageRecorder {
    pub fn new(store: Arc<dyn RecordStore>, mode: QuotaMode) -> Self {
        Self { store, mode }
    }

    pub async fn record(&self, entry: UsageEntry) -> StoreResult<Recorded> {
        let is_pro = entry.is_pro;
        let usage = NewUsage {
            user_id: entry.identity,
            subject_url: entry.subject_url,
            payload_snapshot: entry.payload_snapshot,
            tone_label: entry.tone_label,
        };

        let recorded = match self.mode {
            QuotaMode::Strict if !is_pro => {
                let since = window_start(Utc::now());
                match self
                    .store
                    .record_usage_within_quota(usage, since, FREE_LIMIT)
                    .await?
                {
                    Some(record) => Recorded::Stored(record),
                    None => Recorded::QuotaExhausted,
                }
            }
            _ => Recorded::Stored(self.store.record_usage(usage).await?),
        };

        match &recorded {
            Recorded::Stored(record) => tracing::info!(
                usage_id = record.id,
                user_id = ?record.user_id,
                url = %record.subject_url,
                "usage recorded"
            ),
            Recorded::QuotaExhausted => {
                tracing::warn!("free quota consumed concurrently; usage not recorded")
            }
        }
        Ok(recorded)
    }
}
