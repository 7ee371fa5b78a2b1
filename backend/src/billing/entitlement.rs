use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{RecordStore, StoreResult};

/// Generations a free or anonymous identity gets per quota window.
pub const FREE_LIMIT: i64 = 1;
pub const QUOTA_WINDOW_DAYS: i64 = 30;
pub const QUOTA_EXCEEDED_REASON: &str =
    "Free plan limit reached. Upgrade to Pro for unlimited access.";

/// Start of the sliding quota window ending at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(QUOTA_WINDOW_DAYS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// `None` for pro accounts, which are never usage-limited.
    pub remaining_free: Option<i64>,
}

impl EntitlementDecision {
    fn unlimited() -> Self {
        Self {
            allowed: true,
            reason: None,
            remaining_free: None,
        }
    }
}

/// key: billing-entitlement -> free/pro generation gate
///
/// The decision is a point-in-time read. Nothing reserves the allowance, so two
/// concurrent requests for the same free identity can both be allowed; see
/// [`crate::billing::usage::QuotaMode::Strict`] for the variant that re-checks
/// when recording.
#[derive(Clone)]
pub struct EntitlementEngine {
    store: Arc<dyn RecordStore>,
}

impl EntitlementEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn can_generate(&self, identity: Option<&str>) -> StoreResult<EntitlementDecision> {
        self.can_generate_at(identity, Utc::now()).await
    }

    pub async fn can_generate_at(
        &self,
        identity: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<EntitlementDecision> {
        if let Some(user_id) = identity {
            if let Some(user) = self.store.get_user_by_id(user_id).await? {
                if user.is_pro() {
                    return Ok(EntitlementDecision::unlimited());
                }
            }
        }

        let used = self
            .store
            .count_usage_since(identity, window_start(now))
            .await?;
        if used >= FREE_LIMIT {
            tracing::debug!(identity = ?identity, used, "free quota exhausted");
            return Ok(EntitlementDecision {
                allowed: false,
                reason: Some(QUOTA_EXCEEDED_REASON.to_string()),
                remaining_free: Some(0),
            });
        }

        Ok(EntitlementDecision {
            allowed: true,
            reason: None,
            remaining_free: Some(FREE_LIMIT - used),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewUsage, NewUser, Plan};

    async fn engine_with_user(plan: Option<Plan>) -> (Arc<MemoryStore>, EntitlementEngine) {
        let store = Arc::new(MemoryStore::new());
        if let Some(plan) = plan {
            store
                .upsert_user(NewUser {
                    id: "cus_1".into(),
                    email: "a@b.com".into(),
                    plan,
                    subscription_ref: (plan == Plan::Pro).then(|| "sub_1".to_string()),
                    created_at: None,
                })
                .await
                .unwrap();
        }
        let engine = EntitlementEngine::new(store.clone());
        (store, engine)
    }

    async fn use_once(store: &MemoryStore, user_id: Option<&str>) {
        store
            .record_usage(NewUsage {
                user_id: user_id.map(str::to_string),
                subject_url: "https://example.com/post".into(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_free_user_has_one_generation() {
        let (_store, engine) = engine_with_user(Some(Plan::Free)).await;
        let decision = engine.can_generate(Some("cus_1")).await.unwrap();
        assert_eq!(
            decision,
            EntitlementDecision {
                allowed: true,
                reason: None,
                remaining_free: Some(1),
            }
        );
    }

    #[tokio::test]
    async fn used_free_user_is_rejected() {
        let (store, engine) = engine_with_user(Some(Plan::Free)).await;
        use_once(&store, Some("cus_1")).await;
        let decision = engine.can_generate(Some("cus_1")).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some(QUOTA_EXCEEDED_REASON));
        assert_eq!(decision.remaining_free, Some(0));
    }

    #[tokio::test]
    async fn pro_user_ignores_usage() {
        let (store, engine) = engine_with_user(Some(Plan::Pro)).await;
        for _ in 0..5 {
            use_once(&store, Some("cus_1")).await;
        }
        let decision = engine.can_generate(Some("cus_1")).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining_free, None);
    }

    #[tokio::test]
    async fn unknown_user_is_treated_as_free() {
        let (store, engine) = engine_with_user(None).await;
        assert!(engine.can_generate(Some("cus_x")).await.unwrap().allowed);
        use_once(&store, Some("cus_x")).await;
        assert!(!engine.can_generate(Some("cus_x")).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn anonymous_quota_is_shared_in_memory() {
        let (store, engine) = engine_with_user(None).await;
        use_once(&store, None).await;
        assert!(!engine.can_generate(None).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn window_slides_past_thirty_days() {
        let (store, engine) = engine_with_user(Some(Plan::Free)).await;
        use_once(&store, Some("cus_1")).await;
        let now = Utc::now();
        assert!(
            !engine
                .can_generate_at(Some("cus_1"), now + Duration::days(29))
                .await
                .unwrap()
                .allowed
        );
        let later = engine
            .can_generate_at(Some("cus_1"), now + Duration::days(31))
            .await
            .unwrap();
        assert!(later.allowed);
        assert_eq!(later.remaining_free, Some(1));
    }
}
