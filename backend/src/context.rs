use std::sync::Arc;

use crate::billing::{
    BillingProviderAdapter, EntitlementEngine, QuotaMode, Reconciler, UsageRecorder,
    WebhookVerifier,
};
use crate::content::{ContentGenerator, TextExtractor};
use crate::db::RecordStore;

/// Outbound collaborators, swappable in tests.
#[derive(Clone)]
pub struct Collaborators {
    pub billing: Arc<dyn BillingProviderAdapter>,
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn ContentGenerator>,
}

#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub webhook_secret: String,
    pub quota_mode: QuotaMode,
    pub price_id: Option<String>,
    pub app_base_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub price_id: Option<String>,
    pub app_base_url: String,
}

/// key: app-context -> per-process service graph shared by handlers
///
/// Every service holds the same store instance; nothing else owns entity state.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub entitlements: EntitlementEngine,
    pub recorder: UsageRecorder,
    pub reconciler: Reconciler,
    pub verifier: WebhookVerifier,
    pub billing: Arc<dyn BillingProviderAdapter>,
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn ContentGenerator>,
    pub checkout: CheckoutSettings,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        collaborators: Collaborators,
        settings: ContextSettings,
    ) -> Self {
        Self {
            entitlements: EntitlementEngine::new(store.clone()),
            recorder: UsageRecorder::new(store.clone(), settings.quota_mode),
            reconciler: Reconciler::new(store.clone(), collaborators.billing.clone()),
            verifier: WebhookVerifier::new(settings.webhook_secret),
            billing: collaborators.billing,
            extractor: collaborators.extractor,
            generator: collaborators.generator,
            checkout: CheckoutSettings {
                price_id: settings.price_id,
                app_base_url: settings.app_base_url,
            },
            store,
        }
    }
}
