#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Barrier;
use tower::ServiceExt;
use url::Url;

use repurpose::billing::{
    signature_header, BillingProviderAdapter, BillingProviderError, CheckoutSession, QuotaMode,
};
use repurpose::content::{
    ContentGenerator, FetchError, GeneratedContent, GenerationError, TextExtractor, VideoScript,
};
use repurpose::db::{
    MemoryStore, NewUsage, NewUser, Plan, RecordStore, StoreError, StoreResult, UsageRecord, User,
};
use repurpose::{routes, AppContext, Collaborators, ContextSettings};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct StubExtractor {
    pub fail: bool,
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, url: &Url) -> Result<String, FetchError> {
        if self.fail {
            return Err(FetchError::Status(503));
        }
        Ok(format!("Article text from {url}"))
    }
}

#[derive(Default)]
pub struct StubGenerator {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub barrier: Option<Arc<Barrier>>,
}

impl StubGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn generate(
        &self,
        text: &str,
        tone: &str,
        is_pro: bool,
    ) -> Result<GeneratedContent, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(GeneratedContent {
            summary: format!("Summary of: {text}"),
            short_video_script: VideoScript {
                hook: "Hook".into(),
                body: format!("Body in a {tone} tone"),
                cta: "Follow".into(),
            },
            thread_posts: vec!["1/2".into(), "2/2".into()],
            professional_post: "Post".into(),
            localized_article: "記事".into(),
            watermark: !is_pro,
        })
    }
}

#[derive(Default)]
pub struct StubBilling {
    pub checkout_url: Option<String>,
    pub customer_email: Option<String>,
    pub checkouts: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl BillingProviderAdapter for StubBilling {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingProviderError> {
        self.checkouts.lock().unwrap().push((
            price_id.to_string(),
            success_url.to_string(),
            cancel_url.to_string(),
        ));
        Ok(CheckoutSession {
            id: "cs_test_1".into(),
            url: self.checkout_url.clone(),
        })
    }

    async fn customer_email(
        &self,
        _customer_id: &str,
    ) -> Result<Option<String>, BillingProviderError> {
        Ok(self.customer_email.clone())
    }
}

/// Record store whose backend is always unreachable.
pub struct FailingStore;

fn offline<T>() -> StoreResult<T> {
    Err(StoreError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn upsert_user(&self, _user: NewUser) -> StoreResult<User> {
        offline()
    }

    async fn get_user_by_id(&self, _id: &str) -> StoreResult<Option<User>> {
        offline()
    }

    async fn get_user_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        offline()
    }

    async fn record_usage(&self, _usage: NewUsage) -> StoreResult<UsageRecord> {
        offline()
    }

    async fn record_usage_within_quota(
        &self,
        _usage: NewUsage,
        _since: DateTime<Utc>,
        _limit: i64,
    ) -> StoreResult<Option<UsageRecord>> {
        offline()
    }

    async fn get_history(&self, _user_id: &str, _limit: usize) -> StoreResult<Vec<UsageRecord>> {
        offline()
    }

    async fn count_usage_since(
        &self,
        _user_id: Option<&str>,
        _since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        offline()
    }
}

pub struct Options {
    pub quota_mode: QuotaMode,
    pub extractor_fails: bool,
    pub generator_fails: bool,
    pub barrier: Option<Arc<Barrier>>,
    pub price_id: Option<String>,
    pub billing: StubBilling,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            quota_mode: QuotaMode::Optimistic,
            extractor_fails: false,
            generator_fails: false,
            barrier: None,
            price_id: Some("price_pro_monthly".into()),
            billing: StubBilling {
                checkout_url: Some("https://checkout.test/session".into()),
                ..Default::default()
            },
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub generator: Arc<StubGenerator>,
    pub billing: Arc<StubBilling>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    pub fn with(options: Options) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (router, generator, billing) = assemble(options, store.clone());
        Self {
            router,
            store,
            generator,
            billing,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(self.router.clone(), request).await
    }

    pub async fn generate(&self, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", "/api/generate", &body)).await
    }

    pub async fn seed_user(&self, id: &str, plan: Plan) -> User {
        self.store
            .upsert_user(NewUser {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                plan,
                subscription_ref: (plan == Plan::Pro).then(|| format!("sub_{id}")),
                created_at: None,
            })
            .await
            .unwrap()
    }
}

/// Router over [`FailingStore`].
pub struct OfflineApp {
    pub router: Router,
    pub generator: Arc<StubGenerator>,
}

impl OfflineApp {
    pub fn new() -> Self {
        let (router, generator, _) = assemble(Options::default(), Arc::new(FailingStore));
        Self { router, generator }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        send(self.router.clone(), request).await
    }
}

fn assemble(
    options: Options,
    store: Arc<dyn RecordStore>,
) -> (Router, Arc<StubGenerator>, Arc<StubBilling>) {
    let generator = Arc::new(StubGenerator {
        fail: options.generator_fails,
        barrier: options.barrier,
        ..Default::default()
    });
    let billing = Arc::new(options.billing);
    let collaborators = Collaborators {
        billing: billing.clone(),
        extractor: Arc::new(StubExtractor {
            fail: options.extractor_fails,
        }),
        generator: generator.clone(),
    };
    let settings = ContextSettings {
        webhook_secret: WEBHOOK_SECRET.to_string(),
        quota_mode: options.quota_mode,
        price_id: options.price_id,
        app_base_url: "https://app.test".into(),
    };
    let ctx = AppContext::new(store, collaborators, settings);
    (routes::app(ctx), generator, billing)
}

pub fn signed_webhook(event: &Value) -> Request<Body> {
    let payload = event.to_string();
    let header = signature_header(payload.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp());
    Request::builder()
        .method("POST")
        .uri("/api/stripe/webhook")
        .header("content-type", "application/json")
        .header("stripe-signature", header)
        .body(Body::from(payload))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}
