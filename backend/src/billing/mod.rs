pub mod adapters;
pub mod api;
pub mod entitlement;
pub mod models;
pub mod reconciliation;
pub mod signature;
pub mod usage;

pub use adapters::{BillingProviderAdapter, BillingProviderError, CheckoutSession, StripeAdapter};
pub use api::{create_checkout as billing_create_checkout, CheckoutResponse};
pub use entitlement::{EntitlementDecision, EntitlementEngine, FREE_LIMIT, QUOTA_EXCEEDED_REASON};
pub use models::{BillingEvent, CheckoutCompleted, SubscriptionChange};
pub use reconciliation::{IgnoreReason, ReconcileOutcome, Reconciler, PLACEHOLDER_EMAIL};
pub use signature::{signature_header, SignatureError, WebhookVerifier};
pub use usage::{QuotaMode, Recorded, UsageEntry, UsageRecorder};
