use std::sync::Arc;

use tracing::{info, warn};

use super::adapters::BillingProviderAdapter;
use super::models::{BillingEvent, CheckoutCompleted, SubscriptionChange};
use crate::db::{NewUser, Plan, RecordStore, StoreResult, User};

/// Stored when neither the event nor the provider knows the customer's e-mail.
pub const PLACEHOLDER_EMAIL: &str = "unknown@example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A checkout created or refreshed a paid user.
    Activated(User),
    PlanChanged(User),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotSubscriptionCheckout,
    UnknownCustomer(String),
    UnhandledEventType(String),
}

/// key: billing-reconciliation -> plan state from provider callbacks
///
/// Deliveries may repeat or arrive out of order; every transition writes the
/// full target state so replays converge. Only a subscription checkout may
/// create a user.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn BillingProviderAdapter>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn BillingProviderAdapter>) -> Self {
        Self { store, provider }
    }

    pub async fn reconcile(&self, event: &BillingEvent) -> StoreResult<ReconcileOutcome> {
        match event {
            BillingEvent::CheckoutCompleted(checkout) => self.checkout_completed(checkout).await,
            BillingEvent::SubscriptionUpdated(change) => {
                let active = change.is_active();
                let plan = if active { Plan::Pro } else { Plan::Free };
                let subscription_ref = active.then(|| change.subscription_id.clone());
                self.apply_plan(change, plan, subscription_ref).await
            }
            BillingEvent::SubscriptionDeleted(change) => {
                self.apply_plan(change, Plan::Free, None).await
            }
            BillingEvent::Other {
                event_id,
                event_type,
            } => {
                info!(%event_id, %event_type, "ignoring unhandled billing event");
                Ok(ReconcileOutcome::Ignored(IgnoreReason::UnhandledEventType(
                    event_type.clone(),
                )))
            }
        }
    }

    async fn checkout_completed(
        &self,
        checkout: &CheckoutCompleted,
    ) -> StoreResult<ReconcileOutcome> {
        let (Some(customer_id), Some(subscription_id), true) = (
            checkout.customer_id.as_deref(),
            checkout.subscription_id.as_deref(),
            checkout.is_subscription(),
        ) else {
            info!(
                event_id = %checkout.event_id,
                mode = ?checkout.mode,
                "checkout completed without a subscription; nothing to reconcile"
            );
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::NotSubscriptionCheckout));
        };

        let email = match checkout.customer_email.clone() {
            Some(email) => email,
            None => self.lookup_email(customer_id).await,
        };

        let user = self
            .store
            .upsert_user(NewUser {
                id: customer_id.to_string(),
                email,
                plan: Plan::Pro,
                subscription_ref: Some(subscription_id.to_string()),
                created_at: None,
            })
            .await?;
        info!(
            event_id = %checkout.event_id,
            customer_id = %user.id,
            subscription = %subscription_id,
            "pro subscription activated"
        );
        Ok(ReconcileOutcome::Activated(user))
    }

    async fn lookup_email(&self, customer_id: &str) -> String {
        match self.provider.customer_email(customer_id).await {
            Ok(Some(email)) => email,
            Ok(None) => PLACEHOLDER_EMAIL.to_string(),
            Err(err) => {
                warn!(
                    ?err,
                    %customer_id,
                    "failed to look up customer e-mail; storing placeholder"
                );
                PLACEHOLDER_EMAIL.to_string()
            }
        }
    }

    async fn apply_plan(
        &self,
        change: &SubscriptionChange,
        plan: Plan,
        subscription_ref: Option<String>,
    ) -> StoreResult<ReconcileOutcome> {
        let Some(existing) = self.store.get_user_by_id(&change.customer_id).await? else {
            info!(
                event_id = %change.event_id,
                customer_id = %change.customer_id,
                "subscription event for unknown customer ignored"
            );
            return Ok(ReconcileOutcome::Ignored(IgnoreReason::UnknownCustomer(
                change.customer_id.clone(),
            )));
        };

        let user = self
            .store
            .upsert_user(NewUser {
                plan,
                subscription_ref,
                ..NewUser::from(existing)
            })
            .await?;
        info!(
            event_id = %change.event_id,
            customer_id = %user.id,
            status = %change.status,
            plan = %user.plan,
            "subscription state reconciled"
        );
        Ok(ReconcileOutcome::PlanChanged(user))
    }
}
