use serde::Deserialize;
use serde_json::Value;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// key: billing-event -> provider lifecycle callbacks decoded at the boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionUpdated(SubscriptionChange),
    SubscriptionDeleted(SubscriptionChange),
    Other { event_id: String, event_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCompleted {
    pub event_id: String,
    pub mode: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_email: Option<String>,
}

impl CheckoutCompleted {
    pub fn is_subscription(&self) -> bool {
        self.mode.as_deref() == Some("subscription")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub event_id: String,
    pub subscription_id: String,
    pub customer_id: String,
    pub status: String,
}

impl SubscriptionChange {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

impl BillingEvent {
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted(_) => CHECKOUT_COMPLETED,
            BillingEvent::SubscriptionUpdated(_) => SUBSCRIPTION_UPDATED,
            BillingEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            BillingEvent::Other { event_type, .. } => event_type,
        }
    }

    /// Decodes a provider event body. Unknown event types become `Other` without
    /// inspecting their payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEvent = serde_json::from_slice(payload)?;
        let event = match raw.event_type.as_str() {
            CHECKOUT_COMPLETED => {
                let session: RawCheckoutSession = serde_json::from_value(raw.data.object)?;
                let customer_email = session
                    .customer_details
                    .and_then(|details| details.email)
                    .or(session.customer_email)
                    .filter(|email| !email.trim().is_empty());
                BillingEvent::CheckoutCompleted(CheckoutCompleted {
                    event_id: raw.id,
                    mode: session.mode,
                    customer_id: session.customer.map(Expandable::into_id),
                    subscription_id: session.subscription.map(Expandable::into_id),
                    customer_email,
                })
            }
            SUBSCRIPTION_UPDATED | SUBSCRIPTION_DELETED => {
                let subscription: RawSubscription = serde_json::from_value(raw.data.object)?;
                let change = SubscriptionChange {
                    event_id: raw.id,
                    subscription_id: subscription.id,
                    customer_id: subscription.customer.into_id(),
                    status: subscription.status,
                };
                if raw.event_type == SUBSCRIPTION_UPDATED {
                    BillingEvent::SubscriptionUpdated(change)
                } else {
                    BillingEvent::SubscriptionDeleted(change)
                }
            }
            _ => BillingEvent::Other {
                event_id: raw.id,
                event_type: raw.event_type,
            },
        };
        Ok(event)
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: Value,
}

/// Provider references arrive either as a bare id or as an expanded object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    fn into_id(self) -> String {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Deserialize)]
struct RawCheckoutSession {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    customer: Option<Expandable>,
    #[serde(default)]
    subscription: Option<Expandable>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<RawCustomerDetails>,
}

#[derive(Deserialize)]
struct RawCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct RawSubscription {
    id: String,
    customer: Expandable,
    status: String,
}
