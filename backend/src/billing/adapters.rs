use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionPaymentMethodTypes, Customer, CustomerId, StripeError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingProviderError {
    #[error("billing provider request failed: {0}")]
    Stripe(#[source] StripeError),
    #[error("billing provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid billing provider id `{0}`")]
    InvalidId(String),
    #[error("billing provider is not configured: {0}")]
    NotConfigured(&'static str),
}

impl From<StripeError> for BillingProviderError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::Stripe(request) => BillingProviderError::Status {
                status: request.http_status,
                body: request.message.unwrap_or_default(),
            },
            other => BillingProviderError::Stripe(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// key: billing-adapter -> provider integration
#[async_trait]
pub trait BillingProviderAdapter: Send + Sync {
    /// Opens a hosted checkout for a single recurring price.
    async fn create_checkout_session(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingProviderError>;

    /// E-mail on the provider's customer record, if it has one.
    async fn customer_email(&self, customer_id: &str)
        -> Result<Option<String>, BillingProviderError>;
}

/// key: billing-adapter-stripe -> REST client
#[derive(Clone)]
pub struct StripeAdapter {
    client: Option<stripe::Client>,
}

impl StripeAdapter {
    /// Without a secret key every call fails with `NotConfigured`.
    pub fn new(api_base: &str, secret_key: Option<String>) -> Self {
        Self {
            client: secret_key.map(|key| stripe::Client::from_url(api_base, key)),
        }
    }

    fn client(&self) -> Result<&stripe::Client, BillingProviderError> {
        self.client
            .as_ref()
            .ok_or(BillingProviderError::NotConfigured("STRIPE_SECRET_KEY"))
    }
}

#[async_trait]
impl BillingProviderAdapter for StripeAdapter {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingProviderError> {
        let client = self.client()?;
        let params = CreateCheckoutSession {
            mode: Some(CheckoutSessionMode::Subscription),
            payment_method_types: Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price: Some(price_id.to_string()),
                quantity: Some(1),
                ..Default::default()
            }]),
            success_url: Some(success_url),
            cancel_url: Some(cancel_url),
            metadata: Some(HashMap::from([("plan".to_string(), "pro".to_string())])),
            ..Default::default()
        };
        let session = stripe::CheckoutSession::create(client, params).await?;
        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn customer_email(
        &self,
        customer_id: &str,
    ) -> Result<Option<String>, BillingProviderError> {
        let client = self.client()?;
        let id = CustomerId::from_str(customer_id)
            .map_err(|_| BillingProviderError::InvalidId(customer_id.to_string()))?;
        let customer = Customer::retrieve(client, &id, &[]).await?;
        Ok(customer.email.filter(|email| !email.trim().is_empty()))
    }
}
