use hmac::{Hmac, Mac};
use sha2::Sha256;
use stripe::{Webhook, WebhookError};
use thiserror::Error;

use super::models::BillingEvent;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("no signature in header matches the payload")]
    Mismatch,
    #[error("signature timestamp {0} is outside the tolerance window")]
    Expired(i64),
    /// Authentic delivery whose body is not a billing event we can read.
    #[error("signed payload is not a billing event: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<WebhookError> for SignatureError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::BadSignature => SignatureError::Mismatch,
            WebhookError::BadTimestamp(timestamp) => SignatureError::Expired(timestamp),
            WebhookError::BadParse(err) => SignatureError::Payload(err),
            _ => SignatureError::MalformedHeader,
        }
    }
}

/// key: billing-webhook-signature -> `t=<unix>,v1=<hex>` scheme
///
/// Authenticity and the 300 second tolerance are checked by the Stripe SDK. The
/// body is then read into [`BillingEvent`], which only needs the fields
/// reconciliation uses, so a full SDK decode failure does not reject the event.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<BillingEvent, SignatureError> {
        let body = std::str::from_utf8(payload).map_err(|_| SignatureError::MalformedHeader)?;
        match Webhook::construct_event(body, header, &self.secret) {
            Ok(_) | Err(WebhookError::BadParse(_)) => {}
            Err(err) => return Err(err.into()),
        }
        Ok(BillingEvent::from_slice(payload)?)
    }
}

/// Builds a header value the verifier accepts; used by tests and local tooling.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can use any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}
