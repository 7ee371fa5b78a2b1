use axum::{
    body::Bytes,
    extract::Extension,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::billing::SignatureError;
use crate::context::AppContext;
use crate::error::AppResult;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// key: webhooks-billing -> verified provider callbacks
///
/// A rejected signature aborts before any state is touched. Event types the
/// reconciler does not handle are acknowledged.
pub async fn stripe_webhook(
    Extension(ctx): Extension<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(SignatureError::MissingHeader)?;
    let event = ctx.verifier.verify(&body, signature)?;
    tracing::debug!(event_type = event.event_type(), "billing webhook verified");

    let outcome = ctx.reconciler.reconcile(&event).await?;
    tracing::debug!(?outcome, "billing webhook reconciled");
    Ok(Json(json!({ "received": true })))
}
