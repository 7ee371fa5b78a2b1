use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// key: billing-api -> hosted checkout for the pro plan
pub async fn create_checkout(
    Extension(ctx): Extension<AppContext>,
) -> AppResult<Json<CheckoutResponse>> {
    let price_id = ctx
        .checkout
        .price_id
        .as_deref()
        .ok_or_else(|| AppError::Message("STRIPE_PRICE_ID is not configured".into()))?;
    let base = ctx.checkout.app_base_url.trim_end_matches('/');
    let success_url = format!("{base}/success?session_id={{CHECKOUT_SESSION_ID}}");
    let cancel_url = format!("{base}/");

    let session = ctx
        .billing
        .create_checkout_session(price_id, &success_url, &cancel_url)
        .await?;
    let url = session
        .url
        .ok_or_else(|| AppError::BadGateway(format!("checkout session {} has no url", session.id)))?;
    tracing::info!(session_id = %session.id, "checkout session created");
    Ok(Json(CheckoutResponse { url }))
}
