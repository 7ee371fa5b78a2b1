use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::billing::{BillingProviderError, SignatureError};
use crate::content::{FetchError, GenerationError};
use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("webhook signature rejected: {0}")]
    Signature(#[from] SignatureError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("billing provider error: {0}")]
    Billing(#[from] BillingProviderError),
    /// Rejected input; the message is shown to the caller.
    #[error("{0}")]
    Validation(String),
    /// Paid plan needed; callers route this to an upgrade prompt.
    #[error("{0}")]
    UpgradeRequired(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("{0}")]
    Message(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::UpgradeRequired(message) => {
                tracing::info!(reason = %message, "upgrade required");
                let body = json!({ "error": message, "upgradeRequired": true });
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            AppError::Signature(SignatureError::MissingHeader) => {
                (StatusCode::BAD_REQUEST, "Missing signature".to_string())
            }
            AppError::Signature(SignatureError::Payload(_)) => (
                StatusCode::BAD_REQUEST,
                "Unrecognized event payload".to_string(),
            ),
            AppError::Signature(_) => (StatusCode::BAD_REQUEST, "Invalid signature".to_string()),
            AppError::Fetch(_) => (
                StatusCode::BAD_GATEWAY,
                "Failed to extract content from URL".to_string(),
            ),
            AppError::Generation(_) => (
                StatusCode::BAD_GATEWAY,
                "Failed to generate content".to_string(),
            ),
            AppError::Billing(_) | AppError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                "Billing provider unavailable".to_string(),
            ),
            AppError::Storage(_) | AppError::Message(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        if status.is_server_error() {
            tracing::error!(?self);
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
