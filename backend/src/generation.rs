use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::billing::{Recorded, UsageEntry, QUOTA_EXCEEDED_REASON};
use crate::content::{GeneratedContent, DEFAULT_TONE};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub content: GeneratedContent,
    /// Free generations left after this one; `null` for pro accounts.
    pub remaining_free: Option<i64>,
}

/// Blank ids are anonymous callers.
pub fn normalize_identity(user_id: Option<String>) -> Option<String> {
    user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

pub fn parse_subject_url(raw: Option<&str>) -> AppResult<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::Validation("URL is required".into()))?;
    let url = Url::parse(raw).map_err(|_| AppError::Validation("Invalid URL format".into()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation("Invalid URL format".into()));
    }
    Ok(url)
}

/// key: generation-api -> check quota, extract, generate, record
pub async fn generate(
    Extension(ctx): Extension<AppContext>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let url = parse_subject_url(request.url.as_deref())?;
    let identity = normalize_identity(request.user_id);
    let tone = request
        .tone
        .map(|tone| tone.trim().to_string())
        .filter(|tone| !tone.is_empty());

    let decision = ctx.entitlements.can_generate(identity.as_deref()).await?;
    if !decision.allowed {
        return Err(AppError::UpgradeRequired(
            decision
                .reason
                .unwrap_or_else(|| QUOTA_EXCEEDED_REASON.to_string()),
        ));
    }

    let is_pro = match identity.as_deref() {
        Some(user_id) => ctx
            .store
            .get_user_by_id(user_id)
            .await?
            .map(|user| user.is_pro())
            .unwrap_or(false),
        None => false,
    };

    let text = ctx.extractor.extract(&url).await?;
    let content = ctx
        .generator
        .generate(&text, tone.as_deref().unwrap_or(DEFAULT_TONE), is_pro)
        .await?;

    let snapshot = serde_json::to_string(&content)
        .map_err(|err| AppError::Message(format!("failed to serialize content: {err}")))?;
    let recorded = ctx
        .recorder
        .record(UsageEntry {
            identity: identity.clone(),
            subject_url: url.to_string(),
            payload_snapshot: Some(snapshot),
            tone_label: tone,
            is_pro,
        })
        .await?;
    if recorded == Recorded::QuotaExhausted {
        return Err(AppError::UpgradeRequired(QUOTA_EXCEEDED_REASON.to_string()));
    }

    let remaining_free = if is_pro {
        None
    } else {
        Some((decision.remaining_free.unwrap_or(0) - 1).max(0))
    };
    Ok(Json(GenerateResponse {
        success: true,
        content,
        remaining_free,
    }))
}
