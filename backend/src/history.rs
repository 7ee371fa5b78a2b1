use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::db::{UsageRecord, DEFAULT_HISTORY_LIMIT};
use crate::error::{AppError, AppResult};
use crate::generation::normalize_identity;

const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<UsageRecord>,
}

/// key: history-api -> pro-only generation history
///
/// The store does not gate history by plan; this handler does.
pub async fn list_history(
    Extension(ctx): Extension<AppContext>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<HistoryResponse>> {
    let user_id = normalize_identity(query.user_id)
        .ok_or_else(|| AppError::Validation("User ID required".into()))?;

    let is_pro = ctx
        .store
        .get_user_by_id(&user_id)
        .await?
        .map(|user| user.is_pro())
        .unwrap_or(false);
    if !is_pro {
        return Err(AppError::UpgradeRequired("History is a Pro feature.".into()));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let history = ctx.store.get_history(&user_id, limit).await?;
    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}
