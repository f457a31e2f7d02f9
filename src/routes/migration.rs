//! Domain migration endpoints

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{error_response, validate_admin_key, AdminQuery, ApiError};
use crate::models::ApiResponse;
use crate::services::migration::ExecuteOptions;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPreviewRequest {
    pub original_url: String,
    pub domain_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub group_id: i64,
    pub domain_id: i64,
    pub auto_login: Option<bool>,
}

/// POST /api/domains/preview - substituted URL for one entry
pub async fn preview_url(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UrlPreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let preview = state
        .migration
        .preview(&body.original_url, body.domain_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(preview)))
}

/// POST /api/bulk/preview - session analysis of a group, no panel calls
pub async fn bulk_preview(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let preview = state
        .migration
        .preview_bulk(body.group_id, body.domain_id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(preview)))
}

/// POST /api/bulk/execute?key= - rewrite every eligible playlist of a group
pub async fn bulk_execute(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
    Json(body): Json<BulkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let options = ExecuteOptions {
        auto_login: body.auto_login.unwrap_or(true),
    };
    info!(
        "Bulk migration requested: group {} -> domain {} (auto-login {})",
        body.group_id, body.domain_id, options.auto_login
    );

    let report = state
        .migration
        .execute(body.group_id, body.domain_id, options)
        .await
        .map_err(error_response)?;
    let message = format!(
        "{} of {} accounts migrated, {} failed",
        report.successes, report.total, report.errors
    );
    Ok(Json(ApiResponse::success(report).with_message(message)))
}
