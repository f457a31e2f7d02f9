//! Audit log listing

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{error_response, ApiError};
use crate::db::repository::logs;
use crate::models::{ApiResponse, LogRecord};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub account_id: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/logs?account_id=&limit=
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let records: Vec<LogRecord> = logs::list(&state.pool, query.account_id, limit)
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(LogRecord::from)
        .collect();

    Ok(Json(ApiResponse::success(records)))
}
