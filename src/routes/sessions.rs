//! Operator view of stored panel sessions

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use super::{error_response, ApiError};
use crate::models::{ApiResponse, SessionSummary};
use crate::AppState;

/// GET /api/sessions - every stored session, secrets redacted
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions: Vec<SessionSummary> = state
        .accounts
        .sessions()
        .list_all()
        .await
        .map_err(error_response)?
        .iter()
        .map(|s| s.summary())
        .collect();

    Ok(Json(ApiResponse::success(sessions)))
}
