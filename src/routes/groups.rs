//! Account groups

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::{error_response, ApiError};
use crate::db::repository::groups;
use crate::error::PanelError;
use crate::models::{ApiResponse, Group, GroupInput};
use crate::AppState;

async fn find_group(state: &AppState, id: i64) -> Result<Group, ApiError> {
    groups::find(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?
        .map(Group::from)
        .ok_or_else(|| error_response(PanelError::NotFound(format!("group {}", id))))
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let list: Vec<Group> = groups::list(&state.pool)
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(Group::from)
        .collect();

    Ok(Json(ApiResponse::success(list)))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let group = find_group(&state, id).await?;
    Ok(Json(ApiResponse::success(group)))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GroupInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.normalized().map_err(error_response)?;
    let group: Group = groups::insert(&state.pool, &input)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "group")))?
        .into();
    info!("Group {} created: {}", group.id, group.name);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(group).with_message("Group created")),
    ))
}

/// PUT /api/groups/:id
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<GroupInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.normalized().map_err(error_response)?;
    let updated = groups::update(&state.pool, id, &input)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "group")))?;
    if !updated {
        return Err(error_response(PanelError::NotFound(format!("group {}", id))));
    }

    let group = find_group(&state, id).await?;
    Ok(Json(ApiResponse::success(group).with_message("Group updated")))
}

/// DELETE /api/groups/:id - only empty groups can be removed
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let group = find_group(&state, id).await?;
    if group.account_count > 0 {
        return Err(error_response(PanelError::Usage(format!(
            "group '{}' still has {} accounts",
            group.name, group.account_count
        ))));
    }

    groups::delete(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?;
    info!("Group {} deleted", id);

    Ok(Json(ApiResponse::success(()).with_message("Group deleted")))
}
