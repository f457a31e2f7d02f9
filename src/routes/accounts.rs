//! Account and playlist endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{error_response, ApiError};
use crate::db::repository::accounts;
use crate::error::PanelError;
use crate::models::audit::ACTION_UPDATE_ACCOUNT;
use crate::models::{Account, ApiResponse, EntryPatch, EntrySpec, NewAccount, NewLog};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
    pub group_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub pin: Option<String>,
}

/// GET /api/accounts?group_id=
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccountsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = accounts::list(&state.pool, query.group_id)
        .await
        .map_err(|e| error_response(e.into()))?;
    let list = rows
        .into_iter()
        .map(|row| row.into_account())
        .collect::<Result<Vec<Account>, PanelError>>()
        .map_err(error_response)?;

    Ok(Json(ApiResponse::success(list)))
}

/// GET /api/accounts/:id
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .accounts
        .directory()
        .account(id)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(account)))
}

/// POST /api/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewAccount>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate().map_err(error_response)?;

    let account = accounts::insert(&state.pool, &body)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "account")))?
        .into_account()
        .map_err(error_response)?;
    info!("Account {} registered ({})", account.id, account.protocol);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(account).with_message("Account created")),
    ))
}

/// PUT /api/accounts/:id - replace the stored record
///
/// Secrets left out of the body keep their stored values. Any session the
/// account holds is dropped, since it was opened with the old credentials.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<NewAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let current = state
        .accounts
        .directory()
        .account(id)
        .await
        .map_err(error_response)?;
    let replacement = body.over(&current);
    replacement.validate().map_err(error_response)?;

    let account = accounts::update(&state.pool, id, &replacement)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "account")))?
        .ok_or_else(|| error_response(PanelError::NotFound(format!("account {}", id))))?
        .into_account()
        .map_err(error_response)?;

    if let Err(e) = state.accounts.sessions().invalidate(current.protocol, id).await {
        warn!("Could not drop session of account {}: {}", id, e);
    }
    let entry = NewLog::success(id, ACTION_UPDATE_ACCOUNT, format!("account {} updated", account.name));
    if let Err(e) = state.accounts.directory().append_log(entry).await {
        warn!("Audit write failed for account {}: {}", id, e);
    }
    info!("Account {} updated ({})", id, account.protocol);

    Ok(Json(ApiResponse::success(account).with_message("Account updated")))
}

/// DELETE /api/accounts/:id - remove the account, its logs and its session
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let current = state
        .accounts
        .directory()
        .account(id)
        .await
        .map_err(error_response)?;

    let removed = accounts::delete(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?;
    if !removed {
        return Err(error_response(PanelError::NotFound(format!("account {}", id))));
    }

    if let Err(e) = state.accounts.sessions().invalidate(current.protocol, id).await {
        warn!("Could not drop session of account {}: {}", id, e);
    }
    info!("Account {} deleted", id);

    Ok(Json(ApiResponse::success(()).with_message("Account deleted")))
}

/// POST /api/accounts/:id/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.accounts.login(id).await.map_err(error_response)?;
    let message = match &outcome.playlists {
        Some(list) => format!("Logged in, {} playlists synced", list.len()),
        None => "Logged in, playlist sync failed".to_string(),
    };
    Ok(Json(ApiResponse::success(outcome).with_message(message)))
}

/// POST /api/accounts/:id/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.accounts.logout(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(()).with_message("Session removed")))
}

/// GET /api/accounts/:id/playlists - live listing from the panel
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state.accounts.list(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(entries)))
}

/// GET /api/accounts/:id/playlists-snapshot - cached listing, no network
pub async fn playlists_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.accounts.snapshot(id).await.map_err(error_response)?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// POST /api/accounts/:id/playlists
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(spec): Json<EntrySpec>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .accounts
        .create(id, spec)
        .await
        .map_err(error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(entry).with_message("Playlist created")),
    ))
}

/// PUT /api/accounts/:id/playlists/:playlist_id - full replacement
pub async fn update_playlist(
    State(state): State<Arc<AppState>>,
    Path((id, playlist_id)): Path<(i64, String)>,
    Json(spec): Json<EntrySpec>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .accounts
        .update(id, &playlist_id, spec)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(entry).with_message("Playlist updated")))
}

/// PATCH /api/accounts/:id/playlists/:playlist_id - partial edit
pub async fn edit_playlist(
    State(state): State<Arc<AppState>>,
    Path((id, playlist_id)): Path<(i64, String)>,
    Json(patch): Json<EntryPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .accounts
        .edit(id, &playlist_id, patch)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(entry).with_message("Playlist updated")))
}

/// DELETE /api/accounts/:id/playlists/:playlist_id?pin=
pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Path((id, playlist_id)): Path<(i64, String)>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .accounts
        .delete(id, &playlist_id, query.pin)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::success(()).with_message("Playlist deleted")))
}
