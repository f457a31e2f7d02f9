//! Stored settings, behind the admin key

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::{error_response, validate_admin_key, AdminQuery, ApiError};
use crate::db::repository::configs;
use crate::error::PanelError;
use crate::models::{ApiResponse, CaptchaKeyInput, CaptchaKeyStatus, ConfigEntry, ConfigInput};
use crate::services::directory::CAPTCHA_KEY_SETTING;
use crate::AppState;

fn config_not_found(key: &str) -> ApiError {
    error_response(PanelError::NotFound(format!("setting '{}'", key)))
}

/// GET /api/config?key=
pub async fn list_config(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let list: Vec<ConfigEntry> = configs::list(&state.pool)
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(ConfigEntry::from)
        .collect();

    Ok(Json(ApiResponse::success(list)))
}

/// GET /api/config/:name?key=
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<AdminQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let entry: ConfigEntry = configs::find(&state.pool, &name)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| config_not_found(&name))?
        .into();
    Ok(Json(ApiResponse::success(entry)))
}

/// POST /api/config?key= - key taken from the body
pub async fn create_config(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
    Json(body): Json<ConfigInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let name = body.key_or(None).map_err(error_response)?;
    let entry: ConfigEntry = configs::set(
        &state.pool,
        &name,
        body.value.as_deref().unwrap_or_default(),
        body.description.as_deref(),
    )
    .await
    .map_err(|e| error_response(e.into()))?
    .into();
    info!("Setting '{}' saved", name);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(entry).with_message("Setting saved")),
    ))
}

/// PUT /api/config/:name?key=
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<AdminQuery>,
    Json(body): Json<ConfigInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let name = body.key_or(Some(name.as_str())).map_err(error_response)?;
    let entry: ConfigEntry = configs::set(
        &state.pool,
        &name,
        body.value.as_deref().unwrap_or_default(),
        body.description.as_deref(),
    )
    .await
    .map_err(|e| error_response(e.into()))?
    .into();
    info!("Setting '{}' updated", name);

    Ok(Json(ApiResponse::success(entry).with_message("Setting updated")))
}

/// DELETE /api/config/:name?key=
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<AdminQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let removed = configs::delete(&state.pool, &name)
        .await
        .map_err(|e| error_response(e.into()))?;
    if !removed {
        return Err(config_not_found(&name));
    }
    info!("Setting '{}' deleted", name);

    Ok(Json(ApiResponse::success(()).with_message("Setting deleted")))
}

/// GET /api/config/2captcha/key?key=
pub async fn get_captcha_key(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let stored = configs::get(&state.pool, CAPTCHA_KEY_SETTING)
        .await
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(ApiResponse::success(CaptchaKeyStatus::new(stored))))
}

/// POST /api/config/2captcha/key?key= - replaces the solver key used by
/// cookie_captcha logins from the next login on
pub async fn set_captcha_key(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
    Json(body): Json<CaptchaKeyInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_admin_key(&state, query.key.as_deref())?;

    let api_key = body.normalized().map_err(error_response)?;
    configs::set(&state.pool, CAPTCHA_KEY_SETTING, &api_key, None)
        .await
        .map_err(|e| error_response(e.into()))?;
    info!("CAPTCHA solver key updated");

    Ok(Json(
        ApiResponse::success(CaptchaKeyStatus::new(Some(api_key))).with_message("API key saved"),
    ))
}
