//! Migration targets and known panel hosts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{error_response, ApiError};
use crate::db::repository::{accounts, domains, panel_domains};
use crate::error::PanelError;
use crate::models::{ApiResponse, DomainInput, DomainRecord, PanelDomain, PanelDomainInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    pub active: Option<bool>,
}

fn domain_not_found(id: i64) -> ApiError {
    error_response(PanelError::NotFound(format!("domain {}", id)))
}

fn panel_not_found(id: i64) -> ApiError {
    error_response(PanelError::NotFound(format!("panel domain {}", id)))
}

/// GET /api/domains?active=true
pub async fn list_domains(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list: Vec<DomainRecord> = domains::list(&state.pool, query.active.unwrap_or(false))
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(DomainRecord::from)
        .collect();

    Ok(Json(ApiResponse::success(list)))
}

/// GET /api/domains/:id
pub async fn get_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let domain: DomainRecord = domains::find(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| domain_not_found(id))?
        .into();
    Ok(Json(ApiResponse::success(domain)))
}

/// POST /api/domains
pub async fn create_domain(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DomainInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.normalized().map_err(error_response)?;
    let domain: DomainRecord = domains::insert(&state.pool, &input)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "domain")))?
        .into();
    info!("Domain {} registered: {}", domain.id, domain.url);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(domain).with_message("Domain created")),
    ))
}

/// PUT /api/domains/:id
pub async fn update_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<DomainInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.normalized().map_err(error_response)?;
    let domain: DomainRecord = domains::update(&state.pool, id, &input)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "domain")))?
        .ok_or_else(|| domain_not_found(id))?
        .into();
    Ok(Json(ApiResponse::success(domain).with_message("Domain updated")))
}

/// PATCH /api/domains/:id/toggle
pub async fn toggle_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let domain: DomainRecord = domains::toggle(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| domain_not_found(id))?
        .into();
    let message = if domain.active { "Domain enabled" } else { "Domain disabled" };
    Ok(Json(ApiResponse::success(domain).with_message(message)))
}

/// DELETE /api/domains/:id
pub async fn delete_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = domains::delete(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?;
    if !removed {
        return Err(domain_not_found(id));
    }
    info!("Domain {} deleted", id);

    Ok(Json(ApiResponse::success(()).with_message("Domain deleted")))
}

/// GET /api/panel-domains?active=true
pub async fn list_panel_domains(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list: Vec<PanelDomain> = panel_domains::list(&state.pool, query.active.unwrap_or(false))
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(PanelDomain::from)
        .collect();

    Ok(Json(ApiResponse::success(list)))
}

/// POST /api/panel-domains
pub async fn create_panel_domain(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PanelDomainInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.normalized().map_err(error_response)?;
    let panel: PanelDomain = panel_domains::insert(&state.pool, &input)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "panel domain")))?
        .into();
    info!("Panel domain {} registered: {}", panel.id, panel.domain);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(panel).with_message("Panel domain created")),
    ))
}

/// PUT /api/panel-domains/:id
pub async fn update_panel_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<PanelDomainInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.normalized().map_err(error_response)?;
    let panel: PanelDomain = panel_domains::update(&state.pool, id, &input)
        .await
        .map_err(|e| error_response(PanelError::from_write(e, "panel domain")))?
        .ok_or_else(|| panel_not_found(id))?
        .into();
    Ok(Json(ApiResponse::success(panel).with_message("Panel domain updated")))
}

/// PATCH /api/panel-domains/:id/toggle
pub async fn toggle_panel_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let panel: PanelDomain = panel_domains::toggle(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| panel_not_found(id))?
        .into();
    let message = if panel.active { "Panel domain enabled" } else { "Panel domain disabled" };
    Ok(Json(ApiResponse::success(panel).with_message(message)))
}

/// DELETE /api/panel-domains/:id - refused while accounts point at the host
pub async fn delete_panel_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let panel: PanelDomain = panel_domains::find(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| panel_not_found(id))?
        .into();

    let in_use = accounts::count_with_domain(&state.pool, &panel.domain)
        .await
        .map_err(|e| error_response(e.into()))?;
    if in_use > 0 {
        return Err(error_response(PanelError::Usage(format!(
            "{} accounts still use {}",
            in_use, panel.domain
        ))));
    }

    panel_domains::delete(&state.pool, id)
        .await
        .map_err(|e| error_response(e.into()))?;
    info!("Panel domain {} deleted", id);

    Ok(Json(ApiResponse::success(()).with_message("Panel domain deleted")))
}
