//! HTTP handlers
//!
//! Handlers return `Result<impl IntoResponse, ApiError>`; every
//! [`PanelError`] maps to one status code in [`error_response`].

pub mod accounts;
pub mod config;
pub mod domains;
pub mod groups;
pub mod health;
pub mod logs;
pub mod migration;
pub mod sessions;

use axum::{http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::error::PanelError;
use crate::AppState;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

/// Query params for admin operations
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Admin key for authorization (simple protection)
    pub key: Option<String>,
}

/// Validate admin key
pub fn validate_admin_key(state: &AppState, provided_key: Option<&str>) -> Result<(), ApiError> {
    match provided_key {
        Some(key) if !state.config.admin_key.is_empty() && key == state.config.admin_key => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Invalid or missing admin key" })),
        )),
    }
}

pub fn status_for(e: &PanelError) -> StatusCode {
    match e {
        PanelError::Auth(_) | PanelError::NoSession { .. } | PanelError::SessionExpired => {
            StatusCode::UNAUTHORIZED
        }
        PanelError::Challenge(_) | PanelError::Transport(_) => StatusCode::BAD_GATEWAY,
        PanelError::RemoteRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PanelError::InvalidUrl(_) | PanelError::Usage(_) => StatusCode::BAD_REQUEST,
        PanelError::NotFound(_) => StatusCode::NOT_FOUND,
        PanelError::ProtocolMismatch { .. } | PanelError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Map a service error to the API error envelope
pub fn error_response(e: PanelError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }

    let mut body = json!({ "success": false, "error": e.to_string() });
    if matches!(e, PanelError::NoSession { .. } | PanelError::SessionExpired) {
        body["needsLogin"] = json!(true);
    }
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Protocol;

    #[test]
    fn test_status_mapping() {
        let no_session = PanelError::NoSession {
            protocol: Protocol::BearerSigned,
            account_id: 3,
        };
        let (status, Json(body)) = error_response(no_session);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["needsLogin"], true);
        assert_eq!(body["success"], false);

        let (status, Json(body)) = error_response(PanelError::rejected("Duplicate"));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.get("needsLogin").is_none());

        assert_eq!(status_for(&PanelError::Challenge("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&PanelError::InvalidUrl("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&PanelError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&PanelError::Storage("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
