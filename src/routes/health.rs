use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::db;
use crate::models::Protocol;
use crate::AppState;

/// Root endpoint - basic status
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Playlist Panel Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "protocols": Protocol::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>()
    }))
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    uptime: u64,
    postgres: bool,
    redis: bool,
    sessions: usize,
}

/// GET /health - Advanced health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    let postgres_ok = db::health_check(&state.pool).await;
    let redis_ok = state.redis.ping().await.unwrap_or(false);

    // Session count doubles as a store round-trip
    let sessions = if redis_ok {
        state
            .accounts
            .sessions()
            .list_all()
            .await
            .map(|s| s.len())
            .unwrap_or(0)
    } else {
        0
    };

    // Panel calls need both the account records and the stored sessions
    let status = if postgres_ok && redis_ok {
        "ok"
    } else if postgres_ok {
        "degraded"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime,
        postgres: postgres_ok,
        redis: redis_ok,
        sessions,
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"Internal Server Error".to_vec(),
            )
        }
    }
}

/// Readiness check (for Kubernetes)
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let postgres_ok = db::health_check(&state.pool).await;
    let redis_ok = state.redis.ping().await.unwrap_or(false);

    if postgres_ok && redis_ok {
        (StatusCode::OK, "ready")
    } else if postgres_ok {
        // Account records readable, panel calls will fail without sessions
        (StatusCode::OK, "ready (redis degraded)")
    } else if redis_ok {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready - postgres unavailable")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready - postgres and redis unavailable")
    }
}

/// Liveness check (for Kubernetes)
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}
