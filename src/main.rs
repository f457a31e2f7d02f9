mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{create_pool, run_migrations, PgDirectory};
use crate::services::{
    accounts::AccountService,
    captcha::{CaptchaPipeline, TwoCaptchaSolver},
    migration::{FixedPause, MigrationOrchestrator},
    redis::RedisService,
    session_store::SessionStore,
    sites::{build_client, SiteRegistry},
};
use sqlx::PgPool;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub redis: RedisService,
    pub accounts: Arc<AccountService>,
    pub migration: MigrationOrchestrator,
    pub start_time: Instant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playlist_panel_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting Playlist Panel Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.node_env);

    // Initialize PostgreSQL connection pool
    let pool = create_pool(&config).await?;
    tracing::info!("PostgreSQL connected");

    // Run database migrations
    run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Sessions live in Redis, one key per account
    let redis = RedisService::new(&config.redis_url).await?;
    tracing::info!("Redis connected: {}", config.redis_url);
    let sessions = SessionStore::new(Arc::new(redis.clone()));

    // CAPTCHA solver and pipeline for cookie_captcha panels
    let solver_http = build_client(config.http_timeout(), &config.user_agent, true)?;
    let solver = Arc::new(TwoCaptchaSolver::new(
        solver_http,
        &config.captcha_api_base,
        &config.captcha_api_key,
    ));
    let pipeline = Arc::new(CaptchaPipeline::new(
        solver.clone(),
        config.captcha_poll_interval(),
        config.captcha_max_attempts,
    ));
    if config.captcha_api_key.is_empty() {
        tracing::warn!("CAPTCHA_API_KEY not set, cookie_captcha logins need the captcha_api_key setting");
    }

    // One adapter per panel protocol
    let sites = Arc::new(SiteRegistry::from_config(&config, pipeline)?);
    tracing::info!("Panel adapters initialized");

    let directory = Arc::new(PgDirectory::new(pool.clone()));
    let accounts = Arc::new(
        AccountService::new(sites, sessions, directory).with_captcha_solver(solver),
    );
    let migration = MigrationOrchestrator::new(
        accounts.clone(),
        Arc::new(FixedPause(config.bulk_pause())),
    );
    tracing::info!(
        "Bulk migration pacing: {} ms between updates",
        config.bulk_pause_ms
    );

    // Build application state
    let state = Arc::new(AppState {
        config,
        pool,
        redis,
        accounts,
        migration,
        start_time: Instant::now(),
    });

    // Build router
    let app = Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/ready", get(routes::health::ready))
        .route("/live", get(routes::health::live))
        // Accounts
        .route(
            "/api/accounts",
            get(routes::accounts::list_accounts).post(routes::accounts::create_account),
        )
        .route(
            "/api/accounts/:id",
            get(routes::accounts::get_account)
                .put(routes::accounts::update_account)
                .delete(routes::accounts::delete_account),
        )
        .route("/api/accounts/:id/login", post(routes::accounts::login))
        .route("/api/accounts/:id/logout", post(routes::accounts::logout))
        // Playlists on the remote panel
        .route(
            "/api/accounts/:id/playlists",
            get(routes::accounts::list_playlists).post(routes::accounts::create_playlist),
        )
        .route(
            "/api/accounts/:id/playlists-snapshot",
            get(routes::accounts::playlists_snapshot),
        )
        .route(
            "/api/accounts/:id/playlists/:playlist_id",
            put(routes::accounts::update_playlist)
                .patch(routes::accounts::edit_playlist)
                .delete(routes::accounts::delete_playlist),
        )
        // Operator views
        .route("/api/sessions", get(routes::sessions::list_sessions))
        .route("/api/logs", get(routes::logs::list_logs))
        // Groups
        .route(
            "/api/groups",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route(
            "/api/groups/:id",
            get(routes::groups::get_group)
                .put(routes::groups::update_group)
                .delete(routes::groups::delete_group),
        )
        // Migration targets and panel hosts
        .route(
            "/api/domains",
            get(routes::domains::list_domains).post(routes::domains::create_domain),
        )
        .route(
            "/api/domains/:id",
            get(routes::domains::get_domain)
                .put(routes::domains::update_domain)
                .delete(routes::domains::delete_domain),
        )
        .route("/api/domains/:id/toggle", patch(routes::domains::toggle_domain))
        .route(
            "/api/panel-domains",
            get(routes::domains::list_panel_domains).post(routes::domains::create_panel_domain),
        )
        .route(
            "/api/panel-domains/:id",
            put(routes::domains::update_panel_domain).delete(routes::domains::delete_panel_domain),
        )
        .route(
            "/api/panel-domains/:id/toggle",
            patch(routes::domains::toggle_panel_domain),
        )
        // Settings
        .route(
            "/api/config",
            get(routes::config::list_config).post(routes::config::create_config),
        )
        .route(
            "/api/config/2captcha/key",
            get(routes::config::get_captcha_key).post(routes::config::set_captcha_key),
        )
        .route(
            "/api/config/:name",
            get(routes::config::get_config)
                .put(routes::config::update_config)
                .delete(routes::config::delete_config),
        )
        // Domain migration
        .route("/api/domains/preview", post(routes::migration::preview_url))
        .route("/api/bulk/preview", post(routes::migration::bulk_preview))
        .route("/api/bulk/execute", post(routes::migration::bulk_execute))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
