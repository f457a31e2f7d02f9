use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub node_env: String,
    pub admin_key: String,

    // Redis (session store)
    pub redis_url: String,

    // PostgreSQL
    pub database_url: String,
    pub db_max_connections: u32,

    // Outbound HTTP
    pub http_timeout_ms: u64,
    pub user_agent: String,

    // Panels
    pub captcha_panel_scheme: String,
    pub bearer_api_base: String,
    pub bearer_origin: String,
    pub scraped_base: String,

    // CAPTCHA solver
    pub captcha_api_base: String,
    pub captcha_api_key: String,
    pub captcha_poll_interval_ms: u64,
    pub captcha_max_attempts: u32,

    // Bulk migration
    pub bulk_pause_ms: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env::var("PORT")
                .unwrap_or_else(|_| "3002".to_string())
                .parse()
                .unwrap_or(3002),
            node_env: env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string()),
            admin_key: env::var("ADMIN_KEY").unwrap_or_else(|_| "admin123".to_string()),

            // Redis
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            // PostgreSQL
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/playlist_panel".to_string()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Outbound HTTP
            http_timeout_ms: env::var("HTTP_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .unwrap_or(30_000), // 30 seconds

            // Panels reject obvious bot agents
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
            }),

            captcha_panel_scheme: env::var("CAPTCHA_SCHEME")
                .unwrap_or_else(|_| "https".to_string()),
            bearer_api_base: env::var("BEARER_API_BASE")
                .unwrap_or_else(|_| "https://api.iboproapp.com".to_string()),
            bearer_origin: env::var("BEARER_ORIGIN")
                .unwrap_or_else(|_| "https://iboplayer.pro".to_string()),
            scraped_base: env::var("SCRAPED_BASE")
                .unwrap_or_else(|_| "https://vuproplayer.org".to_string()),

            // CAPTCHA solver
            captcha_api_base: env::var("CAPTCHA_API_BASE")
                .unwrap_or_else(|_| "http://2captcha.com".to_string()),
            captcha_api_key: env::var("CAPTCHA_API_KEY").unwrap_or_default(),
            captcha_poll_interval_ms: env::var("CAPTCHA_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            captcha_max_attempts: env::var("CAPTCHA_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),

            // Bulk migration
            bulk_pause_ms: env::var("BULK_PAUSE_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn captcha_poll_interval(&self) -> Duration {
        Duration::from_millis(self.captcha_poll_interval_ms)
    }

    pub fn bulk_pause(&self) -> Duration {
        Duration::from_millis(self.bulk_pause_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
