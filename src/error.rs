//! Error taxonomy shared by the adapters, the session store and the
//! migration orchestrator.

use thiserror::Error;

use crate::models::Protocol;

pub type PanelResult<T> = Result<T, PanelError>;

#[derive(Debug, Error)]
pub enum PanelError {
    /// Remote panel refused the device credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// CAPTCHA could not be fetched, solved, or was not solved in time
    #[error("challenge not resolved: {0}")]
    Challenge(String),

    /// Remote panel rejected an established session
    #[error("session expired or rejected by the panel")]
    SessionExpired,

    /// No session was ever stored for this account
    #[error("no session for {protocol} account {account_id}, login first")]
    NoSession { protocol: Protocol, account_id: i64 },

    /// Business-level rejection carrying the panel's own message
    #[error("panel rejected the request: {reason}")]
    RemoteRejected { reason: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// Caller misuse detected before any network call
    #[error("{0}")]
    Usage(String),

    /// A session was handed to an adapter of a different protocol
    #[error("session of protocol {session} used with {adapter} adapter")]
    ProtocolMismatch { session: Protocol, adapter: Protocol },

    #[error("storage error: {0}")]
    Storage(String),

    /// Local record (account, group, domain) does not exist
    #[error("{0} not found")]
    NotFound(String),
}

impl PanelError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        PanelError::RemoteRejected {
            reason: reason.into(),
        }
    }

    /// Map a failed insert/update, turning constraint violations into
    /// caller errors naming `what`
    pub fn from_write(e: sqlx::Error, what: &str) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                PanelError::Usage(format!("{} already exists", what))
            }
            Some(db) if db.is_foreign_key_violation() => {
                PanelError::Usage(format!("{} references a record that does not exist", what))
            }
            _ => e.into(),
        }
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PanelError::Transport("request timed out".to_string())
        } else if e.is_connect() {
            PanelError::Transport(format!("connection failed: {}", e))
        } else {
            PanelError::Transport(e.to_string())
        }
    }
}

impl From<redis::RedisError> for PanelError {
    fn from(e: redis::RedisError) -> Self {
        PanelError::Storage(e.to_string())
    }
}

impl From<sqlx::Error> for PanelError {
    fn from(e: sqlx::Error) -> Self {
        PanelError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(e: serde_json::Error) -> Self {
        PanelError::Storage(format!("serialization: {}", e))
    }
}
