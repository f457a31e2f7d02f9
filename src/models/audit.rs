use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub const ACTION_LOGIN: &str = "login";
pub const ACTION_LOGOUT: &str = "logout";
pub const ACTION_SYNC: &str = "sync_playlists";
pub const ACTION_LIST: &str = "list_playlists";
pub const ACTION_CREATE: &str = "create_playlist";
pub const ACTION_UPDATE: &str = "update_playlist";
pub const ACTION_DELETE: &str = "delete_playlist";
pub const ACTION_BULK: &str = "bulk_domain_change";
pub const ACTION_UPDATE_ACCOUNT: &str = "update_account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
        }
    }
}

/// Audit entry to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewLog {
    pub account_id: Option<i64>,
    pub action: &'static str,
    pub status: LogStatus,
    pub message: String,
    pub details: Option<Value>,
}

impl NewLog {
    pub fn success(account_id: i64, action: &'static str, message: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id),
            action,
            status: LogStatus::Success,
            message: message.into(),
            details: None,
        }
    }

    pub fn error(account_id: i64, action: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: LogStatus::Error,
            ..Self::success(account_id, action, message)
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Stored audit entry as listed by operators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    pub account_id: Option<i64>,
    pub account_name: Option<String>,
    pub action: String,
    pub status: String,
    pub message: String,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}
