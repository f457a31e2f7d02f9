//! Database row types for PostgreSQL
//!
//! These types map directly to database rows and convert into the API
//! types in `crate::models`.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::{PanelError, PanelResult};
use crate::models::{
    Account, ConfigEntry, DomainRecord, Group, LogRecord, PanelDomain, PlaylistEntry,
    PlaylistSnapshot,
};

/// Account row from database
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub name: String,
    pub mac: String,
    pub protocol: String,
    pub device_key: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub group_id: Option<i64>,
    pub active: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

impl AccountRow {
    pub fn into_account(self) -> PanelResult<Account> {
        let protocol = self.protocol.parse().map_err(|_| {
            PanelError::Storage(format!(
                "account {} has unknown protocol '{}'",
                self.id, self.protocol
            ))
        })?;
        Ok(Account {
            id: self.id,
            name: self.name,
            mac: self.mac,
            protocol,
            device_key: self.device_key,
            password: self.password,
            domain: self.domain,
            group_id: self.group_id,
            active: self.active,
            last_sync: self.last_sync,
        })
    }
}

/// Cached listing columns of an account
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub playlists_snapshot: Option<Json<Vec<PlaylistEntry>>>,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SnapshotRow {
    pub fn into_snapshot(self) -> PlaylistSnapshot {
        PlaylistSnapshot {
            entries: self.playlists_snapshot.map(|j| j.0).unwrap_or_default(),
            last_sync: self.last_sync,
        }
    }
}

/// Group row with its member count
#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub account_count: i64,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: row.id,
            name: row.name,
            description: row.description,
            account_count: row.account_count,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DomainRow {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub active: bool,
}

impl From<DomainRow> for DomainRecord {
    fn from(row: DomainRow) -> Self {
        DomainRecord {
            id: row.id,
            name: row.name,
            url: row.url,
            active: row.active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PanelDomainRow {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub active: bool,
}

impl From<PanelDomainRow> for PanelDomain {
    fn from(row: PanelDomainRow) -> Self {
        PanelDomain {
            id: row.id,
            name: row.name,
            domain: row.domain,
            active: row.active,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ConfigRow {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigRow> for ConfigEntry {
    fn from(row: ConfigRow) -> Self {
        ConfigEntry {
            key: row.key,
            value: row.value,
            description: row.description,
            updated_at: row.updated_at,
        }
    }
}

/// Audit log row joined with the account name
#[derive(Debug, Clone, FromRow)]
pub struct LogRow {
    pub id: i64,
    pub account_id: Option<i64>,
    pub account_name: Option<String>,
    pub action: String,
    pub status: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<LogRow> for LogRecord {
    fn from(row: LogRow) -> Self {
        LogRecord {
            id: row.id,
            account_id: row.account_id,
            account_name: row.account_name,
            action: row.action,
            status: row.status,
            message: row.message,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Protocol;

    fn row(protocol: &str) -> AccountRow {
        AccountRow {
            id: 4,
            name: "Hall".to_string(),
            mac: "00:1a:79:00:00:04".to_string(),
            protocol: protocol.to_string(),
            device_key: Some("1".to_string()),
            password: None,
            domain: None,
            group_id: Some(2),
            active: true,
            last_sync: None,
        }
    }

    #[test]
    fn test_account_row_conversion() {
        let account = row("cookie_scraped").into_account().unwrap();
        assert_eq!(account.protocol, Protocol::CookieScraped);
        assert_eq!(account.group_id, Some(2));

        assert!(matches!(
            row("vuplayer").into_account(),
            Err(PanelError::Storage(_))
        ));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = SnapshotRow {
            playlists_snapshot: None,
            last_sync: None,
        }
        .into_snapshot();
        assert!(snapshot.entries.is_empty());
    }
}
