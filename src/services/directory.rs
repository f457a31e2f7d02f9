//! Local account records as seen by the account service and the migration
//! orchestrator. PostgreSQL implements it in production
//! (see [`crate::db::PgDirectory`]).

use async_trait::async_trait;

use crate::error::PanelResult;
use crate::models::{Account, DomainRecord, NewLog, PlaylistEntry, PlaylistSnapshot};

/// Settings key holding the CAPTCHA solver API key
pub const CAPTCHA_KEY_SETTING: &str = "captcha_api_key";

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `NotFound` when the account does not exist
    async fn account(&self, id: i64) -> PanelResult<Account>;

    /// Active accounts of a group, ordered by id
    async fn accounts_in_group(&self, group_id: i64) -> PanelResult<Vec<Account>>;

    /// `NotFound` when the domain does not exist
    async fn domain(&self, id: i64) -> PanelResult<DomainRecord>;

    async fn snapshot(&self, account_id: i64) -> PanelResult<PlaylistSnapshot>;

    /// Replace the cached listing and stamp the sync time
    async fn save_snapshot(&self, account_id: i64, entries: &[PlaylistEntry]) -> PanelResult<()>;

    async fn touch_sync(&self, account_id: i64) -> PanelResult<()>;

    async fn append_log(&self, entry: NewLog) -> PanelResult<()>;

    /// Operator-managed setting; `None` when unset
    async fn setting(&self, key: &str) -> PanelResult<Option<String>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::PanelError;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory directory for service tests
    #[derive(Default)]
    pub struct MemoryDirectory {
        pub accounts: Mutex<Vec<Account>>,
        pub domains: Mutex<Vec<DomainRecord>>,
        pub snapshots: Mutex<HashMap<i64, PlaylistSnapshot>>,
        pub synced: Mutex<Vec<i64>>,
        pub logs: Mutex<Vec<NewLog>>,
        pub settings: Mutex<HashMap<String, String>>,
    }

    impl MemoryDirectory {
        pub fn with_accounts(accounts: Vec<Account>) -> Self {
            let directory = Self::default();
            *directory.accounts.lock().unwrap() = accounts;
            directory
        }

        pub fn add_domain(&self, id: i64, url: &str) {
            self.domains.lock().unwrap().push(DomainRecord {
                id,
                name: format!("domain-{}", id),
                url: url.to_string(),
                active: true,
            });
        }

        pub fn logs(&self) -> Vec<NewLog> {
            self.logs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AccountDirectory for MemoryDirectory {
        async fn account(&self, id: i64) -> PanelResult<Account> {
            self.accounts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| PanelError::NotFound(format!("account {}", id)))
        }

        async fn accounts_in_group(&self, group_id: i64) -> PanelResult<Vec<Account>> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.group_id == Some(group_id) && a.active)
                .cloned()
                .collect())
        }

        async fn domain(&self, id: i64) -> PanelResult<DomainRecord> {
            self.domains
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| PanelError::NotFound(format!("domain {}", id)))
        }

        async fn snapshot(&self, account_id: i64) -> PanelResult<PlaylistSnapshot> {
            Ok(self
                .snapshots
                .lock()
                .unwrap()
                .get(&account_id)
                .cloned()
                .unwrap_or(PlaylistSnapshot {
                    entries: Vec::new(),
                    last_sync: None,
                }))
        }

        async fn save_snapshot(&self, account_id: i64, entries: &[PlaylistEntry]) -> PanelResult<()> {
            self.snapshots.lock().unwrap().insert(
                account_id,
                PlaylistSnapshot {
                    entries: entries.to_vec(),
                    last_sync: Some(Utc::now()),
                },
            );
            Ok(())
        }

        async fn touch_sync(&self, account_id: i64) -> PanelResult<()> {
            self.synced.lock().unwrap().push(account_id);
            Ok(())
        }

        async fn append_log(&self, entry: NewLog) -> PanelResult<()> {
            self.logs.lock().unwrap().push(entry);
            Ok(())
        }

        async fn setting(&self, key: &str) -> PanelResult<Option<String>> {
            Ok(self.settings.lock().unwrap().get(key).cloned())
        }
    }
}
