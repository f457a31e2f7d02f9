//! PostgreSQL-backed [`AccountDirectory`]

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::repository::{accounts, configs, domains, logs};
use crate::error::{PanelError, PanelResult};
use crate::models::{Account, DomainRecord, NewLog, PlaylistEntry, PlaylistSnapshot};
use crate::services::directory::AccountDirectory;

#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgDirectory {
    async fn account(&self, id: i64) -> PanelResult<Account> {
        accounts::find(&self.pool, id)
            .await?
            .ok_or_else(|| PanelError::NotFound(format!("account {}", id)))?
            .into_account()
    }

    async fn accounts_in_group(&self, group_id: i64) -> PanelResult<Vec<Account>> {
        accounts::active_in_group(&self.pool, group_id)
            .await?
            .into_iter()
            .map(|row| row.into_account())
            .collect()
    }

    async fn domain(&self, id: i64) -> PanelResult<DomainRecord> {
        domains::find(&self.pool, id)
            .await?
            .map(DomainRecord::from)
            .ok_or_else(|| PanelError::NotFound(format!("domain {}", id)))
    }

    async fn snapshot(&self, account_id: i64) -> PanelResult<PlaylistSnapshot> {
        accounts::snapshot(&self.pool, account_id)
            .await?
            .map(|row| row.into_snapshot())
            .ok_or_else(|| PanelError::NotFound(format!("account {}", account_id)))
    }

    async fn save_snapshot(&self, account_id: i64, entries: &[PlaylistEntry]) -> PanelResult<()> {
        accounts::save_snapshot(&self.pool, account_id, entries).await?;
        Ok(())
    }

    async fn touch_sync(&self, account_id: i64) -> PanelResult<()> {
        accounts::touch_sync(&self.pool, account_id).await?;
        Ok(())
    }

    async fn append_log(&self, entry: NewLog) -> PanelResult<()> {
        logs::insert(&self.pool, &entry).await?;
        Ok(())
    }

    async fn setting(&self, key: &str) -> PanelResult<Option<String>> {
        Ok(configs::get(&self.pool, key).await?)
    }
}
