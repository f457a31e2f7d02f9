//! Accounts repository

use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::{AccountRow, SnapshotRow};
use crate::models::{NewAccount, PlaylistEntry};

const ACCOUNT_COLUMNS: &str =
    "id, name, mac, protocol, device_key, password, domain, group_id, active, last_sync";

/// All accounts, optionally restricted to one group
pub async fn list(pool: &PgPool, group_id: Option<i64>) -> Result<Vec<AccountRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE ($1::BIGINT IS NULL OR group_id = $1) ORDER BY name, id",
        ACCOUNT_COLUMNS
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(group_id)
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<AccountRow>, sqlx::Error> {
    let sql = format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS);
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Active members of a group in id order
pub async fn active_in_group(pool: &PgPool, group_id: i64) -> Result<Vec<AccountRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE group_id = $1 AND active ORDER BY id",
        ACCOUNT_COLUMNS
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(group_id)
        .fetch_all(pool)
        .await
}

pub async fn insert(pool: &PgPool, account: &NewAccount) -> Result<AccountRow, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO accounts (name, mac, protocol, device_key, password, domain, group_id, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(account.name.trim())
        .bind(account.mac.trim())
        .bind(account.protocol.as_str())
        .bind(&account.device_key)
        .bind(&account.password)
        .bind(&account.domain)
        .bind(account.group_id)
        .bind(account.active.unwrap_or(true))
        .fetch_one(pool)
        .await
}

pub async fn snapshot(pool: &PgPool, id: i64) -> Result<Option<SnapshotRow>, sqlx::Error> {
    sqlx::query_as::<_, SnapshotRow>(
        "SELECT playlists_snapshot, last_sync FROM accounts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Replace the cached listing and stamp the sync time
pub async fn save_snapshot(
    pool: &PgPool,
    id: i64,
    entries: &[PlaylistEntry],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE accounts
        SET playlists_snapshot = $2, last_sync = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(Json(entries))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn touch_sync(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE accounts SET last_sync = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Replace the editable fields; `None` when the account does not exist
pub async fn update(
    pool: &PgPool,
    id: i64,
    account: &NewAccount,
) -> Result<Option<AccountRow>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE accounts
        SET name = $2, mac = $3, protocol = $4, device_key = $5, password = $6,
            domain = $7, group_id = $8, active = $9, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    );
    sqlx::query_as::<_, AccountRow>(&sql)
        .bind(id)
        .bind(account.name.trim())
        .bind(account.mac.trim())
        .bind(account.protocol.as_str())
        .bind(&account.device_key)
        .bind(&account.password)
        .bind(&account.domain)
        .bind(account.group_id)
        .bind(account.active.unwrap_or(true))
        .fetch_optional(pool)
        .await
}

/// Remove an account and, through the foreign key, its audit entries
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Accounts registered against a panel host
pub async fn count_with_domain(pool: &PgPool, domain: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE domain = $1")
        .bind(domain)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
