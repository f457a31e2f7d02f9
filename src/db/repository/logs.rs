//! Audit log repository

use sqlx::PgPool;

use crate::db::models::LogRow;
use crate::models::NewLog;

pub async fn insert(pool: &PgPool, entry: &NewLog) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO logs (account_id, action, status, message, details)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(entry.account_id)
    .bind(entry.action)
    .bind(entry.status.as_str())
    .bind(&entry.message)
    .bind(&entry.details)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent entries first
pub async fn list(
    pool: &PgPool,
    account_id: Option<i64>,
    limit: i64,
) -> Result<Vec<LogRow>, sqlx::Error> {
    sqlx::query_as::<_, LogRow>(
        r#"
        SELECT l.id, l.account_id, a.name AS account_name, l.action, l.status,
               l.message, l.details, l.created_at
        FROM logs l
        LEFT JOIN accounts a ON a.id = l.account_id
        WHERE ($1::BIGINT IS NULL OR l.account_id = $1)
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT $2
        "#,
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
