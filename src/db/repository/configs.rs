//! Operator settings repository

use sqlx::PgPool;

use crate::db::models::ConfigRow;

/// Stored value for `key`, `None` when the key is absent or NULL
pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM configs WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(value,)| value))
}

pub async fn list(pool: &PgPool) -> Result<Vec<ConfigRow>, sqlx::Error> {
    sqlx::query_as::<_, ConfigRow>(
        "SELECT key, value, description, updated_at FROM configs ORDER BY key",
    )
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, key: &str) -> Result<Option<ConfigRow>, sqlx::Error> {
    sqlx::query_as::<_, ConfigRow>(
        "SELECT key, value, description, updated_at FROM configs WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Insert or replace; a missing description keeps the stored one
pub async fn set(
    pool: &PgPool,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> Result<ConfigRow, sqlx::Error> {
    sqlx::query_as::<_, ConfigRow>(
        r#"
        INSERT INTO configs (key, value, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (key) DO UPDATE
        SET value = EXCLUDED.value,
            description = COALESCE(EXCLUDED.description, configs.description),
            updated_at = NOW()
        RETURNING key, value, description, updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM configs WHERE key = $1")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
