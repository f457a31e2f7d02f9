//! Migration target domains repository

use sqlx::PgPool;

use crate::db::models::DomainRow;
use crate::models::DomainInput;

pub async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<DomainRow>, sqlx::Error> {
    sqlx::query_as::<_, DomainRow>(
        "SELECT id, name, url, active FROM domains WHERE (NOT $1 OR active) ORDER BY name",
    )
    .bind(active_only)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<DomainRow>, sqlx::Error> {
    sqlx::query_as::<_, DomainRow>("SELECT id, name, url, active FROM domains WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, domain: &DomainInput) -> Result<DomainRow, sqlx::Error> {
    sqlx::query_as::<_, DomainRow>(
        r#"
        INSERT INTO domains (name, url, active)
        VALUES ($1, $2, $3)
        RETURNING id, name, url, active
        "#,
    )
    .bind(&domain.name)
    .bind(&domain.url)
    .bind(domain.active.unwrap_or(true))
    .fetch_one(pool)
    .await
}

/// A missing `active` keeps the stored flag
pub async fn update(
    pool: &PgPool,
    id: i64,
    domain: &DomainInput,
) -> Result<Option<DomainRow>, sqlx::Error> {
    sqlx::query_as::<_, DomainRow>(
        r#"
        UPDATE domains
        SET name = $2, url = $3, active = COALESCE($4, active)
        WHERE id = $1
        RETURNING id, name, url, active
        "#,
    )
    .bind(id)
    .bind(&domain.name)
    .bind(&domain.url)
    .bind(domain.active)
    .fetch_optional(pool)
    .await
}

pub async fn toggle(pool: &PgPool, id: i64) -> Result<Option<DomainRow>, sqlx::Error> {
    sqlx::query_as::<_, DomainRow>(
        "UPDATE domains SET active = NOT active WHERE id = $1 RETURNING id, name, url, active",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM domains WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
