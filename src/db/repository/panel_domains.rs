//! Known cookie_captcha panel hosts repository

use sqlx::PgPool;

use crate::db::models::PanelDomainRow;
use crate::models::PanelDomainInput;

pub async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<PanelDomainRow>, sqlx::Error> {
    sqlx::query_as::<_, PanelDomainRow>(
        "SELECT id, name, domain, active FROM panel_domains WHERE (NOT $1 OR active) ORDER BY name",
    )
    .bind(active_only)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<PanelDomainRow>, sqlx::Error> {
    sqlx::query_as::<_, PanelDomainRow>(
        "SELECT id, name, domain, active FROM panel_domains WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(
    pool: &PgPool,
    panel: &PanelDomainInput,
) -> Result<PanelDomainRow, sqlx::Error> {
    sqlx::query_as::<_, PanelDomainRow>(
        r#"
        INSERT INTO panel_domains (name, domain, active)
        VALUES ($1, $2, $3)
        RETURNING id, name, domain, active
        "#,
    )
    .bind(&panel.name)
    .bind(&panel.domain)
    .bind(panel.active.unwrap_or(true))
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    panel: &PanelDomainInput,
) -> Result<Option<PanelDomainRow>, sqlx::Error> {
    sqlx::query_as::<_, PanelDomainRow>(
        r#"
        UPDATE panel_domains
        SET name = $2, domain = $3, active = COALESCE($4, active)
        WHERE id = $1
        RETURNING id, name, domain, active
        "#,
    )
    .bind(id)
    .bind(&panel.name)
    .bind(&panel.domain)
    .bind(panel.active)
    .fetch_optional(pool)
    .await
}

pub async fn toggle(pool: &PgPool, id: i64) -> Result<Option<PanelDomainRow>, sqlx::Error> {
    sqlx::query_as::<_, PanelDomainRow>(
        "UPDATE panel_domains SET active = NOT active WHERE id = $1 RETURNING id, name, domain, active",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM panel_domains WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
