//! Account groups repository

use sqlx::PgPool;

use crate::db::models::GroupRow;
use crate::models::GroupInput;

const GROUP_SELECT: &str = r#"
    SELECT g.id, g.name, g.description, COUNT(a.id) AS account_count
    FROM groups g
    LEFT JOIN accounts a ON a.group_id = g.id
"#;

/// All groups with their account counts
pub async fn list(pool: &PgPool) -> Result<Vec<GroupRow>, sqlx::Error> {
    let sql = format!("{} GROUP BY g.id ORDER BY g.name", GROUP_SELECT);
    sqlx::query_as::<_, GroupRow>(&sql).fetch_all(pool).await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<GroupRow>, sqlx::Error> {
    let sql = format!("{} WHERE g.id = $1 GROUP BY g.id", GROUP_SELECT);
    sqlx::query_as::<_, GroupRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, group: &GroupInput) -> Result<GroupRow, sqlx::Error> {
    sqlx::query_as::<_, GroupRow>(
        r#"
        INSERT INTO groups (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description, 0::BIGINT AS account_count
        "#,
    )
    .bind(&group.name)
    .bind(&group.description)
    .fetch_one(pool)
    .await
}

/// `false` when the group does not exist
pub async fn update(pool: &PgPool, id: i64, group: &GroupInput) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE groups SET name = $2, description = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(&group.name)
    .bind(&group.description)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM groups WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
