use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn insert(db: &PgPool, title: &str, description: &str) -> anyhow::Result<Todo> {
    let todo = sqlx::query_as::<_, Todo>(
        r#"
        INSERT INTO todos (title, description)
        VALUES ($1, $2)
        RETURNING id, title, description, created_at
        "#,
    )
    .bind(title)
    .bind(description)
    .fetch_one(db)
    .await?;
    Ok(todo)
}

pub async fn list(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Todo>> {
    let rows = sqlx::query_as::<_, Todo>(
        r#"
        SELECT id, title, description, created_at
        FROM todos
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Todo>> {
    let todo = sqlx::query_as::<_, Todo>(
        r#"SELECT id, title, description, created_at FROM todos WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(todo)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    title: &str,
    description: &str,
) -> anyhow::Result<Option<Todo>> {
    let todo = sqlx::query_as::<_, Todo>(
        r#"
        UPDATE todos
           SET title = $2, description = $3
         WHERE id = $1
        RETURNING id, title, description, created_at
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .fetch_optional(db)
    .await?;
    Ok(todo)
}

/// Returns whether a row was removed.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(r#"DELETE FROM todos WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
