use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::dto::{CategoryCreate, CategoryUpdate};

/// Transaction category such as "Groceries" (expense) or "Salary" (income).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

const COLUMNS: &str = "id, name, kind, color, created_at, updated_at";

pub async fn list(db: &PgPool, offset: i64, limit: i64) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM categories ORDER BY id OFFSET $1 LIMIT $2"
    ))
    .bind(offset)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: i64) -> anyhow::Result<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM categories WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, c: &CategoryCreate) -> anyhow::Result<Category> {
    let row = sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (name, kind, color) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    ))
    .bind(&c.name)
    .bind(&c.kind)
    .bind(&c.color)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Absent fields keep their stored value.
pub async fn update(db: &PgPool, id: i64, c: &CategoryUpdate) -> anyhow::Result<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(&format!(
        r#"
        UPDATE categories
           SET name = COALESCE($2, name),
               kind = COALESCE($3, kind),
               color = COALESCE($4, color),
               updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&c.name)
    .bind(&c.kind)
    .bind(&c.color)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
