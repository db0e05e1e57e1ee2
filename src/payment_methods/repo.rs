use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::dto::{PaymentMethodCreate, PaymentMethodUpdate};
use crate::patch;

/// Cash, a credit card, an e-money wallet...
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

const COLUMNS: &str = "id, name, description, created_at, updated_at";

pub async fn list(db: &PgPool, offset: i64, limit: i64) -> anyhow::Result<Vec<PaymentMethod>> {
    let rows = sqlx::query_as::<_, PaymentMethod>(&format!(
        "SELECT {COLUMNS} FROM payment_methods ORDER BY id OFFSET $1 LIMIT $2"
    ))
    .bind(offset)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: i64) -> anyhow::Result<Option<PaymentMethod>> {
    let row = sqlx::query_as::<_, PaymentMethod>(&format!(
        "SELECT {COLUMNS} FROM payment_methods WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, p: &PaymentMethodCreate) -> anyhow::Result<PaymentMethod> {
    let row = sqlx::query_as::<_, PaymentMethod>(&format!(
        "INSERT INTO payment_methods (name, description) VALUES ($1, $2) RETURNING {COLUMNS}"
    ))
    .bind(&p.name)
    .bind(&p.description)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    id: i64,
    p: &PaymentMethodUpdate,
) -> anyhow::Result<Option<PaymentMethod>> {
    let (description_sent, description) = patch::split(&p.description);
    let row = sqlx::query_as::<_, PaymentMethod>(&format!(
        r#"
        UPDATE payment_methods
           SET name = COALESCE($2, name),
               description = CASE WHEN $4 THEN $3 ELSE description END,
               updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&p.name)
    .bind(description)
    .bind(description_sent)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM payment_methods WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
