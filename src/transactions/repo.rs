use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

use super::dto::{TransactionCreate, TransactionUpdate};
use crate::patch;

/// A single income or expense entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub date: Date,
    pub category_id: i64,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub payment_method_id: i64,
    pub repeat: serde_json::Value,
    pub receipt_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

const COLUMNS: &str = "id, date, category_id, amount, memo, payment_method_id, repeat, \
                       receipt_url, created_at, updated_at";

pub async fn list(db: &PgPool, offset: i64, limit: i64) -> anyhow::Result<Vec<Transaction>> {
    let rows = sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {COLUMNS} FROM transactions ORDER BY date DESC, id DESC OFFSET $1 LIMIT $2"
    ))
    .bind(offset)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: i64) -> anyhow::Result<Option<Transaction>> {
    let row = sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {COLUMNS} FROM transactions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, t: &TransactionCreate) -> anyhow::Result<Transaction> {
    let row = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        INSERT INTO transactions
            (date, category_id, amount, memo, payment_method_id, repeat, receipt_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(t.date)
    .bind(t.category_id)
    .bind(t.amount)
    .bind(&t.memo)
    .bind(t.payment_method_id)
    .bind(&t.repeat)
    .bind(&t.receipt_url)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Absent fields keep their stored value; `memo` and `receipt_url` may be
/// cleared with an explicit `null`.
pub async fn update(
    db: &PgPool,
    id: i64,
    t: &TransactionUpdate,
) -> anyhow::Result<Option<Transaction>> {
    let (memo_sent, memo) = patch::split(&t.memo);
    let (receipt_url_sent, receipt_url) = patch::split(&t.receipt_url);
    let row = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        UPDATE transactions
           SET date = COALESCE($2, date),
               category_id = COALESCE($3, category_id),
               amount = COALESCE($4, amount),
               memo = CASE WHEN $9 THEN $5 ELSE memo END,
               payment_method_id = COALESCE($6, payment_method_id),
               repeat = COALESCE($7, repeat),
               receipt_url = CASE WHEN $10 THEN $8 ELSE receipt_url END,
               updated_at = now()
         WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(t.date)
    .bind(t.category_id)
    .bind(t.amount)
    .bind(memo)
    .bind(t.payment_method_id)
    .bind(&t.repeat)
    .bind(receipt_url)
    .bind(memo_sent)
    .bind(receipt_url_sent)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
