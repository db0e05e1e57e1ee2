use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use time::Date;

use crate::error::ApiError;
use crate::patch::{self, Nullable};

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize)]
pub struct TransactionCreate {
    pub date: Date,
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub memo: Option<String>,
    pub payment_method_id: i64,
    /// Recurrence settings, e.g. `{"every": "month"}`.
    #[serde(default = "empty_object")]
    pub repeat: Value,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionUpdate {
    pub date: Option<Date>,
    pub category_id: Option<i64>,
    pub amount: Option<Decimal>,
    /// `null` clears the memo.
    #[serde(default, deserialize_with = "patch::nullable")]
    pub memo: Nullable<String>,
    pub payment_method_id: Option<i64>,
    pub repeat: Option<Value>,
    /// `null` clears the receipt link.
    #[serde(default, deserialize_with = "patch::nullable")]
    pub receipt_url: Nullable<String>,
}

// NUMERIC(12, 2)
fn check_amount(amount: &Decimal) -> Result<(), ApiError> {
    let max = Decimal::new(9_999_999_999_99, 2);
    if amount.normalize().scale() > 2 {
        return Err(ApiError::BadRequest(
            "amount must have at most 2 decimal places".into(),
        ));
    }
    if amount.abs() > max {
        return Err(ApiError::BadRequest("amount is out of range".into()));
    }
    Ok(())
}

fn check_repeat(repeat: &Value) -> Result<(), ApiError> {
    if !repeat.is_object() {
        return Err(ApiError::BadRequest("repeat must be a JSON object".into()));
    }
    Ok(())
}

fn check_receipt_url(url: &str) -> Result<(), ApiError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::BadRequest(
            "receipt_url must be an http(s) URL".into(),
        ));
    }
    Ok(())
}

impl TransactionCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_amount(&self.amount)?;
        check_repeat(&self.repeat)?;
        if let Some(url) = &self.receipt_url {
            check_receipt_url(url)?;
        }
        Ok(())
    }
}

impl TransactionUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(amount) = &self.amount {
            check_amount(amount)?;
        }
        if let Some(repeat) = &self.repeat {
            check_repeat(repeat)?;
        }
        if let Some(Some(url)) = &self.receipt_url {
            check_receipt_url(url)?;
        }
        Ok(())
    }
}
