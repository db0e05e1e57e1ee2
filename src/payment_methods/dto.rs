use serde::Deserialize;

use crate::error::ApiError;
use crate::patch::{self, Nullable};

#[derive(Debug, Deserialize)]
pub struct PaymentMethodCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentMethodUpdate {
    pub name: Option<String>,
    /// `null` clears the description.
    #[serde(default, deserialize_with = "patch::nullable")]
    pub description: Nullable<String>,
}

fn check_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    Ok(())
}

impl PaymentMethodCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_name(&self.name)
    }
}

impl PaymentMethodUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        self.name.as_deref().map_or(Ok(()), check_name)
    }
}
