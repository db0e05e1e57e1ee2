use serde::Deserialize;

use crate::error::ApiError;

/// Request body for creating or replacing a todo.
#[derive(Debug, Deserialize)]
pub struct TodoBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl TodoBody {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::BadRequest("title must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_defaults_to_empty() {
        let body: TodoBody = serde_json::from_str(r#"{"title":"buy milk"}"#).unwrap();
        assert_eq!(body.description, "");
        assert!(body.validate().is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        let body: TodoBody = serde_json::from_str(r#"{"title":"  ","description":"x"}"#).unwrap();
        assert!(matches!(body.validate(), Err(ApiError::BadRequest(_))));
    }
}
