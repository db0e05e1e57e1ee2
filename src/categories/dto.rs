use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_COLOR: &str = "#FFFFFF";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn is_hex_color(color: &str) -> bool {
    lazy_static! {
        static ref HEX_COLOR_RE: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
    }
    HEX_COLOR_RE.is_match(color)
}

#[derive(Debug, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
}

impl CategoryCreate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("name must not be empty".into()));
        }
        if self.kind.trim().is_empty() {
            return Err(ApiError::BadRequest("type must not be empty".into()));
        }
        if !is_hex_color(&self.color) {
            return Err(ApiError::BadRequest("color must look like #RRGGBB".into()));
        }
        Ok(())
    }
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(ApiError::BadRequest("name must not be empty".into()));
        }
        if matches!(&self.kind, Some(k) if k.trim().is_empty()) {
            return Err(ApiError::BadRequest("type must not be empty".into()));
        }
        if matches!(&self.color, Some(c) if !is_hex_color(c)) {
            return Err(ApiError::BadRequest("color must look like #RRGGBB".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_defaults_to_white() {
        let c: CategoryCreate =
            serde_json::from_str(r#"{"name":"Groceries","type":"expense"}"#).unwrap();
        assert_eq!(c.color, DEFAULT_COLOR);
        assert_eq!(c.kind, "expense");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_colors() {
        for color in ["red", "#FFF", "#GGGGGG", "FFFFFF", "#FFFFFF0"] {
            let c = CategoryCreate {
                name: "Rent".into(),
                kind: "expense".into(),
                color: color.into(),
            };
            assert!(c.validate().is_err(), "{} should be refused", color);
        }
    }

    #[test]
    fn partial_update() {
        let u: CategoryUpdate = serde_json::from_str(r##"{"color":"#00ff00"}"##).unwrap();
        assert!(u.name.is_none() && u.kind.is_none());
        assert!(u.validate().is_ok());

        let u = CategoryUpdate {
            name: Some(" ".into()),
            ..Default::default()
        };
        assert!(u.validate().is_err());
    }
}
