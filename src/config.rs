use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Name of the HMAC algorithm: HS256, HS384 or HS512.
    pub algorithm: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfConfig {
    pub secret: String,
    pub cookie_name: String,
    pub header_name: String,
    pub max_age_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub csrf: CsrfConfig,
    pub password_min_length: usize,
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,
}

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;
pub const DEFAULT_PASSWORD_MIN_LENGTH: usize = 6;

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?,
            algorithm: std::env::var("ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            ttl_minutes: parse_var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
        };
        let csrf = CsrfConfig {
            secret: std::env::var("CSRF_SECRET_KEY").context("CSRF_SECRET_KEY must be set")?,
            cookie_name: std::env::var("CSRF_COOKIE_NAME").unwrap_or_else(|_| "csrf_token".into()),
            header_name: std::env::var("CSRF_HEADER_NAME")
                .unwrap_or_else(|_| "x-csrf-token".into()),
            max_age_seconds: parse_var("CSRF_MAX_AGE_SECONDS").unwrap_or(3600),
        };
        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            jwt,
            csrf,
            password_min_length: parse_var("PASSWORD_MIN_LENGTH")
                .unwrap_or(DEFAULT_PASSWORD_MIN_LENGTH),
            cookie_secure: parse_var("COOKIE_SECURE").unwrap_or(false),
            cors_origins,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}
