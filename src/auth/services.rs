use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
#[cfg(test)]
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::auth::{
    claims::Claims,
    dto::PublicUser,
    jwt::{JwtKeys, TokenError},
    password::{hash_password, hash_password_blocking, verify_password_blocking},
    repo::{StoreError, UserStore},
    repo_types::NewUser,
};
use crate::error::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Username must not be empty")]
    InvalidUsername,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Username is already registered")]
    DuplicateUsername,
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("Could not validate credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::InvalidUsername => "invalid_username",
            AuthError::InvalidEmail => "invalid_email",
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::WeakPassword(_) => "weak_password",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername => AuthError::DuplicateUsername,
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Other(e) => AuthError::Internal(e),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let detail = match &self {
            AuthError::Internal(e) => {
                error!(error = ?e, "auth internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorBody {
            detail,
            code: Some(self.code()),
        });
        if matches!(self, AuthError::InvalidCredentials) {
            (self.status(), [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (self.status(), body).into_response()
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    // Verified against when the username is unknown so both login failures
    // cost one Argon2 verification.
    static ref DUMMY_HASH: String =
        hash_password("dummy-password-for-timing").unwrap_or_default();
}

/// Signup, login and token resolution over a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
    min_password_len: usize,
}

impl AuthService {
    /// Builds the login dummy hash eagerly, outside any request.
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys, min_password_len: usize) -> Self {
        lazy_static::initialize(&DUMMY_HASH);
        Self {
            store,
            keys,
            min_password_len,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AuthError> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        if username.is_empty() {
            return Err(AuthError::InvalidUsername);
        }
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::InvalidEmail);
        }
        if self.store.find_by_username(username).await?.is_some() {
            warn!(username = %username, "username already registered");
            return Err(AuthError::DuplicateUsername);
        }
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateEmail);
        }
        if password.chars().count() < self.min_password_len {
            warn!(username = %username, "password too short");
            return Err(AuthError::WeakPassword(self.min_password_len));
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;
        let user = self
            .store
            .create(NewUser {
                username: username.to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| {
                if !matches!(e, StoreError::Other(_)) {
                    warn!(username = %username, error = %e, "signup lost uniqueness race");
                }
                AuthError::from(e)
            })?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user.into())
    }

    /// Returns a signed access token for the user.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let username = username.trim();
        let user = self.store.find_by_username(username).await?;

        let Some(user) = user else {
            verify_password_blocking(password.to_string(), DUMMY_HASH.clone()).await;
            warn!(username = %username, "login unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await {
            warn!(username = %username, user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.sign(&user.username)?;
        info!(user_id = %user.id, username = %user.username, "user logged in");
        Ok(token)
    }

    pub async fn resolve(&self, token: &str) -> Result<PublicUser, AuthError> {
        self.resolve_claims(self.keys.verify(token)).await
    }

    #[cfg(test)]
    pub(crate) async fn resolve_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<PublicUser, AuthError> {
        self.resolve_claims(self.keys.verify_at(token, now)).await
    }

    async fn resolve_claims(
        &self,
        verified: Result<Claims, TokenError>,
    ) -> Result<PublicUser, AuthError> {
        let claims = verified.map_err(|e| {
            debug!(reason = %e, "token rejected");
            AuthError::InvalidCredentials
        })?;

        match self.store.find_by_username(&claims.sub).await? {
            Some(user) => Ok(user.into()),
            None => {
                warn!(username = %claims.sub, "token subject no longer exists");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{password::verify_password, repo::MemoryUserStore};
    use crate::config::JwtConfig;
    use time::Duration;

    fn make_service() -> AuthService {
        let keys = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            algorithm: "HS256".into(),
            ttl_minutes: 15,
        })
        .expect("keys");
        AuthService::new(Arc::new(MemoryUserStore::default()), keys, 6)
    }

    #[tokio::test]
    async fn signup_login_resolve() {
        let svc = make_service();
        let user = svc.signup("alice", "a@x.com", "secret1").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");

        let token = svc.login("alice", "secret1").await.unwrap();
        let me = svc.resolve(&token).await.unwrap();
        assert_eq!(me, user);
    }

    #[tokio::test]
    async fn duplicate_username_and_email() {
        let svc = make_service();
        svc.signup("alice", "a@x.com", "secret1").await.unwrap();

        let err = svc.signup("alice", "other@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));

        let err = svc.signup("bob", "a@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn duplicates_are_reported_before_weak_password() {
        let svc = make_service();
        svc.signup("alice", "a@x.com", "secret1").await.unwrap();
        let err = svc.signup("alice", "b@x.com", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername));
    }

    #[tokio::test]
    async fn signup_validation() {
        let svc = make_service();
        assert!(matches!(
            svc.signup("alice", "a@x.com", "short").await.unwrap_err(),
            AuthError::WeakPassword(6)
        ));
        assert!(matches!(
            svc.signup("alice", "not-an-email", "secret1").await.unwrap_err(),
            AuthError::InvalidEmail
        ));
        assert!(matches!(
            svc.signup("   ", "a@x.com", "secret1").await.unwrap_err(),
            AuthError::InvalidUsername
        ));
        // exactly the minimum is fine
        assert!(svc.signup("alice", "a@x.com", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = make_service();
        svc.signup("alice", "a@x.com", "secret1").await.unwrap();

        let wrong_pw = svc.login("alice", "wrong-pw").await.unwrap_err();
        let unknown = svc.login("mallory", "secret1").await.unwrap_err();

        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong_pw.status(), unknown.status());
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn resolve_respects_ttl() {
        let svc = make_service();
        svc.signup("alice", "a@x.com", "secret1").await.unwrap();

        let issued = OffsetDateTime::now_utc();
        let token = svc.keys().sign_at("alice", issued).unwrap();
        let ttl = svc.keys().ttl();

        assert!(svc
            .resolve_at(&token, issued + ttl - Duration::seconds(1))
            .await
            .is_ok());
        assert!(matches!(
            svc.resolve_at(&token, issued + ttl + Duration::seconds(1))
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn resolve_rejects_tampered_and_orphaned_tokens() {
        let svc = make_service();
        svc.signup("alice", "a@x.com", "secret1").await.unwrap();
        let token = svc.login("alice", "secret1").await.unwrap();

        let (head, sig) = token.rsplit_once('.').unwrap();
        let first = if sig.starts_with('A') { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", head, first, &sig[1..]);
        assert!(matches!(
            svc.resolve(&tampered).await.unwrap_err(),
            AuthError::InvalidCredentials
        ));

        let ghost = svc.keys().sign("ghost").unwrap();
        assert!(matches!(
            svc.resolve(&ghost).await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn concurrent_signups_have_one_winner() {
        let svc = make_service();
        let a = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.signup("alice", "a1@x.com", "secret1").await })
        };
        let b = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.signup("alice", "a2@x.com", "secret1").await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(AuthError::DuplicateUsername)))
            .count();
        assert_eq!((ok, dup), (1, 1));
    }

    #[test]
    fn error_codes_and_statuses() {
        assert_eq!(AuthError::DuplicateEmail.code(), "duplicate_email");
        assert_eq!(AuthError::WeakPassword(6).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn dummy_hash_is_built_by_new() {
        let _svc = make_service();
        assert!(DUMMY_HASH.starts_with("$argon2"));
        assert!(!verify_password(&"x".repeat(8), &DUMMY_HASH));
    }
}
