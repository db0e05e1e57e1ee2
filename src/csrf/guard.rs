use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::warn;

use crate::auth::extractors::{cookie_value, has_bearer_header, ACCESS_TOKEN_COOKIE};
use crate::config::CsrfConfig;
use crate::error::ErrorBody;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("Missing CSRF cookie")]
    MissingCookie,
    #[error("Missing CSRF header")]
    MissingHeader,
    #[error("The CSRF tokens do not match")]
    Mismatch,
    #[error("The CSRF token is invalid")]
    BadSignature,
    #[error("The CSRF token has expired")]
    Expired,
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(ErrorBody {
                detail: self.to_string(),
                code: Some("csrf_rejected"),
            }),
        )
            .into_response()
    }
}

/// Double-submit CSRF protection. Tokens look like `<nonce>.<issued_at>.<mac>`
/// where the mac is HMAC-SHA256 over `<nonce>.<issued_at>`.
#[derive(Clone)]
pub struct CsrfGuard {
    key: Arc<[u8]>,
    cookie_name: String,
    header_name: HeaderName,
    max_age_seconds: i64,
    secure: bool,
}

impl CsrfGuard {
    pub fn new(cfg: &CsrfConfig, secure: bool) -> anyhow::Result<Self> {
        anyhow::ensure!(!cfg.secret.is_empty(), "csrf secret must not be empty");
        anyhow::ensure!(cfg.max_age_seconds > 0, "csrf max age must be positive");
        let header_name = HeaderName::from_bytes(cfg.header_name.trim().as_bytes())?;
        Ok(Self {
            key: Arc::from(cfg.secret.as_bytes()),
            cookie_name: cfg.cookie_name.clone(),
            header_name,
            max_age_seconds: cfg.max_age_seconds,
            secure,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    fn mac(&self) -> anyhow::Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| anyhow::anyhow!("hmac key: {}", e))
    }

    pub fn issue(&self) -> anyhow::Result<String> {
        self.issue_at(OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, now: OffsetDateTime) -> anyhow::Result<String> {
        let mut nonce = [0u8; 32];
        OsRng.fill_bytes(&mut nonce);
        let payload = format!("{}.{}", URL_SAFE_NO_PAD.encode(nonce), now.unix_timestamp());

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload, sig))
    }

    /// `Set-Cookie` value delivering `token` to the browser.
    pub fn cookie_header(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, token, self.max_age_seconds
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn validate(&self, headers: &HeaderMap) -> Result<(), CsrfError> {
        self.validate_at(headers, OffsetDateTime::now_utc())
    }

    pub fn validate_at(&self, headers: &HeaderMap, now: OffsetDateTime) -> Result<(), CsrfError> {
        let cookie = cookie_value(headers, &self.cookie_name).ok_or(CsrfError::MissingCookie)?;
        let header = headers
            .get(&self.header_name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CsrfError::MissingHeader)?;

        if cookie != header {
            return Err(CsrfError::Mismatch);
        }
        self.verify_token(header, now)
    }

    fn verify_token(&self, token: &str, now: OffsetDateTime) -> Result<(), CsrfError> {
        let (payload, sig) = token.rsplit_once('.').ok_or(CsrfError::BadSignature)?;
        let (_nonce, issued_at) = payload.split_once('.').ok_or(CsrfError::BadSignature)?;
        let issued_at: i64 = issued_at.parse().map_err(|_| CsrfError::BadSignature)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| CsrfError::BadSignature)?;

        let Ok(mut mac) = self.mac() else {
            return Err(CsrfError::BadSignature);
        };
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| CsrfError::BadSignature)?;

        if now.unix_timestamp() - issued_at > self.max_age_seconds {
            return Err(CsrfError::Expired);
        }
        Ok(())
    }
}

fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

/// Only unsafe methods riding on the session cookie need a CSRF pair.
fn needs_check(method: &Method, headers: &HeaderMap) -> bool {
    !is_safe_method(method)
        && !has_bearer_header(headers)
        && cookie_value(headers, ACCESS_TOKEN_COOKIE).is_some()
}

/// Middleware guarding unsafe methods of cookie-authenticated requests.
/// Bearer-token and anonymous calls pass through to authentication.
pub async fn csrf_protect(
    State(guard): State<CsrfGuard>,
    req: Request,
    next: Next,
) -> Response {
    if !needs_check(req.method(), req.headers()) {
        return next.run(req).await;
    }
    if let Err(e) = guard.validate(req.headers()) {
        warn!(method = %req.method(), uri = %req.uri(), reason = %e, "csrf rejected");
        return e.into_response();
    }
    next.run(req).await
}
