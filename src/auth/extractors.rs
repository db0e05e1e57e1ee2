use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use super::{dto::PublicUser, services::AuthError, services::AuthService};

/// Cookie carrying `Bearer <token>` for browser clients.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Extracts and validates the presented token, returning the current user.
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthService::from_ref(state);
        let token = presented_token(&parts.headers).ok_or(AuthError::InvalidCredentials)?;
        let user = auth.resolve(&token).await?;
        Ok(CurrentUser(user))
    }
}

/// The bearer token from `Authorization`, falling back to the access cookie.
pub(crate) fn presented_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        return auth.to_str().ok().and_then(strip_bearer).map(str::to_string);
    }
    let cookie = cookie_value(headers, ACCESS_TOKEN_COOKIE)?;
    strip_bearer(&cookie).map(str::to_string)
}

pub(crate) fn has_bearer_header(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(strip_bearer)
        .is_some()
}

fn strip_bearer(value: &str) -> Option<&str> {
    let value = value.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Looks a cookie up by name across all `Cookie` headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_string())
}
