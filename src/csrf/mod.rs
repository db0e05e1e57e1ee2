use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;

mod guard;

pub use guard::{csrf_protect, CsrfGuard};

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/csrftoken", get(issue_csrf_token))
}

/// GET /csrftoken: new token in the body and in the CSRF cookie.
#[instrument(skip(guard))]
pub async fn issue_csrf_token(
    State(guard): State<CsrfGuard>,
) -> Result<(HeaderMap, Json<CsrfTokenResponse>), ApiError> {
    let token = guard.issue()?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&guard.cookie_header(&token)).map_err(anyhow::Error::from)?,
    );
    debug!(cookie = %guard.cookie_name(), header = %guard.header_name(), "csrf token issued");
    Ok((headers, Json(CsrfTokenResponse { csrf_token: token })))
}
