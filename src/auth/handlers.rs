use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{instrument, Span};

use crate::{
    auth::{
        dto::{LoginForm, MessageResponse, PublicUser, SignupRequest, TokenResponse},
        extractors::{CurrentUser, ACCESS_TOKEN_COOKIE},
        services::{AuthError, AuthService},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/token", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user/me", get(get_me))
}

/// Routes that end a cookie session; mounted behind the CSRF guard.
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/logout", post(logout))
}

#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn signup(
    State(auth): State<AuthService>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let Json(payload) = payload.map_err(|e| AuthError::InvalidRequest(e.body_text()))?;
    Span::current().record("username", payload.username.as_str());
    let user = auth
        .signup(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<(HeaderMap, Json<TokenResponse>), AuthError> {
    let Form(form) = form.map_err(|e| AuthError::InvalidRequest(e.body_text()))?;
    Span::current().record("username", form.username.as_str());
    let token = state.auth.login(&form.username, &form.password).await?;

    let mut cookie = format!(
        "{}=\"Bearer {}\"; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        ACCESS_TOKEN_COOKIE,
        token,
        state.auth.keys().ttl().whole_seconds()
    );
    if state.config.cookie_secure {
        cookie.push_str("; Secure");
    }
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(anyhow::Error::from)?,
    );

    Ok((headers, Json(TokenResponse::bearer(token))))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user)
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(CurrentUser(user): CurrentUser) -> (HeaderMap, Json<MessageResponse>) {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("access_token=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"),
    );
    (
        headers,
        Json(MessageResponse {
            message: format!("{} logged out", user.username),
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn signup_req(username: &str, email: &str, password: &str) -> Request<Body> {
        Request::post("/signup")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"username": username, "email": email, "password": password}).to_string(),
            ))
            .unwrap()
    }

    fn token_req(username: &str, password: &str) -> Request<Body> {
        Request::post("/token")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={}&password={}",
                username, password
            )))
            .unwrap()
    }

    #[tokio::test]
    async fn signup_login_me_scenario() {
        let app = build_app(AppState::fake());

        let (status, user) = send(&app, signup_req("alice", "a@x.com", "secret1")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["username"], "alice");
        assert_eq!(user["email"], "a@x.com");
        assert!(user["id"].is_string());
        assert!(user.get("password_hash").is_none());

        let (status, token) = send(&app, token_req("alice", "secret1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(token["token_type"], "bearer");
        let access = token["access_token"].as_str().unwrap().to_string();

        let me = Request::get("/user/me")
            .header("authorization", format!("Bearer {}", access))
            .body(Body::empty())
            .unwrap();
        let (status, me) = send(&app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me, user);

        let anon = Request::get("/user/me").body(Body::empty()).unwrap();
        let (status, body) = send(&app, anon).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_credentials");
    }

    #[tokio::test]
    async fn signup_failures_are_400_with_codes() {
        let app = build_app(AppState::fake());
        send(&app, signup_req("alice", "a@x.com", "secret1")).await;

        let (status, body) = send(&app, signup_req("alice", "b@x.com", "secret1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "duplicate_username");

        let (status, body) = send(&app, signup_req("bob", "a@x.com", "secret1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "duplicate_email");

        let (status, body) = send(&app, signup_req("bob", "b@x.com", "12345")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "weak_password");
    }

    #[tokio::test]
    async fn incomplete_bodies_are_400_with_codes() {
        let app = build_app(AppState::fake());

        let partial = Request::post("/signup")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username":"bob"}"#))
            .unwrap();
        let (status, body) = send(&app, partial).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
        assert!(body["detail"].is_string());

        let broken = Request::post("/signup")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, broken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");

        let no_password = Request::post("/token")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("username=bob"))
            .unwrap();
        let (status, body) = send(&app, no_password).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn login_does_not_enumerate_users() {
        let app = build_app(AppState::fake());
        send(&app, signup_req("alice", "a@x.com", "secret1")).await;

        let wrong = send(&app, token_req("alice", "nope-nope")).await;
        let unknown = send(&app, token_req("nobody", "secret1")).await;
        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn access_cookie_authenticates_reads() {
        let app = build_app(AppState::fake());
        send(&app, signup_req("alice", "a@x.com", "secret1")).await;

        let res = app.clone().oneshot(token_req("alice", "secret1")).await.unwrap();
        let set_cookie = res
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("access_token=\"Bearer "));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let me = Request::get("/user/me")
            .header("cookie", cookie)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn garbage_bearer_is_401() {
        let app = build_app(AppState::fake());
        let req = Request::get("/user/me")
            .header("authorization", "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers().get("www-authenticate").unwrap(), "Bearer");
    }
}
