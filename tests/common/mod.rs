#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use law_office_site::{
    AppConfig, AppState, InMemoryRepository, config::AuthMode, create_router,
    repository::RepositoryState,
};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-jwt-secret";

/// Builds the full router on a fresh in-memory store.
pub fn build_app(mode: AuthMode) -> (Router, RepositoryState) {
    let mut config = AppConfig::default();
    config.auth_mode = mode;
    config.jwt_secret = TEST_JWT_SECRET.to_string();
    // Keep the client fallback on its generated shell.
    config.static_dir = "./does-not-exist".to_string();

    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    let app = create_router(AppState::new(repo.clone(), config));
    (app, repo)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

/// Sends one request through the router. `auth` is either `Bearer <token>` or a
/// `Cookie` value prefixed with `cookie:`.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    auth: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    match auth {
        Some(cookie) if cookie.starts_with("cookie:") => {
            builder = builder.header(header::COOKIE, cookie.trim_start_matches("cookie:"));
        }
        Some(token) => {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        None => {}
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&bytes).to_string();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
        text,
    }
}

pub async fn register(app: &Router, username: &str, password: &str) -> TestResponse {
    send(
        app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "username": username, "password": password })),
        None,
    )
    .await
}

/// Registers and logs in, returning the bearer token.
pub async fn token_for(app: &Router, username: &str, password: &str) -> String {
    let registered = register(app, username, password).await;
    assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.text);

    let login = send(
        app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "username": username, "password": password })),
        None,
    )
    .await;
    assert_eq!(login.status, StatusCode::OK, "{}", login.text);
    login.body["token"].as_str().unwrap().to_string()
}

/// `name=value` of the session cookie set by a response, ready for a `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", law_office_site::SESSION_COOKIE)))
        .and_then(|v| v.split(';').next())
        .map(|pair| format!("cookie:{pair}"))
}

pub fn article_payload(slug: &str, published: bool) -> Value {
    json!({
        "slug": slug,
        "title": "Direitos do Consumidor",
        "excerpt": "O que fazer quando o produto chega com defeito.",
        "content": "Texto completo do artigo.",
        "published": published
    })
}
