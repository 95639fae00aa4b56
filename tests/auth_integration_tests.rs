mod common;

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header, request::Parts},
};
use common::{build_app, register, send, session_cookie, token_for};
use law_office_site::{
    AppConfig, AppError, AppState, InMemoryRepository,
    auth::{AuthUser, issue_token, verify_token},
    config::AuthMode,
    models::{Identity, NewUser},
    repository::RepositoryState,
};
use serde_json::json;

// --- Helpers ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

async fn state_with_user(username: &str) -> (AppState, Identity) {
    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    let user = repo
        .create_user(NewUser {
            username: username.to_string(),
            password_hash: "unused-in-these-tests".to_string(),
        })
        .await
        .unwrap();

    let mut config = AppConfig::default();
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    (AppState::new(repo, config), Identity::from(&user))
}

fn request_parts(authorization: Option<&str>) -> Parts {
    let mut builder = Request::builder().method(Method::GET).uri("/");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let (parts, _) = builder.body(axum::body::Body::empty()).unwrap().into_parts();
    parts
}

// --- Bearer extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let (state, identity) = state_with_user("alice").await;
    let token = issue_token(&identity, TEST_JWT_SECRET, 1).unwrap();

    let mut parts = request_parts(Some(&format!("Bearer {token}")));
    let auth_user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect("valid token should authenticate");

    assert_eq!(auth_user.id, identity.id);
    assert_eq!(auth_user.username, "alice");
}

#[tokio::test]
async fn test_token_decodes_to_issued_identity() {
    let identity = Identity {
        id: 42,
        username: "bob".to_string(),
    };
    let token = issue_token(&identity, TEST_JWT_SECRET, 24).unwrap();
    assert_eq!(verify_token(&token, TEST_JWT_SECRET).unwrap(), identity);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let (state, _identity) = state_with_user("alice").await;
    let mut parts = request_parts(None);

    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_auth_failure_with_wrong_scheme() {
    let (state, identity) = state_with_user("alice").await;
    let token = issue_token(&identity, TEST_JWT_SECRET, 1).unwrap();

    let mut parts = request_parts(Some(&format!("Token {token}")));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let (state, identity) = state_with_user("alice").await;
    let token = issue_token(&identity, TEST_JWT_SECRET, -2).unwrap();

    let mut parts = request_parts(Some(&format!("Bearer {token}")));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_auth_failure_for_unknown_user() {
    let (state, _identity) = state_with_user("alice").await;
    let ghost = Identity {
        id: 999,
        username: "ghost".to_string(),
    };
    let token = issue_token(&ghost, TEST_JWT_SECRET, 1).unwrap();

    let mut parts = request_parts(Some(&format!("Bearer {token}")));
    let result = AuthUser::from_request_parts(&mut parts, &state).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

// --- Session mode (through the full router) ---

#[tokio::test]
async fn test_session_login_grants_access_and_logout_revokes_it() {
    let (app, _repo) = build_app(AuthMode::Session);
    register(&app, "alice", "pw123").await;

    let login = send(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "username": "alice", "password": "pw123" })),
        None,
    )
    .await;
    assert_eq!(login.status, StatusCode::OK, "{}", login.text);
    assert_eq!(login.body["user"]["username"], "alice");
    let cookie = session_cookie(&login.headers).expect("login should set the session cookie");

    let me = send(&app, Method::GET, "/api/auth/user", None, Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");

    let admin = send(&app, Method::GET, "/api/admin/articles", None, Some(&cookie)).await;
    assert_eq!(admin.status, StatusCode::OK);

    let logout = send(&app, Method::POST, "/api/logout", None, Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = send(&app, Method::GET, "/api/auth/user", None, Some(&cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_login_wrong_password_sets_no_session() {
    let (app, _repo) = build_app(AuthMode::Session);
    register(&app, "alice", "pw123").await;

    let login = send(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "username": "alice", "password": "wrong" })),
        None,
    )
    .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&login.headers).is_none());
}

#[tokio::test]
async fn test_session_mode_ignores_bearer_tokens() {
    let (app, _repo) = build_app(AuthMode::Session);
    // The token endpoint still issues tokens, but this deployment does not accept them.
    let token = token_for(&app, "alice", "pw123").await;

    let me = send(&app, Method::GET, "/api/auth/user", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_mode_ignores_session_cookie() {
    let (app, _repo) = build_app(AuthMode::Token);
    register(&app, "alice", "pw123").await;

    let login = send(
        &app,
        Method::POST,
        "/api/login",
        Some(json!({ "username": "alice", "password": "pw123" })),
        None,
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    let cookie = session_cookie(&login.headers).unwrap();

    let me = send(&app, Method::GET, "/api/auth/user", None, Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_does_not_revoke_bearer_tokens() {
    let (app, _repo) = build_app(AuthMode::Token);
    let token = token_for(&app, "alice", "pw123").await;

    let logout = send(&app, Method::POST, "/api/logout", None, None).await;
    assert_eq!(logout.status, StatusCode::OK);

    let me = send(&app, Method::GET, "/api/auth/user", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
}

// --- Admin bootstrap ---

#[tokio::test]
async fn test_bootstrap_admin_creates_account_once() {
    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    let mut config = AppConfig::default();
    config.admin_username = Some("admin".to_string());
    config.admin_password = Some("s3cret".to_string());

    law_office_site::bootstrap_admin(&repo, &config).await.unwrap();
    law_office_site::bootstrap_admin(&repo, &config).await.unwrap();

    let admin = repo.get_user_by_username("admin").await.unwrap().unwrap();
    assert!(law_office_site::password::verify_password("s3cret", &admin.password_hash).unwrap());

    // The bootstrapped account can log in through the token endpoint.
    let app = law_office_site::create_router(AppState::new(repo, config));
    let login = send(
        &app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "username": "admin", "password": "s3cret" })),
        None,
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_bootstrap_admin_is_noop_without_credentials() {
    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    law_office_site::bootstrap_admin(&repo, &AppConfig::default())
        .await
        .unwrap();
    assert!(repo.get_user_by_username("admin").await.unwrap().is_none());
}
