use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints, mounted under `/api`. Article reads must only ever
/// expose published records; the handlers enforce this through the repository's
/// `published_only` listing and the slug lookup's published check.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/auth/register
        .route("/auth/register", post(handlers::register_user))
        // POST /api/auth/login
        // Issues a bearer token. Works regardless of AUTH_MODE.
        .route("/auth/login", post(handlers::login_token))
        // POST /api/login
        // Session login; sets the `sid` cookie.
        .route("/login", post(handlers::session_login))
        // POST /api/logout
        // Always 200, even without a live session.
        .route("/logout", post(handlers::logout))
        // GET /api/articles
        .route("/articles", get(handlers::list_published_articles))
        // GET /api/articles/{slug}
        .route("/articles/{slug}", get(handlers::get_article_by_slug))
        // GET /api/pages/{key}
        .route("/pages/{key}", get(handlers::get_page))
}
