use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, put},
};

/// Admin Router Module
///
/// Content management for the dashboard, nested under `/api/admin`. Any
/// authenticated operator may manage content; there are no finer-grained roles.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /api/admin/articles
        // Lists drafts and published articles alike; creates a new article.
        .route(
            "/articles",
            get(handlers::list_all_articles).post(handlers::create_article),
        )
        // PATCH/DELETE /api/admin/articles/{id}
        // Partial update (including the published flag) and removal.
        .route(
            "/articles/{id}",
            patch(handlers::update_article).delete(handlers::delete_article),
        )
        // GET /api/admin/pages
        .route("/pages", get(handlers::list_pages))
        // PUT /api/admin/pages/{key}
        // Creates or replaces the copy shown on a client page.
        .route("/pages/{key}", put(handlers::upsert_page))
}
