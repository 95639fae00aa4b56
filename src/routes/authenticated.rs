use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Account endpoints for the logged-in operator. The router layer above this module
/// runs `auth_middleware`, so every handler here receives a resolved `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/auth/user
        .route("/auth/user", get(handlers::current_user))
        // POST /api/auth/change-password
        .route("/auth/change-password", post(handlers::change_password))
}
