use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use sha2::{Digest, Sha512};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tower_sessions::{
    MemoryStore, SessionManagerLayer, SessionStore,
    cookie::{Key, SameSite},
};
use tracing::{Level, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod password;
pub mod repository;
pub mod site;

pub mod routes;
use routes::{admin, authenticated, public};

use auth::{AuthUser, AuthenticatorState, CredentialState, LocalStrategy};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use memory::InMemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` handlers, served at
/// `/api-docs/openapi.json` with Swagger UI on `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login_token, handlers::current_user,
        handlers::change_password, handlers::session_login, handlers::logout,
        handlers::list_published_articles, handlers::get_article_by_slug,
        handlers::list_all_articles, handlers::create_article, handlers::update_article,
        handlers::delete_article, handlers::get_page, handlers::list_pages,
        handlers::upsert_page
    ),
    components(
        schemas(
            models::Article, models::CreateArticleRequest, models::UpdateArticleRequest,
            models::PageContent, models::UpsertPageRequest, models::Identity,
            models::PublicUser, models::RegisterRequest, models::LoginRequest,
            models::TokenResponse, models::SessionResponse, models::ChangePasswordRequest,
        )
    ),
    tags(
        (name = "law-office-site", description = "Law office site and content API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable container of the application's services. Handlers and extractors
/// pull the pieces they need through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (Postgres or in-memory).
    pub repo: RepositoryState,
    /// The single credential mechanism accepted on protected routes.
    pub authenticator: AuthenticatorState,
    /// Username/password verification used by both login endpoints.
    pub credentials: CredentialState,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the default auth components for `config` around `repo`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            authenticator: auth::authenticator_for(&config),
            credentials: Arc::new(LocalStrategy::new(repo.clone())),
            repo,
            config,
        }
    }
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthenticatorState {
    fn from_ref(app_state: &AppState) -> AuthenticatorState {
        app_state.authenticator.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated and admin routers. Extracting `AuthUser` runs the
/// deployment's `Authenticator`; a failure rejects the request with 401 before any
/// handler executes. The resolved user is cached in the request extensions.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// bootstrap_admin
///
/// Creates the operator account named by `ADMIN_USERNAME` / `ADMIN_PASSWORD` when
/// both are set and the user does not exist yet.
pub async fn bootstrap_admin(repo: &RepositoryState, config: &AppConfig) -> AppResult<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(());
    };

    if repo.get_user_by_username(username).await?.is_some() {
        tracing::debug!(%username, "admin account already present");
        return Ok(());
    }

    let password_hash = password::hash_password(password)?;
    let user = repo
        .create_user(models::NewUser {
            username: username.clone(),
            password_hash,
        })
        .await?;
    tracing::info!(user_id = user.id, %username, "admin account created");
    Ok(())
}

/// create_router
///
/// The full application with an in-memory session store.
pub fn create_router(state: AppState) -> Router {
    create_router_with_store(state, MemoryStore::default())
}

/// create_router_with_store
///
/// Assembles routes, middleware and state around the given session store. The store
/// is created by the caller at startup and lives as long as the router.
pub fn create_router_with_store<Store>(state: AppState, store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let config = state.config.clone();
    let x_request_id = HeaderName::from_static("x-request-id");

    let session_layer = SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.is_production())
        .with_signed(session_key(&config.session_secret));

    // Authenticated and admin routers share the same guard.
    let guard = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let api = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes().route_layer(guard()))
        .nest("/admin", admin::admin_routes().route_layer(guard()));

    let assets = ServeDir::new(Path::new(&config.static_dir).join("assets"));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .nest_service("/assets", assets)
        .fallback(site::client_fallback)
        .with_state(state);

    base_router
        .layer(session_layer)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors_layer(&config))
}

/// Derives the 64-byte cookie signing key from the configured session secret.
fn session_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

/// Any origin locally; a single credentialed origin when `CORS_ORIGIN` is set.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let Some(origin) = &config.cors_origin else {
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(%origin, "CORS_ORIGIN is not a valid header value; CORS disabled");
            CorsLayer::new()
        }
    }
}

/// trace_span_logger
///
/// Span for every request: method, URI and the `x-request-id` set by the layer above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
