use crate::{
    AppState,
    auth::{self, AuthUser, SESSION_IDENTITY_KEY},
    error::{AppError, AppResult},
    extract::ValidatedJson,
    models::{
        Article, ChangePasswordRequest, CreateArticleRequest, Identity, LoginRequest, NewUser,
        PageContent, PublicUser, RegisterRequest, SessionResponse, TokenResponse,
        UpdateArticleRequest, UpsertPageRequest, is_valid_slug,
    },
    password,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tower_sessions::Session;

// --- Auth ---

/// register_user
///
/// [Public Route] Creates an operator account. The password is hashed with Argon2id
/// before it reaches storage.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = PublicUser),
        (status = 400, description = "Invalid payload or username taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    if state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already exists".into()));
    }

    let password_hash = password::hash_password(&payload.password)?;
    // The repository re-checks uniqueness atomically; a racing duplicate still fails.
    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login_token
///
/// [Public Route] Verifies credentials and issues a signed bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = state
        .credentials
        .verify(&payload.username, &payload.password)
        .await?;

    let token = auth::issue_token(
        &Identity::from(&user),
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    tracing::info!(user_id = user.id, "bearer token issued");
    Ok(Json(TokenResponse {
        token,
        user: user.into(),
    }))
}

/// current_user
///
/// [Authenticated Route] Echoes the identity resolved from the request's credential.
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "Current identity", body = Identity),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn current_user(auth_user: AuthUser) -> Json<Identity> {
    Json(auth_user.into())
}

/// change_password
///
/// [Authenticated Route] Rotates the caller's password after re-checking the current one.
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is incorrect")
    )
)]
pub async fn change_password(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;

    if !password::verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }

    let new_hash = password::hash_password(&payload.new_password)?;
    if !state.repo.update_password(id, new_hash).await? {
        return Err(AppError::Unauthorized("Unknown user".into()));
    }

    tracing::info!(user_id = id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// session_login
///
/// [Public Route] Verifies credentials through the configured strategy and binds the
/// identity to a fresh server-side session (the id is rotated on login).
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn session_login(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<SessionResponse>> {
    let user = state
        .credentials
        .verify(&payload.username, &payload.password)
        .await?;

    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session rotate failed: {e}")))?;
    session
        .insert(SESSION_IDENTITY_KEY, Identity::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;

    tracing::info!(user_id = user.id, "session established");
    Ok(Json(SessionResponse { user: user.into() }))
}

/// logout
///
/// [Public Route] Destroys the server-side session. Previously issued bearer tokens
/// stay valid until they expire.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(session: Session) -> AppResult<Json<Value>> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    Ok(Json(json!({ "message": "Logged out" })))
}

// --- Articles ---

/// list_published_articles
///
/// [Public Route] Every published article, newest first. Drafts are filtered in the
/// repository query, never here.
#[utoipa::path(
    get,
    path = "/api/articles",
    responses((status = 200, description = "Published articles", body = [Article]))
)]
pub async fn list_published_articles(State(state): State<AppState>) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(state.repo.list_articles(true).await?))
}

/// get_article_by_slug
///
/// [Public Route] A single published article. Drafts are indistinguishable from
/// unknown slugs.
#[utoipa::path(
    get,
    path = "/api/articles/{slug}",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Found", body = Article),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Article>> {
    match state.repo.get_article_by_slug(&slug).await? {
        Some(article) if article.published => Ok(Json(article)),
        _ => Err(AppError::NotFound("Article not found".into())),
    }
}

/// list_all_articles
///
/// [Admin Route] Every article, drafts included.
#[utoipa::path(
    get,
    path = "/api/admin/articles",
    responses((status = 200, description = "All articles", body = [Article]))
)]
pub async fn list_all_articles(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Article>>> {
    Ok(Json(state.repo.list_articles(false).await?))
}

/// create_article
///
/// [Admin Route] Validates and persists a new article. Nothing is written when
/// validation fails.
#[utoipa::path(
    post,
    path = "/api/admin/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 200, description = "Created", body = Article),
        (status = 400, description = "Invalid payload or slug taken")
    )
)]
pub async fn create_article(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateArticleRequest>,
) -> AppResult<Json<Article>> {
    let article = state.repo.create_article(payload).await?;
    tracing::info!(article_id = article.id, slug = %article.slug, by = %username, "article created");
    Ok(Json(article))
}

/// update_article
///
/// [Admin Route] Partial update. The merged result must still satisfy the published
/// invariant before anything is written.
#[utoipa::path(
    patch,
    path = "/api/admin/articles/{id}",
    params(("id" = i64, Path, description = "Article id")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_article(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateArticleRequest>,
) -> AppResult<Json<Article>> {
    let not_found = || AppError::NotFound("Article not found".into());

    let existing = state.repo.get_article(id).await?.ok_or_else(not_found)?;
    payload.apply_to(existing).ensure_publishable()?;

    let article = state
        .repo
        .update_article(id, payload)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(article_id = id, published = article.published, by = %username, "article updated");
    Ok(Json(article))
}

/// delete_article
///
/// [Admin Route] Removes an article.
#[utoipa::path(
    delete,
    path = "/api/admin/articles/{id}",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_article(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if state.repo.delete_article(id).await? {
        tracing::info!(article_id = id, by = %username, "article deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Article not found".into()))
    }
}

// --- Page content ---

/// get_page
///
/// [Public Route] Editable copy for one client page.
#[utoipa::path(
    get,
    path = "/api/pages/{key}",
    params(("key" = String, Path, description = "Page key, e.g. `escritorio`")),
    responses(
        (status = 200, description = "Found", body = PageContent),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<PageContent>> {
    state
        .repo
        .get_page(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Page not found".into()))
}

#[utoipa::path(
    get,
    path = "/api/admin/pages",
    responses((status = 200, description = "All pages", body = [PageContent]))
)]
pub async fn list_pages(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PageContent>>> {
    Ok(Json(state.repo.list_pages().await?))
}

/// upsert_page
///
/// [Admin Route] Creates or replaces the copy of one page.
#[utoipa::path(
    put,
    path = "/api/admin/pages/{key}",
    params(("key" = String, Path, description = "Page key")),
    request_body = UpsertPageRequest,
    responses(
        (status = 200, description = "Saved", body = PageContent),
        (status = 400, description = "Invalid key or payload")
    )
)]
pub async fn upsert_page(
    AuthUser { username, .. }: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpsertPageRequest>,
) -> AppResult<Json<PageContent>> {
    if !is_valid_slug(&key) {
        return Err(AppError::Validation(
            "Page key must be lowercase letters and digits separated by single hyphens".into(),
        ));
    }
    let page = state.repo.upsert_page(&key, payload).await?;
    tracing::info!(page = %page.key, by = %username, "page content saved");
    Ok(Json(page))
}
