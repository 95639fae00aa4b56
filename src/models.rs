use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::AppError;

const MAX_SLUG_LEN: usize = 120;

// --- Core Records (Mapped to Storage) ---

/// User
///
/// An operator account. The password is only ever held as an Argon2id PHC string and
/// this struct is never serialized into a response; see `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for the repository. The hash is computed by the auth layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// Article
///
/// A published or draft article. `slug` is unique and used in public URLs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Article {
    #[ts(type = "number")]
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// A published article must carry every field the public page renders.
    pub fn ensure_publishable(&self) -> Result<(), AppError> {
        if !self.published {
            return Ok(());
        }
        let missing: Vec<&str> = [
            ("slug", self.slug.as_str()),
            ("title", self.title.as_str()),
            ("content", self.content.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "A published article requires: {}",
                missing.join(", ")
            )))
        }
    }
}

/// PageContent
///
/// Editable copy for one of the client pages (home, escritorio, advogado, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageContent {
    pub key: String,
    pub title: String,
    pub content: String,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Identity & Auth Payloads ---

/// Identity
///
/// The user identity asserted by a session or a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct Identity {
    #[ts(type = "number")]
    pub id: i64,
    pub username: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// PublicUser
///
/// The response shape for a user record. Never contains the hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct PublicUser {
    #[ts(type = "number")]
    pub id: i64,
    pub username: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// TokenResponse
///
/// Returned by the bearer login: the signed token and the user it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
    pub user: PublicUser,
}

/// SessionResponse
///
/// Returned by the session login. The credential itself travels in the cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

// --- Article Payloads ---

/// CreateArticleRequest
///
/// Input for `POST /api/admin/articles`. `slug`, `title` and `content` are required;
/// a missing field fails deserialization and a blank one fails validation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateArticleRequest {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub content: String,
    #[serde(default)]
    pub published: bool,
}

/// UpdateArticleRequest
///
/// Partial update for `PATCH /api/admin/articles/{id}`. Absent fields are left as-is;
/// unknown fields are rejected so a typo does not silently no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank"))]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl UpdateArticleRequest {
    /// Applies the provided fields onto `article`, leaving `updated_at` untouched.
    pub fn apply_to(&self, mut article: Article) -> Article {
        if let Some(slug) = &self.slug {
            article.slug = slug.clone();
        }
        if let Some(title) = &self.title {
            article.title = title.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            article.excerpt = Some(excerpt.clone());
        }
        if let Some(content) = &self.content {
            article.content = content.clone();
        }
        if let Some(published) = self.published {
            article.published = published;
        }
        article
    }
}

// --- Page Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct UpsertPageRequest {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

// --- Field Rules ---

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

fn validate_username(value: &str) -> Result<(), ValidationError> {
    let ok = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("may only contain letters, digits, '_', '-' and '.'".into()))
    }
}

/// Slugs (and page keys) are lowercase ASCII words joined by single hyphens.
pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SLUG_LEN
        && value
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if is_valid_slug(value) {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message("must be lowercase letters and digits separated by single hyphens".into()))
    }
}
