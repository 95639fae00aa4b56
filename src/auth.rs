use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    config::{AppConfig, AuthMode},
    error::{AppError, AppResult},
    models::{Identity, User},
    password,
    repository::RepositoryState,
};

/// Session key under which the logged-in `Identity` is stored.
pub const SESSION_IDENTITY_KEY: &str = "identity";

/// Claims
///
/// Payload of the HS256 bearer token. `sub` and `username` are the identity; `exp`
/// is enforced on every verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id, for audit trails.
    pub jti: String,
}

/// Signs a bearer token for `identity`, valid for `ttl_hours`.
pub fn issue_token(identity: &Identity, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: identity.id,
        username: identity.username.clone(),
        iat: now,
        exp: now + ttl_hours * 3600,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Verifies signature and expiry, returning the embedded identity.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Identity> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".into()),
            _ => AppError::Unauthorized("Invalid token".into()),
        })?;

    Ok(Identity {
        id: data.claims.sub,
        username: data.claims.username,
    })
}

// --- Authenticator ---

/// Authenticator
///
/// Turns the parts of an incoming request into an `Identity`. Exactly one
/// implementation is installed per deployment (see `AuthMode`), so every protected
/// route shares the same credential semantics.
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn mode(&self) -> AuthMode;

    /// Fails with `AppError::Unauthorized` when no valid credential is present.
    async fn authenticate(&self, parts: &mut Parts) -> AppResult<Identity>;
}

pub type AuthenticatorState = Arc<dyn Authenticator>;

/// Builds the authenticator selected by `AUTH_MODE`.
pub fn authenticator_for(config: &AppConfig) -> AuthenticatorState {
    match config.auth_mode {
        AuthMode::Token => Arc::new(BearerAuthenticator::new(config.jwt_secret.clone())),
        AuthMode::Session => Arc::new(SessionAuthenticator),
    }
}

/// BearerAuthenticator
///
/// Stateless: accepts `Authorization: Bearer <jwt>` signed with the configured secret.
pub struct BearerAuthenticator {
    secret: String,
}

impl BearerAuthenticator {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    fn mode(&self) -> AuthMode {
        AuthMode::Token
    }

    async fn authenticate(&self, parts: &mut Parts) -> AppResult<Identity> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;

        verify_token(token, &self.secret)
    }
}

/// SessionAuthenticator
///
/// Reads the identity stored by the session login. Requires the session layer that
/// `create_router_with_store` installs.
pub struct SessionAuthenticator;

#[async_trait]
impl Authenticator for SessionAuthenticator {
    fn mode(&self) -> AuthMode {
        AuthMode::Session
    }

    async fn authenticate(&self, parts: &mut Parts) -> AppResult<Identity> {
        let session = Session::from_request_parts(parts, &())
            .await
            .map_err(|(_, msg)| AppError::Internal(format!("session unavailable: {msg}")))?;

        session
            .get::<Identity>(SESSION_IDENTITY_KEY)
            .await
            .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?
            .ok_or_else(|| AppError::Unauthorized("Not logged in".into()))
    }
}

// --- Credential verification ---

/// CredentialStrategy
///
/// Pluggable username/password check shared by both login endpoints.
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    /// Returns the matching user, or `AppError::Unauthorized` for an unknown user or
    /// a wrong password. The two cases are indistinguishable to the caller.
    async fn verify(&self, username: &str, password: &str) -> AppResult<User>;
}

pub type CredentialState = Arc<dyn CredentialStrategy>;

/// LocalStrategy
///
/// Verifies against the Argon2id hash stored in the repository.
pub struct LocalStrategy {
    repo: RepositoryState,
}

impl LocalStrategy {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CredentialStrategy for LocalStrategy {
    async fn verify(&self, username: &str, password: &str) -> AppResult<User> {
        let invalid = || AppError::Unauthorized("Invalid username or password".into());

        let Some(user) = self.repo.get_user_by_username(username).await? else {
            tracing::info!(%username, "login rejected: unknown user");
            return Err(invalid());
        };

        if password::verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            tracing::info!(%username, "login rejected: wrong password");
            Err(invalid())
        }
    }
}

// --- Extractor ---

/// AuthUser
///
/// The resolved identity of an authenticated request. Using it as a handler argument
/// (or through `auth_middleware`) rejects the request with 401 unless the deployment's
/// authenticator accepts it and the user still exists.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthenticatorState: FromRef<S>,
    RepositoryState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let authenticator = AuthenticatorState::from_ref(state);
        let repo = RepositoryState::from_ref(state);

        let identity = authenticator.authenticate(parts).await?;

        // A credential for a user that no longer exists is not honoured.
        let user = repo
            .get_user(identity.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;

        let auth_user = AuthUser {
            id: user.id,
            username: user.username,
        };
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}

impl From<AuthUser> for Identity {
    fn from(user: AuthUser) -> Self {
        Identity {
            id: user.id,
            username: user.username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn alice() -> Identity {
        Identity {
            id: 7,
            username: "alice".into(),
        }
    }

    #[test]
    fn token_round_trips_identity() {
        let token = issue_token(&alice(), SECRET, 1).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap(), alice());
    }

    #[test]
    fn token_with_other_secret_is_rejected() {
        let token = issue_token(&alice(), SECRET, 1).unwrap();
        assert!(matches!(
            verify_token(&token, "another-secret"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the default 60 second leeway.
        let token = issue_token(&alice(), SECRET, -1).unwrap();
        match verify_token(&token, SECRET) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token expired"),
            other => panic!("expected expiry rejection, got {other:?}"),
        }
    }

    #[test]
    fn authenticator_follows_auth_mode() {
        let mut config = AppConfig::default();
        assert_eq!(authenticator_for(&config).mode(), AuthMode::Token);
        config.auth_mode = AuthMode::Session;
        assert_eq!(authenticator_for(&config).mode(), AuthMode::Session);
    }
}
