use std::env;

const LOCAL_JWT_SECRET: &str = "local-dev-jwt-secret-change-me";
const LOCAL_SESSION_SECRET: &str = "local-dev-session-secret-change-me";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared (immutably) through `AppState`, where handlers and the auth layer pull it
/// out via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Production turns on Secure cookies and JSON logs.
    pub env: Env,
    // HMAC secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // Secret used to sign the session cookie.
    pub session_secret: String,
    // Which Authenticator gates the protected routes.
    pub auth_mode: AuthMode,
    // Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    // Root of the built client bundle (index.html + assets/).
    pub static_dir: String,
    pub token_ttl_hours: i64,
    // Allowed browser origin for credentialed CORS. `None` allows any origin.
    pub cors_origin: Option<String>,
    // Optional operator account created at startup if missing.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

/// Env
///
/// Runtime context. Switches cookie hardening, log format and secret strictness.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AuthMode
///
/// Selects the single credential mechanism accepted on protected routes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AuthMode {
    /// `Authorization: Bearer <jwt>`
    Token,
    /// Cookie-backed server session.
    Session,
}

impl AuthMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" | "bearer" | "jwt" => Some(AuthMode::Token),
            "session" | "cookie" => Some(AuthMode::Session),
            _ => None,
        }
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// A non-panicking configuration for tests: local mode, token auth, in-memory storage.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            auth_mode: AuthMode::Token,
            database_url: None,
            bind_addr: "127.0.0.1:0".to_string(),
            static_dir: "./public".to_string(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
            cors_origin: None,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics when a secret or the database URL is missing in production, or when
    /// `AUTH_MODE` / `TOKEN_TTL_HOURS` hold unparseable values. The process must not
    /// start with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (jwt_secret, session_secret, database_url) = match env {
            Env::Production => (
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
                env::var("SESSION_SECRET")
                    .expect("FATAL: SESSION_SECRET must be set in production."),
                Some(
                    env::var("DATABASE_URL")
                        .expect("FATAL: DATABASE_URL must be set in production."),
                ),
            ),
            Env::Local => (
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                env::var("SESSION_SECRET").unwrap_or_else(|_| LOCAL_SESSION_SECRET.to_string()),
                non_empty_var("DATABASE_URL"),
            ),
        };

        let auth_mode = match non_empty_var("AUTH_MODE") {
            Some(raw) => AuthMode::parse(&raw)
                .unwrap_or_else(|| panic!("FATAL: AUTH_MODE must be 'token' or 'session', got '{raw}'")),
            None => AuthMode::Token,
        };

        let token_ttl_hours = match non_empty_var("TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse()
                .expect("FATAL: TOKEN_TTL_HOURS must be a whole number of hours"),
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        Self {
            env,
            jwt_secret,
            session_secret,
            auth_mode,
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./public".to_string()),
            token_ttl_hours,
            cors_origin: non_empty_var("CORS_ORIGIN"),
            admin_username: non_empty_var("ADMIN_USERNAME"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == Env::Production
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
