/// Router Module Index
///
/// Routes are split by access level so the authentication layer is applied per
/// module rather than per handler.

/// Routes accessible without credentials: reads of published content, registration
/// and the login/logout endpoints.
pub mod public;

/// Routes that act on the caller's own account. Guarded by `auth_middleware`.
pub mod authenticated;

/// Content management routes (articles, page copy), nested under `/admin`.
/// Guarded by `auth_middleware`.
pub mod admin;
