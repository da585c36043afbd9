//! Auth service request/response contract.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use logiflow_entity::user::UserRole;

use crate::error::AuthError;

pub use self::http::HttpAuthApi;

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// The cédula.
    pub username: String,
    /// Plain password.
    pub password: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// National identity number.
    pub cedula: String,
    /// Display name.
    pub nombre: String,
    /// Plain password.
    pub password: String,
    /// Requested role.
    pub rol: UserRole,
}

/// Body of `POST /api/auth/token/refresh`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    /// The stored refresh token.
    pub refresh_token: String,
}

/// Successful refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    /// New access token.
    pub access_token: String,
    /// Usually `"Bearer"`.
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Transport to the auth service.
///
/// Implementations map non-2xx answers to [`AuthError::InvalidCredentials`]
/// and transport failures to [`AuthError::NetworkFailure`].
#[async_trait]
pub trait AuthApi: Send + Sync + std::fmt::Debug + 'static {
    /// Submit credentials. Returns the raw 2xx body; its shape varies
    /// between auth service builds.
    async fn login(&self, request: &LoginRequest) -> Result<String, AuthError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, AuthError>;

    /// Create an account.
    async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError>;
}

/// Pull a human-readable message out of an error body.
///
/// JSON bodies contribute their `message` (or `error`) field; other
/// non-empty text is used as is.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string),
        Ok(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}
