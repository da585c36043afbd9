//! Parsing of the login response body.
//!
//! Auth service builds disagree on the shape: newer ones answer with a JSON
//! object, older ones with the bare token (quoted or not).

use serde::Deserialize;
use tracing::warn;

use logiflow_entity::user::{User, UserRole};

use crate::error::AuthError;
use crate::token::{TokenClaims, decode_unverified};

/// The object form of a login response.
#[derive(Debug, Clone, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    nombre: Option<String>,
    #[serde(default)]
    zone_id: Option<String>,
    #[serde(default)]
    fleet_type: Option<String>,
}

/// Normalized result of a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    /// Access token.
    pub access_token: String,
    /// Refresh token, when the service issued one.
    pub refresh_token: Option<String>,
    /// User assembled from the response and the token payload.
    pub user: User,
}

/// Turn a 2xx login body into a [`LoginGrant`] for `identity`.
pub fn parse_login_body(identity: &str, body: &str) -> Result<LoginGrant, AuthError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MalformedResponse("empty login response".into()));
    }

    let response = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value::<LoginResponse>(value)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?,
        Ok(serde_json::Value::String(token)) => bare(token),
        Ok(_) | Err(_) => bare(trimmed.to_string()),
    };

    if response.access_token.trim().is_empty() {
        return Err(AuthError::MalformedResponse("empty access token".into()));
    }

    let claims = decode_unverified(&response.access_token).unwrap_or_default();
    let role = resolve_role(response.role.as_deref(), &claims);

    let user = User::synthesize(identity, role, response.nombre).with_assignment(
        response.zone_id.or(claims.zone_id),
        response.fleet_type.or(claims.fleet_type),
    );

    Ok(LoginGrant {
        access_token: response.access_token,
        refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
        user,
    })
}

fn bare(token: String) -> LoginResponse {
    LoginResponse {
        access_token: token.trim().to_string(),
        refresh_token: None,
        role: None,
        nombre: None,
        zone_id: None,
        fleet_type: None,
    }
}

/// Response role, then token role, then `Client`.
fn resolve_role(declared: Option<&str>, claims: &TokenClaims) -> UserRole {
    if let Some(declared) = declared {
        match declared.parse() {
            Ok(role) => return role,
            Err(_) => warn!(role = %declared, "Unknown role in login response"),
        }
    }
    claims.role().unwrap_or_else(|| {
        if let Some(raw) = claims.role.as_deref() {
            warn!(role = %raw, "Unknown role in token, defaulting to client");
        }
        UserRole::Client
    })
}
