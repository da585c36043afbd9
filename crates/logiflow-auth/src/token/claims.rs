//! JWT claims issued by the LogiFlow auth service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use logiflow_entity::user::UserRole;

/// Claims payload carried by access and refresh tokens.
///
/// Every field is optional on input; tokens minted by older auth service
/// builds omit the zone and fleet claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user's cédula.
    #[serde(default)]
    pub sub: Option<String>,
    /// Role wire name (`CLIENTE`, `REPARTIDOR`, ...).
    #[serde(default)]
    pub role: Option<String>,
    /// Space separated OAuth-style scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// Operating zone.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Fleet type for couriers.
    #[serde(default)]
    pub fleet_type: Option<String>,
    /// `"refresh"` on refresh tokens, absent on access tokens.
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiration timestamp (seconds since epoch).
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Parse the role claim, if present and recognized.
    pub fn role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    /// Whether this is a refresh token.
    pub fn is_refresh(&self) -> bool {
        self.token_type.as_deref() == Some("refresh")
    }

    /// Returns the expiration, if the token carries one.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Checks whether this token has expired. Tokens without `exp` never do.
    pub fn is_expired(&self) -> bool {
        self.exp.is_some_and(|exp| Utc::now().timestamp() >= exp)
    }

    /// Returns the remaining TTL in seconds (0 if expired or unknown).
    pub fn remaining_ttl_seconds(&self) -> u64 {
        let Some(exp) = self.exp else { return 0 };
        let remaining = exp - Utc::now().timestamp();
        if remaining > 0 { remaining as u64 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        let claims = TokenClaims {
            role: Some("supervisor".into()),
            ..Default::default()
        };
        assert_eq!(claims.role(), Some(UserRole::Supervisor));

        let unknown = TokenClaims {
            role: Some("DESPACHADOR".into()),
            ..Default::default()
        };
        assert_eq!(unknown.role(), None);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now().timestamp();
        let live = TokenClaims {
            exp: Some(now + 600),
            ..Default::default()
        };
        assert!(!live.is_expired());
        assert!(live.remaining_ttl_seconds() > 590);

        let dead = TokenClaims {
            exp: Some(now - 1),
            ..Default::default()
        };
        assert!(dead.is_expired());
        assert_eq!(dead.remaining_ttl_seconds(), 0);

        assert!(!TokenClaims::default().is_expired());
        assert!(TokenClaims::default().expires_at().is_none());
    }
}
