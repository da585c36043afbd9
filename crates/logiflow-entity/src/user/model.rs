//! User entity model.

use serde::{Deserialize, Serialize};

use super::role::UserRole;

/// The signed-in dashboard user.
///
/// Serialized with the same field names the web dashboard persisted under
/// the `user` storage key, so stored sessions stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user identifier.
    pub id: i64,
    /// National identity number (cédula), also the login name.
    pub cedula: String,
    /// Human-readable display name.
    #[serde(rename = "nombre")]
    pub display_name: String,
    /// Contact email.
    pub email: String,
    /// Dashboard role.
    #[serde(rename = "rol")]
    pub role: UserRole,
    /// Operating zone (supervisors and couriers).
    #[serde(rename = "zoneId", default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// Fleet type (couriers).
    #[serde(rename = "fleetType", default, skip_serializing_if = "Option::is_none")]
    pub fleet_type: Option<String>,
}

impl User {
    /// Build a user from the identity string and role when the backend does
    /// not return a profile.
    ///
    /// The display name falls back to the role's name and the email is
    /// derived from the role.
    pub fn synthesize(cedula: &str, role: UserRole, display_name: Option<String>) -> Self {
        Self {
            id: cedula.parse().unwrap_or(1),
            cedula: cedula.to_string(),
            display_name: display_name.unwrap_or_else(|| role.display_name().to_string()),
            email: format!("{}@logiflow.com", role.as_str().to_lowercase()),
            role,
            zone_id: None,
            fleet_type: None,
        }
    }

    /// Attach zone and fleet information.
    pub fn with_assignment(mut self, zone_id: Option<String>, fleet_type: Option<String>) -> Self {
        self.zone_id = zone_id;
        self.fleet_type = fleet_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_from_role() {
        let user = User::synthesize("1709473852", UserRole::Courier, None);
        assert_eq!(user.id, 1709473852);
        assert_eq!(user.display_name, "Repartidor");
        assert_eq!(user.email, "repartidor@logiflow.com");
        assert_eq!(user.role, UserRole::Courier);
    }

    #[test]
    fn test_stored_shape() {
        let user = User::synthesize("abc", UserRole::Client, Some("Ana".into()))
            .with_assignment(Some("Z1".into()), None);
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["nombre"], "Ana");
        assert_eq!(value["rol"], "CLIENTE");
        assert_eq!(value["zoneId"], "Z1");
        assert!(value.get("fleetType").is_none());
    }
}
