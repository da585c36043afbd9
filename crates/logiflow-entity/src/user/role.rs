//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a dashboard user can hold.
///
/// The backend speaks Spanish role names (`CLIENTE`, `REPARTIDOR`, ...);
/// those are the serialized form. English names are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Places and tracks orders.
    #[serde(rename = "CLIENTE", alias = "CLIENT")]
    Client,
    /// Delivers orders.
    #[serde(rename = "REPARTIDOR", alias = "COURIER")]
    Courier,
    /// Oversees operations in a zone.
    #[serde(rename = "SUPERVISOR")]
    Supervisor,
    /// Reads fleet-wide KPIs.
    #[serde(rename = "GERENTE", alias = "MANAGER")]
    Manager,
    /// Full administrator.
    #[serde(rename = "ADMIN")]
    Admin,
}

impl UserRole {
    /// Every role, in privilege order.
    pub const ALL: [UserRole; 5] = [
        Self::Client,
        Self::Courier,
        Self::Supervisor,
        Self::Manager,
        Self::Admin,
    ];

    /// Return the role as the backend's wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENTE",
            Self::Courier => "REPARTIDOR",
            Self::Supervisor => "SUPERVISOR",
            Self::Manager => "GERENTE",
            Self::Admin => "ADMIN",
        }
    }

    /// Human-readable name shown in dashboard headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Client => "Cliente",
            Self::Courier => "Repartidor",
            Self::Supervisor => "Supervisor",
            Self::Manager => "Gerente",
            Self::Admin => "Administrador",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = logiflow_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CLIENTE" | "CLIENT" => Ok(Self::Client),
            "REPARTIDOR" | "COURIER" => Ok(Self::Courier),
            "SUPERVISOR" => Ok(Self::Supervisor),
            "GERENTE" | "MANAGER" => Ok(Self::Manager),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(logiflow_core::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: CLIENTE, REPARTIDOR, SUPERVISOR, GERENTE, ADMIN"
            ))),
        }
    }
}
