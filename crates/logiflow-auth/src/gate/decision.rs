//! Protected and public route decisions.

use logiflow_entity::user::UserRole;

use crate::session::SessionState;

/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";
/// Path of the access-denied page.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Outcome for a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The session is still hydrating or logging in; show a placeholder.
    Loading,
    /// Show the route.
    Render,
    /// Send the user to the login page, remembering where they were going.
    RedirectLogin {
        /// The location that was requested.
        from: String,
    },
    /// Signed in, but the role is not allowed here.
    RedirectUnauthorized,
}

/// Outcome for a public route (login, register).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicDecision {
    /// The session is still settling.
    Loading,
    /// Already signed in; leave the public page.
    Redirect(String),
    /// Show the public page.
    Render,
}

/// Decide access to a protected route.
///
/// `required_roles` of `None` admits any signed-in user; `Some(roles)`
/// admits only the listed roles.
pub fn decide(
    state: &SessionState,
    required_roles: Option<&[UserRole]>,
    location: &str,
) -> GateDecision {
    if state.loading {
        return GateDecision::Loading;
    }
    if !state.is_authenticated() {
        return GateDecision::RedirectLogin {
            from: location.to_string(),
        };
    }
    match required_roles {
        Some(roles) if !state.has_role(roles) => GateDecision::RedirectUnauthorized,
        _ => GateDecision::Render,
    }
}

/// Decide whether a public page renders or bounces a signed-in user.
///
/// Signed-in users go back to `from` when known, else to their landing page.
pub fn decide_public(state: &SessionState, from: Option<&str>) -> PublicDecision {
    if state.loading {
        return PublicDecision::Loading;
    }
    match state.session.role() {
        Some(role) if state.is_authenticated() => PublicDecision::Redirect(
            from.filter(|f| !f.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| landing_path(role).to_string()),
        ),
        _ => PublicDecision::Render,
    }
}

/// The dashboard a role lands on after login.
pub fn landing_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Client => "/cliente",
        UserRole::Courier => "/repartidor",
        UserRole::Supervisor => "/supervisor",
        UserRole::Manager | UserRole::Admin => "/gerente",
    }
}
