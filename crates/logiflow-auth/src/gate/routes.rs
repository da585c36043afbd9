//! The dashboard route table.

use logiflow_entity::user::UserRole;

use super::decision::{
    GateDecision, LOGIN_PATH, PublicDecision, UNAUTHORIZED_PATH, decide, decide_public,
};
use crate::session::SessionState;

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Login-style page; signed-in users are bounced to their dashboard.
    Public,
    /// Signed-in users with one of the listed roles.
    Protected(&'static [UserRole]),
    /// Anyone.
    Open,
}

/// What the caller should do for a requested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Wait for the session to settle.
    Loading,
    /// Show the page at `path`.
    Render(String),
    /// Navigate to `to`; `from` is the originally requested location.
    Redirect {
        /// Target path.
        to: String,
        /// Where the user was heading, for the login page to return to.
        from: Option<String>,
    },
}

/// Path-to-access mapping.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<(&'static str, RouteAccess)>,
    fallback: &'static str,
}

const SUPERVISION_ROLES: &[UserRole] = &[UserRole::Supervisor, UserRole::Manager, UserRole::Admin];
const MANAGEMENT_ROLES: &[UserRole] = &[UserRole::Manager, UserRole::Admin];

impl RouteTable {
    /// The LogiFlow dashboard routes. `/` and unknown paths go to `/login`.
    pub fn dashboard() -> Self {
        Self {
            routes: vec![
                (LOGIN_PATH, RouteAccess::Public),
                ("/register", RouteAccess::Public),
                ("/cliente", RouteAccess::Protected(&[UserRole::Client])),
                ("/repartidor", RouteAccess::Protected(&[UserRole::Courier])),
                ("/supervisor", RouteAccess::Protected(SUPERVISION_ROLES)),
                ("/gerente", RouteAccess::Protected(MANAGEMENT_ROLES)),
                (UNAUTHORIZED_PATH, RouteAccess::Open),
            ],
            fallback: LOGIN_PATH,
        }
    }

    /// Access rule for `path`, ignoring any query string or trailing slash.
    pub fn access(&self, path: &str) -> Option<RouteAccess> {
        let path = normalize(path);
        self.routes
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, access)| *access)
    }

    /// Every registered path with its rule.
    pub fn routes(&self) -> impl Iterator<Item = (&'static str, RouteAccess)> + '_ {
        self.routes.iter().copied()
    }

    /// Resolve a navigation request against the session.
    ///
    /// `from` is the location remembered by an earlier login redirect.
    pub fn resolve(&self, state: &SessionState, path: &str, from: Option<&str>) -> Navigation {
        let Some(access) = self.access(path) else {
            return Navigation::Redirect {
                to: self.fallback.to_string(),
                from: None,
            };
        };

        let path = normalize(path).to_string();
        match access {
            RouteAccess::Open => Navigation::Render(path),
            RouteAccess::Public => match decide_public(state, from) {
                PublicDecision::Loading => Navigation::Loading,
                PublicDecision::Redirect(to) => Navigation::Redirect { to, from: None },
                PublicDecision::Render => Navigation::Render(path),
            },
            RouteAccess::Protected(roles) => match decide(state, Some(roles), &path) {
                GateDecision::Loading => Navigation::Loading,
                GateDecision::Render => Navigation::Render(path),
                GateDecision::RedirectLogin { from } => Navigation::Redirect {
                    to: LOGIN_PATH.to_string(),
                    from: Some(from),
                },
                GateDecision::RedirectUnauthorized => Navigation::Redirect {
                    to: UNAUTHORIZED_PATH.to_string(),
                    from: None,
                },
            },
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::dashboard()
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
