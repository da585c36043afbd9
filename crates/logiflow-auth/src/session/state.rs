//! Observable session snapshot.

use serde::{Deserialize, Serialize};

use logiflow_entity::user::{User, UserRole};

/// Tokens and user held by the signed-in dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API and realtime calls.
    pub access_token: Option<String>,
    /// Token exchanged for a new access token.
    pub refresh_token: Option<String>,
    /// The signed-in user.
    pub user: Option<User>,
}

impl Session {
    /// A session is authenticated only with both a token and a user.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    /// Role of the signed-in user.
    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|u| u.role)
    }
}

/// What observers see: the session plus whether a mutation is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Current session.
    pub session: Session,
    /// True during hydration and while a login request is outstanding.
    pub loading: bool,
}

impl SessionState {
    /// The state before hydration has run.
    pub fn initial() -> Self {
        Self {
            session: Session::default(),
            loading: true,
        }
    }

    /// A settled state holding `session`.
    pub fn ready(session: Session) -> Self {
        Self {
            session,
            loading: false,
        }
    }

    /// Shorthand for `session.is_authenticated()`.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    /// False when unauthenticated, otherwise whether the role is listed.
    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        self.is_authenticated() && self.session.role().is_some_and(|r| roles.contains(&r))
    }
}
