//! Seams between the session manager and its consumers.

use async_trait::async_trait;

/// Read access to the current bearer credential.
///
/// Implemented by the session manager; consumed by the realtime channel
/// (handshake) and the HTTP clients (`Authorization` header).
pub trait TokenProvider: Send + Sync + std::fmt::Debug + 'static {
    /// The current access token, or `None` when logged out.
    fn access_token(&self) -> Option<String>;
}

/// A cache whose entries belong to the signed-in session.
///
/// Every registered cache is emptied on logout so the next user never sees
/// the previous user's query results.
#[async_trait]
pub trait SessionCache: Send + Sync + std::fmt::Debug + 'static {
    /// Drop every cached entry.
    async fn invalidate_all(&self);
}

/// A fixed token, for tools and tests that already hold a credential.
#[derive(Debug, Clone)]
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}
