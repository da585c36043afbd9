//! Backend client errors.

use logiflow_core::error::{AppError, ErrorKind};

/// Errors returned by the order and GraphQL clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No session token is available for the `Authorization` header.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The backend could not be reached or the request timed out.
    #[error("Network failure: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response text, possibly empty.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The GraphQL response had errors and no data.
    #[error("GraphQL error: {0}")]
    GraphQl(String),
}

impl From<ClientError> for AppError {
    fn from(e: ClientError) -> Self {
        let kind = match &e {
            ClientError::NotAuthenticated => ErrorKind::Authentication,
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Status { status: 401, .. } => ErrorKind::Authentication,
            ClientError::Status { status: 403, .. } => ErrorKind::Authorization,
            ClientError::Status { status: 404, .. } => ErrorKind::NotFound,
            ClientError::Status { .. } | ClientError::Decode(_) | ClientError::GraphQl(_) => {
                ErrorKind::Protocol
            }
        };
        AppError::new(kind, e.to_string())
    }
}
