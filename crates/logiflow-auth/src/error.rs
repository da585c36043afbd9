//! Session and registration error types.

use logiflow_core::error::{AppError, ErrorKind};

/// Fallback message when the auth service rejects a login without text.
pub const DEFAULT_LOGIN_FAILURE: &str = "Credenciales inválidas";

/// Fallback message when the auth service rejects a registration without text.
pub const DEFAULT_REGISTER_FAILURE: &str =
    "Error al registrar. La cédula podría ya estar registrada.";

/// Errors raised by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The auth service answered with a non-success status.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The auth service could not be reached.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The auth service answered 2xx with an unusable body.
    #[error("Malformed auth response: {0}")]
    MalformedResponse(String),

    /// The durable token store could not be written.
    #[error("Session persistence failed: {0}")]
    Persistence(String),

    /// The operation requires a signed-in session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A local form check failed before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Local registration form failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The cédula failed the province or check-digit test.
    #[error("La cédula ingresada no es válida")]
    InvalidCedula,

    /// The password is shorter than the minimum.
    #[error("La contraseña debe tener al menos {min} caracteres")]
    PasswordTooShort {
        /// Minimum accepted length.
        min: usize,
    },

    /// The password and its confirmation differ.
    #[error("Las contraseñas no coinciden")]
    PasswordMismatch,

    /// The trimmed display name is too short.
    #[error("El nombre debe tener al menos {min} caracteres")]
    NameTooShort {
        /// Minimum accepted length.
        min: usize,
    },
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let kind = match &e {
            AuthError::InvalidCredentials(_) | AuthError::NotAuthenticated => {
                ErrorKind::Authentication
            }
            AuthError::NetworkFailure(_) => ErrorKind::Network,
            AuthError::MalformedResponse(_) => ErrorKind::Protocol,
            AuthError::Persistence(_) => ErrorKind::Storage,
            AuthError::Validation(_) => ErrorKind::Validation,
        };
        AppError::new(kind, e.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::validation(e.to_string())
    }
}
