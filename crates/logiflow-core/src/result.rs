//! Convenience result type alias for LogiFlow.

use crate::error::AppError;

/// A specialized `Result` type for LogiFlow operations.
pub type AppResult<T> = Result<T, AppError>;
