//! Convenience result type alias for Picket.

use crate::error::AppError;

/// A specialized `Result` type for Picket operations.
pub type AppResult<T> = Result<T, AppError>;
