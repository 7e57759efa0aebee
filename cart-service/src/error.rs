//! Error type for cart operations.

use service_core::error::AppError;
use thiserror::Error;

/// Failure outcome of a cart operation.
///
/// Every variant is recoverable; the HTTP layer maps them onto [`AppError`].
#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("persistence failure: {0}")]
    Persistence(anyhow::Error),

    #[error("unexpected failure: {0}")]
    Unexpected(anyhow::Error),
}

impl CartError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CartError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CartError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CartError::Conflict(msg.into())
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CartError::Validation(_) => "validation",
            CartError::NotFound(_) => "not_found",
            CartError::Conflict(_) => "conflict",
            CartError::Persistence(_) => "persistence",
            CartError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<mongodb::error::Error> for CartError {
    fn from(err: mongodb::error::Error) -> Self {
        CartError::Persistence(anyhow::Error::new(err))
    }
}

impl From<mongodb::bson::ser::Error> for CartError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        CartError::Unexpected(anyhow::Error::new(err))
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            CartError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            CartError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            CartError::Persistence(e) => {
                tracing::error!(error = %e, "Persistence failure");
                AppError::DatabaseError(e)
            }
            CartError::Unexpected(e) => {
                tracing::error!(error = %e, "Unexpected failure");
                AppError::InternalError(e)
            }
        }
    }
}
