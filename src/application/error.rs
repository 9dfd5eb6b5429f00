use crate::domain::ports::StoreError;
use thiserror::Error;

/// Application-level error taxonomy, translated to HTTP statuses at the
/// interface layer.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input: bad cursor, bad body.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Entity absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// Concurrent write lost after bounded retries; carries the document id.
    #[error("document conflict: {0}")]
    Conflict(String),
    /// Wrong document type for a type-specific operation.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    /// Store-path infrastructure failure; surfaces as a 5xx.
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("document not found".to_string()),
            StoreError::Conflict => AppError::Conflict("document conflict".to_string()),
            StoreError::InvalidResponse(msg) | StoreError::Unavailable(msg) => {
                AppError::Store(msg)
            }
        }
    }
}
