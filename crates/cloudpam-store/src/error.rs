use cloudpam_core::error::{Error as CoreError, Kind};

/// The sum-type error every backend returns. `cloudpam_core::Error` is the
/// richer, message-carrying form used above the Store boundary; `StoreError`
/// is the discriminable shape backends construct directly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => CoreError::not_found("not found"),
            StoreError::Conflict(msg) => CoreError::conflict(msg),
            StoreError::Validation(msg) => CoreError::validation(msg),
            StoreError::Unauthenticated(msg) => CoreError::unauthenticated(msg),
            StoreError::Internal(msg) => CoreError::internal(msg),
        }
    }
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        match e.kind {
            Kind::NotFound => StoreError::NotFound,
            Kind::Conflict => StoreError::Conflict(e.message),
            Kind::Validation => StoreError::Validation(e.message),
            Kind::Unauthenticated => StoreError::Unauthenticated(e.message),
            _ => StoreError::Internal(e.message),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
