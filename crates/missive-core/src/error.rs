use missive_store::StoreError;
use thiserror::Error;

/// Typed failures surfaced by every core operation.
///
/// The core performs no retries and no partial-failure recovery; the caller
/// (the request-handling layer) translates these into user-facing responses.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A required field is missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced user or conversation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique field (username, email) is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The underlying storage operation failed or was unreachable.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ChatError::NotFound("record not found".to_string()),
            other => ChatError::Persistence(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatError>;
