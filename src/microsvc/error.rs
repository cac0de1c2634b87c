//! Error type for handlers and entry points.

use thiserror::Error;

use crate::bus::PublishError;
use crate::repository::RepositoryError;
use crate::store::StoreError;
use crate::uow::UowError;

#[derive(Debug, Error)]
pub enum HandlerError {
    /// No handler registered for this command name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Payload decode / deserialization failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// Illegal state transition or malformed input. Produces no event.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Optimistic concurrency conflict. The caller may retry.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The message was already handled by this consumer group.
    #[error("duplicate message {message_id} for {group}")]
    Duplicate { group: String, message_id: String },
    /// Database or broker unavailable.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("handler error: {0}")]
    Other(String),
}

impl HandlerError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::UnknownCommand(_) => 404,
            HandlerError::DecodeFailed(_) => 400,
            HandlerError::Validation(_) => 422,
            HandlerError::NotFound(_) => 404,
            HandlerError::Conflict(_) => 409,
            HandlerError::Duplicate { .. } => 409,
            HandlerError::Transport(_) => 503,
            HandlerError::DeadlineExceeded => 504,
            HandlerError::Other(_) => 500,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HandlerError::Conflict(_) | HandlerError::Transport(_) | HandlerError::DeadlineExceeded
        )
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::Conflict { .. } => HandlerError::Conflict(message),
            StoreError::DuplicateInbox { group, message_id } => {
                HandlerError::Duplicate { group, message_id }
            }
            StoreError::Unavailable(_) => HandlerError::Transport(message),
            _ => HandlerError::Other(message),
        }
    }
}

impl From<UowError> for HandlerError {
    fn from(err: UowError) -> Self {
        match err {
            UowError::Store(store) => HandlerError::from(store),
            UowError::DeadlineExceeded => HandlerError::DeadlineExceeded,
        }
    }
}

impl From<RepositoryError> for HandlerError {
    fn from(err: RepositoryError) -> Self {
        let message = err.to_string();
        match err {
            RepositoryError::NotFound { .. } => HandlerError::NotFound(message),
            RepositoryError::Conflict { .. } => HandlerError::Conflict(message),
            RepositoryError::Store(store) => HandlerError::from(store),
            _ => HandlerError::Other(message),
        }
    }
}

impl From<PublishError> for HandlerError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::SerializationFailed(msg) => HandlerError::Other(msg),
            other => HandlerError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}
