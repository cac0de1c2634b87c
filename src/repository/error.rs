use thiserror::Error;

use crate::entity::PayloadError;
use crate::router::DispatchError;
use crate::store::StoreError;

/// Error type for aggregate repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Neither events nor a snapshot exist for the aggregate.
    #[error("{aggregate_type} {id} not found")]
    NotFound {
        aggregate_type: &'static str,
        id: String,
    },
    /// The stream advanced past the version the aggregate was loaded at.
    #[error("concurrency conflict on {stream}: expected version {expected}, found {actual}")]
    Conflict {
        stream: String,
        expected: u64,
        actual: u64,
    },
    #[error("replay failed: {0}")]
    Replay(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("domain event dispatch failed: {0}")]
    Dispatch(#[source] DispatchError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                stream,
                expected,
                actual,
            } => RepositoryError::Conflict {
                stream,
                expected,
                actual,
            },
            other => RepositoryError::Store(other),
        }
    }
}

impl From<DispatchError> for RepositoryError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Outbox(store) => RepositoryError::from(store),
            other => RepositoryError::Dispatch(other),
        }
    }
}
