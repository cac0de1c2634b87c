use thiserror::Error;

/// Error type for transactional store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed: the stream moved past `expected`.
    #[error("version conflict on {stream}: expected {expected}, found {actual}")]
    Conflict {
        stream: String,
        expected: u64,
        actual: u64,
    },
    /// An inbox row for this (group, message) already exists.
    #[error("message {message_id} already processed by {group}")]
    DuplicateInbox { group: String, message_id: String },
    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("transaction already finished")]
    Finished,
    #[error("no outbox record with sequence {0}")]
    UnknownOutboxRecord(u64),
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
