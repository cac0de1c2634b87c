use thiserror::Error;

use crate::store::StoreError;

/// Failure at the scope boundary: begin, commit, or deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UowError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("deadline exceeded")]
    DeadlineExceeded,
}
