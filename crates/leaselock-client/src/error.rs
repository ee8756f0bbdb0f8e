//! Lock client error types

use thiserror::Error;

use leaselock_store::StoreError;

/// Errors surfaced by lock operations.
///
/// The first two variants are protocol outcomes, not failures: somebody
/// else holds the lock, or the record to release is no longer this
/// holder's. `RenewalFailed` is terminal for the session that hit it.
#[derive(Clone, Debug, Error)]
pub enum LockError {
    /// The acquire condition was rejected: another holder owns a live lease
    #[error("lock '{name}' not acquired: {source}")]
    NotAcquired {
        name: String,
        #[source]
        source: StoreError,
    },

    /// The release guard was rejected: the record is gone or belongs to
    /// another holder
    #[error("lock '{name}' not released: {source}")]
    NotReleased {
        name: String,
        #[source]
        source: StoreError,
    },

    /// A background renewal failed; the lease must be treated as lost
    #[error("lease renewal for lock '{name}' failed: {source}")]
    RenewalFailed {
        name: String,
        #[source]
        source: StoreError,
    },

    /// A stored record is missing or mistypes a required attribute
    #[error("malformed lock record: {0}")]
    MalformedRecord(String),

    /// Store failure outside the conditional-check protocol
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LockError>;
