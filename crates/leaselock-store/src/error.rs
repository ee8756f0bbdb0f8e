//! Store error types

use thiserror::Error;

/// Errors surfaced by a store backend.
///
/// `ConditionFailed` means the store rejected a guarded write because its
/// condition evaluated false and nothing changed; every other variant means
/// the backend itself misbehaved. Callers rely on that distinction to tell
/// "lost the race" apart from "store is down".
#[derive(Debug, Error)]
pub enum StoreError {
    /// The condition guarding a put or delete evaluated false
    #[error("conditional check failed for key '{0}'")]
    ConditionFailed(String),

    /// The backend could not serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend-specific failure with no dedicated variant
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// True when this error is the guard condition evaluating false rather
    /// than the store failing.
    pub fn is_condition_failure(&self) -> bool {
        matches!(self, StoreError::ConditionFailed(_))
    }
}

// Errors get latched and handed out by value, so they must be cloneable.
// Sources that cannot be cloned degrade to their rendered message.
impl Clone for StoreError {
    fn clone(&self) -> Self {
        match self {
            StoreError::ConditionFailed(key) => StoreError::ConditionFailed(key.clone()),
            StoreError::Unavailable(message) => StoreError::Unavailable(message.clone()),
            StoreError::Other(err) => StoreError::Other(anyhow::anyhow!("{:#}", err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
