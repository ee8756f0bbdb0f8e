//! Store client trait
//!
//! The narrow interface the lock protocol needs from a backend: guarded
//! writes, a point read, a guarded delete, and a consistent filtered count.

use async_trait::async_trait;

use crate::condition::Condition;
use crate::error::Result;
use crate::value::Record;

/// A conditional-write-capable key-value backend.
///
/// Implementations must evaluate each operation's condition atomically with
/// the operation itself: between evaluation and effect, no other write to
/// the same key may interleave. That atomicity is the only concurrency
/// primitive the lock protocol builds on.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Create or extend the record at `key`, guarded by `condition`.
    ///
    /// When the condition holds and a record already exists, the given
    /// attributes are merged into it; attributes the caller did not supply
    /// keep their stored values. When no record exists, the attributes
    /// become the record. A false condition fails with
    /// `StoreError::ConditionFailed` and leaves the store untouched.
    async fn conditional_put(&self, key: &str, record: Record, condition: &Condition) -> Result<()>;

    /// Read the record at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Record>>;

    /// Delete the record at `key`, guarded by `condition`.
    ///
    /// A false condition fails with `StoreError::ConditionFailed` and
    /// leaves the record in place. Deleting a key that has no record
    /// succeeds as a no-op if the condition holds against the absence.
    async fn conditional_delete(&self, key: &str, condition: &Condition) -> Result<()>;

    /// Count records matching `filter`, using the backend's strongest read
    /// consistency.
    ///
    /// `projection` names the attributes the filter touches; backends that
    /// materialize rows in order to count them may fetch only those.
    async fn consistent_count(&self, filter: &Condition, projection: &[&str]) -> Result<usize>;
}
