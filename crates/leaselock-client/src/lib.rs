//! Leaselock Client - lease-based mutual exclusion over conditional-write stores
//!
//! A [`LeaseLock`] competes for a named record in a shared store. Whoever
//! writes the record first owns the lock for a lease duration; a background
//! heartbeat task renews the lease until the holder releases or the task
//! hits an error. Competitors take over the moment the lease expires.
//!
//! - **Config**: lock name, lease duration, heartbeat period, identifier
//! - **Record**: the stored lock record and its attribute codec
//! - **Lock**: acquire / release / has_lock / examine and friends
//! - **Errors**: what went wrong, and whether it was a race or a failure
//!
//! The guarantees are exactly those of a lease: mutual exclusion holds as
//! long as holders only act while their lease is live and clocks do not
//! drift wildly across competitors. There is no fencing token; a stalled
//! holder whose lease expired can still fire a stale write at resources the
//! lock was guarding. Use it to avoid duplicated work, not to protect
//! invariants that must never break.

pub mod config;
pub mod error;
pub mod lock;
pub mod record;

mod heartbeat;

pub use config::LockConfig;
pub use error::{LockError, Result};
pub use lock::LeaseLock;
pub use record::LockRecord;
