//! Leaselock Store - conditional-write key-value store abstraction
//!
//! This crate defines the storage boundary the lock client talks through:
//!
//! - **Values**: typed attribute values and the record representation
//! - **Conditions**: server-evaluated predicates guarding writes and deletes
//! - **Client trait**: the four operations every backend must provide
//! - **Memory backend**: an in-process store for tests and single-process use
//!
//! Any backend with atomic conditional writes (DynamoDB-style tables, SQL
//! with compare-and-set updates, etc.) can sit behind [`StoreClient`]; the
//! lock protocol never relies on anything stronger.

pub mod client;
pub mod condition;
pub mod error;
pub mod memory;
pub mod value;

pub use client::StoreClient;
pub use condition::Condition;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use value::{AttrValue, Record};
