//! Lock configuration

use std::time::Duration;

/// Configuration for a lease lock.
///
/// The name is the contested resource; two clients compete for the same
/// lock exactly when they use the same name against the same store.
#[derive(Clone, Debug)]
pub struct LockConfig {
    /// Lock name; the store record is keyed by it
    pub name: String,
    /// How long an acquired or renewed lease stays valid
    pub lease_duration: Duration,
    /// Interval between background renewal attempts.
    ///
    /// Must be comfortably shorter than `lease_duration` for the lease to
    /// survive its holder. The client does not enforce this; it logs a
    /// warning at acquire time and otherwise trusts the caller.
    pub heartbeat_period: Duration,
    /// Holder identifier. Leave empty to have the client generate a random
    /// UUID once at construction.
    pub identifier: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            lease_duration: Duration::from_secs(10),
            heartbeat_period: Duration::from_secs(3),
            identifier: String::new(),
        }
    }
}

impl LockConfig {
    /// Create a configuration for the given lock name with default timing
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the lease duration
    pub fn with_lease_duration(mut self, lease_duration: Duration) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    /// Set the interval between renewal attempts
    pub fn with_heartbeat_period(mut self, heartbeat_period: Duration) -> Self {
        self.heartbeat_period = heartbeat_period;
        self
    }

    /// Fix the holder identifier instead of generating one
    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = identifier.to_string();
        self
    }
}
