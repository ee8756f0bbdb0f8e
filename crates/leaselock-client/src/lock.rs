//! Lease lock client
//!
//! [`LeaseLock`] races competitors for a named record in a conditional-write
//! store. One conditional put decides ownership; a background task renews
//! the lease every heartbeat period until the holder releases, and
//! competitors take over the moment a lease goes stale.

use std::sync::Arc;

use leaselock_store::{AttrValue, Condition, StoreClient};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LockConfig;
use crate::error::{LockError, Result};
use crate::heartbeat::{self, HeartbeatSession};
use crate::record::{self, ATTR_EXPIRY, ATTR_IDENTIFIER, ATTR_KEY, LockRecord};

/// Lease-based mutual-exclusion lock over a conditional-write store.
///
/// Cloning hands out another handle to the same lock session; handles can
/// be shared across tasks freely.
#[derive(Clone)]
pub struct LeaseLock {
    core: Arc<LockCore>,
}

/// Everything the caller-facing handle and the renewal task share.
pub(crate) struct LockCore {
    pub(crate) store: Arc<dyn StoreClient>,
    pub(crate) config: LockConfig,
    pub(crate) identifier: String,
    pub(crate) session: HeartbeatSession,
}

impl LeaseLock {
    /// Create a lock client for `config` backed by `store`.
    ///
    /// An empty `config.identifier` is replaced by a random UUID, fixed for
    /// the lifetime of this client. Two clients sharing an identifier are
    /// the same holder as far as the protocol is concerned.
    pub fn new(store: Arc<dyn StoreClient>, config: LockConfig) -> Self {
        let identifier = if config.identifier.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            config.identifier.clone()
        };
        Self {
            core: Arc::new(LockCore {
                store,
                config,
                identifier,
                session: HeartbeatSession::default(),
            }),
        }
    }

    /// The lock name this client competes for.
    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    /// The holder identifier this client competes with.
    pub fn identifier(&self) -> &str {
        &self.core.identifier
    }

    /// Try to acquire the lock.
    ///
    /// Issues a single conditional write that succeeds when no record
    /// exists, the recorded lease has expired, or this client already holds
    /// the lock. On success a background heartbeat task keeps the lease
    /// renewed until [`release`](Self::release) or the first renewal error.
    ///
    /// There is no retry: losing the race returns
    /// [`LockError::NotAcquired`] carrying the store's condition-check
    /// rejection, and the caller decides when to try again.
    pub async fn acquire(&self) -> Result<()> {
        let core = &self.core;
        debug!(
            "Attempting to acquire lock '{}' for {:?}",
            core.config.name, core.config.lease_duration
        );

        if core.config.heartbeat_period >= core.config.lease_duration {
            warn!(
                "Heartbeat period {:?} is not shorter than lease duration {:?} for lock '{}'; the lease can lapse between renewals",
                core.config.heartbeat_period, core.config.lease_duration, core.config.name
            );
        }

        // Re-acquiring while the session is healthily renewing just
        // re-asserts the lease; the tenure and its heartbeat task carry on.
        // A task that was asked to stop, or is exiting after a failed
        // renewal, cannot carry the tenure: it is about to stop renewing no
        // matter what this acquire does, so it gets joined and replaced.
        let resumed = core.session.renewing();
        if !resumed {
            // See any winding-down task out first, so the old loop cannot
            // interleave with the fresh tenure's write or session reset.
            self.wait_heartbeat_stopped().await;
        }
        let heartbeats = if resumed { core.session.heartbeats() } else { 0 };

        if let Err(source) = core.write_record(heartbeats).await {
            if source.is_condition_failure() {
                core.diagnostic_read("acquire rejected").await;
                return Err(LockError::NotAcquired {
                    name: core.config.name.clone(),
                    source,
                });
            }
            return Err(source.into());
        }

        if !resumed {
            core.session.begin();
            let task_core = Arc::clone(core);
            core.session
                .install_task(|| tokio::spawn(heartbeat::renewal_loop(task_core)));
        }

        debug!(
            "Acquired lock '{}' as holder '{}'",
            core.config.name, core.identifier
        );
        Ok(())
    }

    /// Release the lock.
    ///
    /// Stops the heartbeat task, waits for it to wind down, then deletes
    /// the record. The delete is guarded so it can only remove this
    /// holder's own record: if the lease lapsed and someone else took over,
    /// their lock is left alone and [`LockError::NotReleased`] comes back.
    pub async fn release(&self) -> Result<()> {
        let core = &self.core;
        debug!("Releasing lock '{}'", core.config.name);

        core.session.request_stop();
        self.wait_heartbeat_stopped().await;

        let guard = Condition::And(vec![
            Condition::Eq(ATTR_KEY.to_string(), AttrValue::S(core.config.name.clone())),
            Condition::Eq(
                ATTR_IDENTIFIER.to_string(),
                AttrValue::S(core.identifier.clone()),
            ),
        ]);
        match core.store.conditional_delete(&core.config.name, &guard).await {
            Ok(()) => {
                debug!("Released lock '{}'", core.config.name);
                Ok(())
            }
            Err(source) if source.is_condition_failure() => Err(LockError::NotReleased {
                name: core.config.name.clone(),
                source,
            }),
            Err(source) => Err(source.into()),
        }
    }

    /// Check whether this holder currently owns a live lease.
    ///
    /// Asks the store for a strongly consistent count of records matching
    /// this lock's name, this client's identifier, and an expiry still in
    /// the future. The answer reflects the stored record only; renewal
    /// health is a separate signal, polled via
    /// [`lock_error`](Self::lock_error).
    pub async fn has_lock(&self) -> Result<bool> {
        let core = &self.core;
        let filter = Condition::And(vec![
            Condition::Eq(ATTR_KEY.to_string(), AttrValue::S(core.config.name.clone())),
            Condition::Gt(ATTR_EXPIRY.to_string(), AttrValue::N(record::now_nanos())),
            Condition::Eq(
                ATTR_IDENTIFIER.to_string(),
                AttrValue::S(core.identifier.clone()),
            ),
        ]);
        let count = core
            .store
            .consistent_count(&filter, &[ATTR_KEY, ATTR_IDENTIFIER, ATTR_EXPIRY])
            .await?;
        Ok(count > 0)
    }

    /// The first error the background renewal task hit, if any.
    ///
    /// A `Some` means the session stopped renewing and the lease is aging
    /// out; the holder should stop relying on the lock. Cleared by the next
    /// successful [`acquire`](Self::acquire).
    pub fn lock_error(&self) -> Option<LockError> {
        self.core.session.last_error()
    }

    /// Read the current record under this lock's name, whoever holds it.
    pub async fn examine(&self) -> Result<Option<LockRecord>> {
        self.core.examine().await
    }

    /// Ask the heartbeat task to stop without touching the record.
    ///
    /// The lease then ages out on its own after `lease_duration`. Prefer
    /// [`release`](Self::release) to hand the lock over immediately.
    pub fn stop_heartbeat(&self) {
        self.core.session.request_stop();
    }

    /// Wait for the heartbeat task to finish, if one is running.
    pub async fn wait_heartbeat_stopped(&self) {
        if let Some(task) = self.core.session.take_task() {
            let _ = task.await;
        }
    }
}

impl LockCore {
    /// The acquire guard: record absent, lease expired, or already mine.
    fn acquire_condition(&self, now: i64) -> Condition {
        Condition::Or(vec![
            Condition::NotExists(ATTR_KEY.to_string()),
            Condition::Lt(ATTR_EXPIRY.to_string(), AttrValue::N(now)),
            Condition::Eq(
                ATTR_IDENTIFIER.to_string(),
                AttrValue::S(self.identifier.clone()),
            ),
        ])
    }

    /// One guarded write asserting this holder's lease, with the given
    /// heartbeat count.
    async fn write_record(&self, heartbeats: u64) -> leaselock_store::Result<()> {
        let now = record::now_nanos();
        let lock_record = LockRecord {
            name: self.config.name.clone(),
            identifier: self.identifier.clone(),
            expiry: now.saturating_add(record::duration_nanos(self.config.lease_duration)),
            heartbeats,
            set_at: (heartbeats == 0).then(record::now_rfc3339),
        };
        self.store
            .conditional_put(
                &self.config.name,
                lock_record.to_attributes(),
                &self.acquire_condition(now),
            )
            .await
    }

    /// One renewal: the same guarded write with the counter bumped.
    pub(crate) async fn renew(&self) -> Result<()> {
        let next = self.session.heartbeats() + 1;
        match self.write_record(next).await {
            Ok(()) => {
                self.session.record_heartbeat(next);
                Ok(())
            }
            Err(source) => Err(LockError::RenewalFailed {
                name: self.config.name.clone(),
                source,
            }),
        }
    }

    /// Point read and decode of the current record, whoever owns it.
    pub(crate) async fn examine(&self) -> Result<Option<LockRecord>> {
        match self.store.get(&self.config.name).await? {
            Some(attributes) => Ok(Some(LockRecord::from_attributes(&attributes)?)),
            None => Ok(None),
        }
    }

    /// Best-effort read of the current record, logged for debugging.
    pub(crate) async fn diagnostic_read(&self, context: &str) {
        match self.examine().await {
            Ok(Some(record)) => debug!(
                "{}: lock '{}' held by '{}', expiry {}, heartbeats {}",
                context, self.config.name, record.identifier, record.expiry, record.heartbeats
            ),
            Ok(None) => debug!("{}: no record under lock '{}'", context, self.config.name),
            Err(err) => debug!(
                "{}: could not read lock '{}': {}",
                context, self.config.name, err
            ),
        }
    }
}
