//! Heartbeat session state and the background renewal loop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::LockError;
use crate::lock::LockCore;

/// State shared between the caller and the renewal task.
///
/// The caller's threads and the background task only communicate through
/// these synchronized fields; in particular the stop request and the
/// latched error are safe to touch from both sides at any time.
#[derive(Default)]
pub(crate) struct HeartbeatSession {
    /// Renewal loop stop request
    stop: AtomicBool,
    /// Wakes the renewal loop out of its inter-heartbeat wait
    stop_notify: Notify,
    /// Renewal attempts started, successful or not
    attempts: AtomicU64,
    /// Renewals completed in the current tenure; mirrors the record's
    /// `heartbeats` attribute
    heartbeats: AtomicU64,
    /// First renewal error of the tenure, kept for the caller to poll
    last_error: Mutex<Option<LockError>>,
    /// Handle of the running renewal task, if any
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatSession {
    /// Reset all session state for a fresh tenure.
    pub(crate) fn begin(&self) {
        self.stop.store(false, Ordering::Release);
        self.attempts.store(0, Ordering::Relaxed);
        self.heartbeats.store(0, Ordering::Relaxed);
        *self.last_error.lock() = None;
    }

    /// Ask the renewal loop to stop and interrupt its current wait.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.stop_notify.notify_one();
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Wait out one heartbeat period, or less if a stop request arrives.
    ///
    /// A notify wake only ends the wait once the stop flag is set: a permit
    /// left behind by a stop that found no waiter (stop or release after
    /// the task already exited) must not cut a later tenure's wait short.
    pub(crate) async fn wait(&self, period: Duration) {
        let sleep = tokio::time::sleep(period);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return,
                _ = self.stop_notify.notified() => {
                    if self.stop_requested() {
                        return;
                    }
                    // Stale permit from an earlier tenure; keep waiting.
                }
            }
        }
    }

    /// Bump the attempt counter, returning the attempt's ordinal.
    pub(crate) fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    pub(crate) fn record_heartbeat(&self, count: u64) {
        self.heartbeats.store(count, Ordering::Relaxed);
    }

    pub(crate) fn latch_error(&self, err: LockError) {
        *self.last_error.lock() = Some(err);
    }

    pub(crate) fn last_error(&self) -> Option<LockError> {
        self.last_error.lock().clone()
    }

    pub(crate) fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }

    /// True when a renewal task was spawned and has not finished.
    pub(crate) fn task_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// True when the renewal task is alive and still intends to renew:
    /// running, not asked to stop, and not on its way out after a failed
    /// renewal. Only such a task can carry an existing tenure forward.
    pub(crate) fn renewing(&self) -> bool {
        self.task_running() && !self.stop_requested() && self.last_error().is_none()
    }

    /// Store `spawn`'s task handle unless a live task already occupies the
    /// slot. Returns whether a new task was installed.
    pub(crate) fn install_task<F>(&self, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }
        *task = Some(spawn());
        true
    }
}

/// Background renewal loop, one per acquired session.
///
/// Runs until a stop request or the first renewal error. An error is
/// conclusive for the whole session: by the time a renewal fails the lease
/// may already belong to someone else, so retrying could extend a lock this
/// holder no longer owns. The error is latched for the caller instead.
pub(crate) async fn renewal_loop(core: Arc<LockCore>) {
    let period = core.config.heartbeat_period;
    loop {
        let attempt = core.session.next_attempt();
        debug!(
            "Waiting {:?} before heartbeat #{} for lock '{}'",
            period, attempt, core.config.name
        );
        core.session.wait(period).await;

        if core.session.stop_requested() {
            debug!("Stopping heartbeats for lock '{}'", core.config.name);
            core.diagnostic_read("heartbeats stopped").await;
            break;
        }

        debug!(
            "Renewing lease on lock '{}' for {:?}",
            core.config.name, core.config.lease_duration
        );
        if let Err(err) = core.renew().await {
            warn!(
                "Renewal of lock '{}' failed, stopping heartbeats: {}",
                core.config.name, err
            );
            core.session.latch_error(err);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaselock_store::StoreError;

    #[test]
    fn test_begin_resets_session() {
        let session = HeartbeatSession::default();
        session.next_attempt();
        session.record_heartbeat(4);
        session.request_stop();
        session.latch_error(LockError::Store(StoreError::Unavailable("down".into())));

        session.begin();

        assert!(!session.stop_requested());
        assert_eq!(session.heartbeats(), 0);
        assert_eq!(session.next_attempt(), 1);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_error_latch() {
        let session = HeartbeatSession::default();
        assert!(session.last_error().is_none());

        session.latch_error(LockError::Store(StoreError::Unavailable("down".into())));
        let latched = session.last_error();
        assert!(matches!(latched, Some(LockError::Store(_))));

        // Still there on a second poll.
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait() {
        let session = Arc::new(HeartbeatSession::default());

        let waiter = Arc::clone(&session);
        let handle = tokio::spawn(async move {
            waiter.wait(Duration::from_secs(30)).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        session.request_stop();

        // The wait must return long before the 30s period elapses.
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("wait did not return after stop request")
            .unwrap();
        assert!(session.stop_requested());
    }

    #[tokio::test]
    async fn test_wait_elapses_without_stop() {
        let session = HeartbeatSession::default();
        let start = std::time::Instant::now();
        session.wait(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_wait_ignores_stale_stop_permit() {
        let session = HeartbeatSession::default();

        // A stop request with nothing waiting leaves a stored permit.
        session.request_stop();
        session.begin();

        // The leftover permit must not cut the fresh tenure's wait short.
        let start = std::time::Instant::now();
        session.wait(Duration::from_millis(50)).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_renewing_reflects_session_intent() {
        let session = HeartbeatSession::default();
        assert!(!session.renewing());

        session.begin();
        session.install_task(|| {
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
            })
        });
        assert!(session.renewing());

        // A latched error means the task is on its way out.
        session.latch_error(LockError::Store(StoreError::Unavailable("down".into())));
        assert!(!session.renewing());
        session.begin();
        assert!(session.renewing());

        // So does a stop request, even while the task is still running.
        session.request_stop();
        assert!(session.task_running());
        assert!(!session.renewing());

        session.take_task().unwrap().abort();
    }

    #[tokio::test]
    async fn test_install_task_refuses_second() {
        let session = HeartbeatSession::default();

        assert!(session.install_task(|| tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })));
        assert!(session.task_running());
        assert!(!session.install_task(|| tokio::spawn(async {})));

        let task = session.take_task().unwrap();
        task.abort();
        assert!(!session.task_running());
    }
}
