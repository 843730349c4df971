//! Process-wide project lock (§4.6): at most one mutating project
//! operation runs at a time, tagged by the request id that holds it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use vxd_core::Engine;

struct LockState {
    holder: Option<String>,
    last_activity: Instant,
}

/// Non-blocking advisory lock over the engine's process-wide singletons.
pub struct ProjectLock {
    state: Mutex<LockState>,
}

impl Default for ProjectLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectLock {
    /// Build an unheld lock with activity timestamped to now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState {
                holder: None,
                last_activity: Instant::now(),
            }),
        }
    }

    /// Attempt to acquire the lock, tagging the holder. Non-blocking:
    /// returns `false` immediately if already held.
    #[must_use]
    pub fn acquire(&self, tag: &str) -> bool {
        let mut st = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if st.holder.is_some() {
            return false;
        }
        st.holder = Some(tag.to_owned());
        st.last_activity = Instant::now();
        true
    }

    /// Release the lock, clearing the holder and refreshing activity.
    pub fn release(&self) {
        let mut st = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        st.holder = None;
        st.last_activity = Instant::now();
    }

    /// True iff the lock is unheld and has been idle longer than `timeout`.
    #[must_use]
    pub fn is_idle(&self, timeout: Duration) -> bool {
        let st = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        st.holder.is_none() && st.last_activity.elapsed() > timeout
    }

    /// Current holder tag, if the lock is held.
    #[must_use]
    pub fn holder(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .holder
            .clone()
    }
}

/// The tag the idle sweeper acquires the lock under before resetting engine
/// state.
pub const AUTO_CLEANUP_TAG: &str = "auto_cleanup";

/// Run the idle sweeper loop: every 10s, if the lock has been idle past
/// `idle_timeout`, acquire it, reset the engine, then release it. Exits
/// when `shutdown_requested` returns true.
pub async fn run_idle_sweeper(
    lock: std::sync::Arc<ProjectLock>,
    engine: std::sync::Arc<dyn Engine>,
    idle_timeout: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                if lock.is_idle(idle_timeout) && lock.acquire(AUTO_CLEANUP_TAG) {
                    debug!("project lock idle past timeout, resetting engine state");
                    if let Err(e) = engine.reset() {
                        tracing::warn!(error = %e, "idle sweeper failed to reset engine");
                    }
                    lock.release();
                    info!("idle sweeper reset engine state");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_contend_is_busy() {
        let lock = ProjectLock::new();
        assert!(lock.acquire("req-1"));
        assert!(!lock.acquire("req-2"));
    }

    #[test]
    fn release_allows_reacquire() {
        let lock = ProjectLock::new();
        assert!(lock.acquire("req-1"));
        lock.release();
        assert!(lock.acquire("req-2"));
        assert_eq!(lock.holder().as_deref(), Some("req-2"));
    }

    #[test]
    fn freshly_created_lock_is_not_idle() {
        let lock = ProjectLock::new();
        assert!(!lock.is_idle(Duration::from_secs(0)));
    }

    #[test]
    fn held_lock_is_never_idle() {
        let lock = ProjectLock::new();
        lock.acquire("req-1");
        assert!(!lock.is_idle(Duration::from_nanos(1)));
    }
}
