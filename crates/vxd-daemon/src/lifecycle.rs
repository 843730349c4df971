//! Signal & lifecycle controller (§4.8).
//!
//! Signal handlers are async-signal-safe: they only flip atomic flags and
//! reap children via `waitpid`. The main loop polls [`SignalFlags`] at a
//! bounded interval and performs the real work in [`process_signals`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{info, warn};

use vxd_core::{DaemonError, DaemonResult, LastError};

/// The daemon's lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not yet initialized.
    Stopped,
    /// `initialize` has run; `start` has not yet completed.
    Starting,
    /// Accepting connections and dispatching requests.
    Running,
    /// Draining in-flight work before returning to `Stopped`.
    Stopping,
    /// A fatal error occurred; only `force_shutdown`/inspection is valid.
    Error,
}

/// Async-signal-safe flags flipped directly by signal handlers. Nothing
/// here allocates or locks.
#[derive(Default)]
pub struct SignalFlags {
    shutdown_requested: AtomicBool,
    reload_requested: AtomicBool,
    pipe_error_count: AtomicU64,
}

impl SignalFlags {
    /// Build an all-clear flag set.
    #[must_use]
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    /// Whether a shutdown signal has been observed since the last clear.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Whether a reload signal has been observed since the last clear.
    #[must_use]
    pub fn reload_requested(&self) -> bool {
        self.reload_requested.load(Ordering::SeqCst)
    }

    /// Pipe errors observed since the last clear.
    #[must_use]
    pub fn pipe_error_count(&self) -> u64 {
        self.pipe_error_count.load(Ordering::SeqCst)
    }
}

static FLAGS: std::sync::OnceLock<std::sync::Arc<SignalFlags>> = std::sync::OnceLock::new();

extern "C" fn handle_shutdown_signal(_: i32) {
    if let Some(flags) = FLAGS.get() {
        flags.shutdown_requested.store(true, Ordering::SeqCst);
    }
}

extern "C" fn handle_reload_signal(_: i32) {
    if let Some(flags) = FLAGS.get() {
        flags.reload_requested.store(true, Ordering::SeqCst);
    }
}

extern "C" fn handle_pipe_signal(_: i32) {
    if let Some(flags) = FLAGS.get() {
        flags.pipe_error_count.fetch_add(1, Ordering::SeqCst);
    }
}

extern "C" fn handle_child_signal(_: i32) {
    // Reap every waitable child; async-signal-safe, no allocation.
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => continue,
        }
    }
}

/// Install the SIGTERM/SIGINT/SIGHUP/SIGCHLD/SIGPIPE handlers described in
/// §4.8, registering `flags` as the process-wide target they flip.
///
/// # Errors
///
/// Returns [`DaemonError::SignalSetupFailed`] if any `sigaction` call
/// fails.
pub fn install(flags: std::sync::Arc<SignalFlags>) -> DaemonResult<()> {
    FLAGS
        .set(flags)
        .map_err(|_| DaemonError::SignalSetupFailed("signal flags already installed".into()))?;

    // SAFETY: handlers only perform atomic stores and `waitpid`, both
    // async-signal-safe; no allocation or locking happens inside them.
    unsafe {
        install_one(Signal::SIGTERM, handle_shutdown_signal)?;
        install_one(Signal::SIGINT, handle_shutdown_signal)?;
        install_one(Signal::SIGHUP, handle_reload_signal)?;
        install_one(Signal::SIGCHLD, handle_child_signal)?;
        install_one(Signal::SIGPIPE, handle_pipe_signal)?;
    }
    Ok(())
}

unsafe fn install_one(signal: Signal, handler: extern "C" fn(i32)) -> DaemonResult<()> {
    unsafe {
        signal::signal(signal, SigHandler::Handler(handler))
            .map_err(|e| DaemonError::SignalSetupFailed(format!("{signal}: {e}")))?;
    }
    Ok(())
}

/// Mutable lifecycle fields, all behind one mutex per the concurrency model
/// (§5): reads and writes always go through it.
struct Context {
    state: State,
    last_activity: Instant,
    last_error: LastError,
}

/// The daemon's lifecycle context: current state, activity timestamp, and
/// last-error slot, plus the signal flags it polls.
pub struct Lifecycle {
    flags: std::sync::Arc<SignalFlags>,
    inner: Mutex<Context>,
    pipe_errors_seen: AtomicU32,
}

impl Lifecycle {
    /// Build a lifecycle context in `Stopped`, with fresh signal flags.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flags: SignalFlags::new(),
            inner: Mutex::new(Context {
                state: State::Stopped,
                last_activity: Instant::now(),
                last_error: LastError::new(),
            }),
            pipe_errors_seen: AtomicU32::new(0),
        }
    }

    /// The signal flags this context observes; pass to [`install`].
    #[must_use]
    pub fn flags(&self) -> std::sync::Arc<SignalFlags> {
        std::sync::Arc::clone(&self.flags)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).state
    }

    /// Transition `Stopped -> Starting`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidContext`] if not currently `Stopped`.
    pub fn initialize(&self) -> DaemonResult<()> {
        self.transition(State::Stopped, State::Starting)
    }

    /// Transition `Starting -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidContext`] if not currently `Starting`.
    pub fn start(&self) -> DaemonResult<()> {
        self.transition(State::Starting, State::Running)
    }

    /// Transition `Running -> Stopping`.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidContext`] if not currently `Running`.
    pub fn request_shutdown(&self) -> DaemonResult<()> {
        self.transition(State::Running, State::Stopping)
    }

    /// Transition `Stopping -> Stopped`, completing a graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidContext`] if not currently `Stopping`.
    pub fn finish_shutdown(&self) -> DaemonResult<()> {
        self.transition(State::Stopping, State::Stopped)
    }

    /// Force a transition straight to `Stopped`, used when the shutdown
    /// timeout (§4.8) elapses while still `Running`/`Stopping`.
    pub fn force_shutdown(&self) {
        let mut ctx = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        warn!(from = ?ctx.state, "forcing shutdown past timeout");
        ctx.state = State::Stopped;
    }

    /// Move to `Error`, recording `err` as the last error.
    pub fn fail(&self, err: &DaemonError) {
        let mut ctx = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        ctx.state = State::Error;
        ctx.last_error.set(err);
    }

    /// The most recent `(code, message)` error pair, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<(String, String)> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).last_error.get()
    }

    /// Refresh the activity timestamp (touched by `reload` handling and by
    /// every request dispatch).
    pub fn touch_activity(&self) {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).last_activity = Instant::now();
    }

    /// Seconds since the last recorded activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).last_activity.elapsed()
    }

    fn transition(&self, from: State, to: State) -> DaemonResult<()> {
        let mut ctx = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if ctx.state != from {
            return Err(DaemonError::InvalidContext(format!(
                "cannot move to {to:?} from {:?}, expected {from:?}",
                ctx.state
            )));
        }
        info!(from = ?from, to = ?to, "lifecycle transition");
        ctx.state = to;
        Ok(())
    }

    /// Drain and clear the signal flags, acting on whatever was set: a
    /// shutdown request moves to `Stopping`, a reload request touches
    /// activity, and pipe errors are folded into the running count.
    pub fn process_signals(&self) {
        if self.flags.shutdown_requested.swap(false, Ordering::SeqCst) {
            info!("shutdown requested via signal");
            let _ = self.request_shutdown();
        }
        if self.flags.reload_requested.swap(false, Ordering::SeqCst) {
            info!("reload requested via signal (no-op config reload)");
            self.touch_activity();
        }
        let pipe_errors = self.flags.pipe_error_count.swap(0, Ordering::SeqCst);
        if pipe_errors > 0 {
            self.pipe_errors_seen
                .fetch_add(u32::try_from(pipe_errors).unwrap_or(u32::MAX), Ordering::Relaxed);
        }
    }

    /// Total pipe errors observed so far (for diagnostics/`--status`).
    #[must_use]
    pub fn pipe_errors_seen(&self) -> u32 {
        self.pipe_errors_seen.load(Ordering::Relaxed)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll interval the main loop uses to drain signal flags.
pub const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default shutdown deadline before [`Lifecycle::force_shutdown`] fires.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_in_order() {
        let lc = Lifecycle::new();
        assert_eq!(lc.state(), State::Stopped);
        lc.initialize().unwrap();
        assert_eq!(lc.state(), State::Starting);
        lc.start().unwrap();
        assert_eq!(lc.state(), State::Running);
        lc.request_shutdown().unwrap();
        assert_eq!(lc.state(), State::Stopping);
        lc.finish_shutdown().unwrap();
        assert_eq!(lc.state(), State::Stopped);
    }

    #[test]
    fn out_of_order_transition_is_rejected() {
        let lc = Lifecycle::new();
        assert!(lc.start().is_err());
        assert_eq!(lc.state(), State::Stopped);
    }

    #[test]
    fn fail_records_last_error_and_moves_to_error_state() {
        let lc = Lifecycle::new();
        lc.fail(&DaemonError::EngineInitFailed("boom".into()));
        assert_eq!(lc.state(), State::Error);
        let (code, _msg) = lc.last_error().unwrap();
        assert_eq!(code, "engine init failed");
    }

    #[test]
    fn force_shutdown_always_succeeds() {
        let lc = Lifecycle::new();
        lc.initialize().unwrap();
        lc.start().unwrap();
        lc.force_shutdown();
        assert_eq!(lc.state(), State::Stopped);
    }

    #[test]
    fn process_signals_moves_running_to_stopping_on_shutdown_flag() {
        let lc = Lifecycle::new();
        lc.initialize().unwrap();
        lc.start().unwrap();
        lc.flags.shutdown_requested.store(true, Ordering::SeqCst);
        lc.process_signals();
        assert_eq!(lc.state(), State::Stopping);
    }

    #[test]
    fn process_signals_accumulates_pipe_errors() {
        let lc = Lifecycle::new();
        lc.flags.pipe_error_count.store(3, Ordering::SeqCst);
        lc.process_signals();
        assert_eq!(lc.pipe_errors_seen(), 3);
    }
}
