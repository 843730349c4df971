//! Error taxonomy for the voxel daemon runtime.
//!
//! A single enumeration spans every failure surface the daemon can hit:
//! transport framing, protocol parsing, dispatch, the (external) engine,
//! resource exhaustion, lifecycle management, and lock contention. Each
//! variant carries a stable human string via [`std::fmt::Display`] (through
//! `thiserror`) so it can be surfaced verbatim to CLI output or embedded in
//! a JSON-RPC error response.

use thiserror::Error;

/// Errors produced anywhere in the daemon runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DaemonError {
    // --- Transport ---
    /// The wire framing was malformed (bad header, truncated payload).
    #[error("framing error: {0}")]
    Framing(String),

    /// The underlying socket I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The client disconnected mid-request.
    #[error("client disconnected")]
    ClientDisconnect,

    /// A write was interrupted by a broken pipe (SIGPIPE).
    #[error("write interrupted: broken pipe")]
    WriteInterrupt,

    // --- Protocol ---
    /// The payload was not valid JSON.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The request was not a well-formed JSON-RPC/MCP envelope.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The `jsonrpc` field was missing or not `"2.0"`.
    #[error("invalid version: expected \"2.0\"")]
    InvalidVersion,

    /// A required field was absent from the request.
    #[error("missing field: {0}")]
    MissingField(String),

    // --- Dispatch ---
    /// No handler is registered for the requested method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The supplied params did not match what the handler expected.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    // --- Application (engine) ---
    /// The engine collaborator returned a non-zero/failed result.
    #[error("engine error: {0}")]
    Engine(String),

    /// A requested procedural shape is not supported.
    #[error("unsupported shape: {0}")]
    ShapeUnsupported(String),

    /// A referenced layer does not exist.
    #[error("layer not found: {0}")]
    LayerMissing(String),

    // --- Resource ---
    /// A worker pool's bounded queue was full.
    #[error("server overloaded")]
    QueueFull,

    /// Memory could not be allocated.
    #[error("out of memory")]
    OutOfMemory,

    /// The operation was denied by filesystem permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A filesystem operation failed.
    #[error("filesystem error: {0}")]
    Filesystem(String),

    // --- Lifecycle ---
    /// `initialize` was called while a live daemon already owns the PID file.
    #[error("daemon already running (pid {0})")]
    AlreadyRunning(u32),

    /// A control command was issued but no daemon is running.
    #[error("daemon not running")]
    NotRunning,

    /// An operation exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// Installing signal handlers failed.
    #[error("signal setup failed: {0}")]
    SignalSetupFailed(String),

    /// `fork`, `setsid`, or `chdir` failed during daemonization.
    #[error("daemonize step failed: {0}")]
    DaemonizeFailed(String),

    /// The PID file could not be created, written, or removed.
    #[error("pid file error: {0}")]
    PidFile(String),

    /// The lifecycle context was asked to do something invalid for its
    /// current state (e.g. `start` before `initialize`).
    #[error("invalid lifecycle context: {0}")]
    InvalidContext(String),

    /// The (external) voxel engine failed to initialize.
    #[error("engine initialization failed: {0}")]
    EngineInitFailed(String),

    /// The configuration file could not be found.
    #[error("config not found: {0}")]
    ConfigNotFound(String),

    /// The configuration was structurally invalid.
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    // --- Concurrency ---
    /// The process-wide project lock is held by another request.
    #[error("another project operation is in progress")]
    LockBusy,

    /// An internal invariant was violated; catch-all for unexpected states.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DaemonError {
    /// A stable, human-readable string for this error, independent of any
    /// interpolated detail. Used by CLI diagnostics (`--status`) where a
    /// fixed vocabulary is preferable to a formatted message.
    #[must_use]
    pub fn error_string(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing error",
            Self::Io(_) => "io error",
            Self::ClientDisconnect => "client disconnected",
            Self::WriteInterrupt => "write interrupted",
            Self::ParseError(_) => "parse error",
            Self::InvalidRequest(_) => "invalid request",
            Self::InvalidVersion => "invalid version",
            Self::MissingField(_) => "missing field",
            Self::MethodNotFound(_) => "method not found",
            Self::InvalidParams(_) => "invalid params",
            Self::Engine(_) => "engine error",
            Self::ShapeUnsupported(_) => "unsupported shape",
            Self::LayerMissing(_) => "layer not found",
            Self::QueueFull => "server overloaded",
            Self::OutOfMemory => "out of memory",
            Self::PermissionDenied(_) => "permission denied",
            Self::Filesystem(_) => "filesystem error",
            Self::AlreadyRunning(_) => "already running",
            Self::NotRunning => "not running",
            Self::Timeout => "timeout",
            Self::SignalSetupFailed(_) => "signal setup failed",
            Self::DaemonizeFailed(_) => "daemonize failed",
            Self::PidFile(_) => "pid file error",
            Self::InvalidContext(_) => "invalid context",
            Self::EngineInitFailed(_) => "engine init failed",
            Self::ConfigNotFound(_) => "config not found",
            Self::ConfigInvalid(_) => "config invalid",
            Self::LockBusy => "lock busy",
            Self::Internal(_) => "internal error",
        }
    }

    /// Whether this error is fatal to daemon startup (per the error-handling
    /// design: fork/setsid/chdir, signal setup, required pid-file creation,
    /// and engine init all abort the startup sequence).
    #[must_use]
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::DaemonizeFailed(_)
                | Self::SignalSetupFailed(_)
                | Self::PidFile(_)
                | Self::EngineInitFailed(_)
                | Self::AlreadyRunning(_)
        )
    }

    /// The JSON-RPC 2.0 error code this error maps to, for protocol and
    /// dispatch failures. Application/resource/lifecycle errors that have
    /// no natural RPC code fall back to the internal-error band.
    #[must_use]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::ParseError(_) => -32700,
            Self::InvalidRequest(_) | Self::InvalidVersion | Self::MissingField(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            _ => -32603,
        }
    }
}

/// Result type used throughout the daemon runtime.
pub type DaemonResult<T> = Result<T, DaemonError>;

/// A mutable last-error slot, as described for the lifecycle context:
/// setters replace the (code, message) pair atomically under a single lock.
#[derive(Debug, Default)]
pub struct LastError {
    inner: std::sync::Mutex<Option<(String, String)>>,
}

impl LastError {
    /// Create an empty last-error slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(None),
        }
    }

    /// Record `err` as the most recent error, replacing whatever was there.
    pub fn set(&self, err: &DaemonError) {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some((err.error_string().to_owned(), err.to_string()));
    }

    /// Read the current `(code, message)` pair, if any error has been set.
    #[must_use]
    pub fn get(&self) -> Option<(String, String)> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Clear the slot.
    pub fn clear(&self) {
        *self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_string_is_stable_across_detail() {
        let a = DaemonError::MethodNotFound("foo".into());
        let b = DaemonError::MethodNotFound("bar".into());
        assert_eq!(a.error_string(), b.error_string());
    }

    #[test]
    fn rpc_codes_match_json_rpc_bands() {
        assert_eq!(DaemonError::ParseError("x".into()).rpc_code(), -32700);
        assert_eq!(DaemonError::InvalidVersion.rpc_code(), -32600);
        assert_eq!(DaemonError::MethodNotFound("x".into()).rpc_code(), -32601);
        assert_eq!(DaemonError::InvalidParams("x".into()).rpc_code(), -32602);
        assert_eq!(DaemonError::LockBusy.rpc_code(), -32603);
    }

    #[test]
    fn startup_fatal_classification() {
        assert!(DaemonError::EngineInitFailed("x".into()).is_startup_fatal());
        assert!(!DaemonError::LockBusy.is_startup_fatal());
    }

    #[test]
    fn last_error_set_get_clear() {
        let slot = LastError::new();
        assert!(slot.get().is_none());
        slot.set(&DaemonError::NotRunning);
        let (code, msg) = slot.get().unwrap();
        assert_eq!(code, "not running");
        assert_eq!(msg, "daemon not running");
        slot.clear();
        assert!(slot.get().is_none());
    }

    #[test]
    fn setters_replace_atomically() {
        let slot = LastError::new();
        slot.set(&DaemonError::LockBusy);
        slot.set(&DaemonError::Timeout);
        let (code, _) = slot.get().unwrap();
        assert_eq!(code, "timeout");
    }
}
