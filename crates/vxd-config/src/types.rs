//! Configuration struct definitions.

use std::path::PathBuf;

/// How the protocol router classifies inbound payloads (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolMode {
    /// Peek the first 4 bytes of each payload and classify per-message.
    #[default]
    Auto,
    /// Skip detection; every payload is JSON-RPC.
    JsonRpc,
    /// Skip detection; every payload is MCP.
    Mcp,
}

impl std::str::FromStr for ProtocolMode {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "jsonrpc" => Ok(Self::JsonRpc),
            "mcp" => Ok(Self::Mcp),
            other => Err(crate::error::ConfigError::Invalid(format!(
                "unknown protocol mode: {other}"
            ))),
        }
    }
}

/// Render artifact manager configuration (§4.7).
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Base directory render files are written under.
    pub base_dir: PathBuf,
    /// Seconds an entry lives before the sweeper deletes it.
    pub ttl_seconds: u64,
    /// Seconds between sweeper passes. Overridable by
    /// `RENDER_MANAGER_CLEANUP_INTERVAL`.
    pub sweep_interval_seconds: u64,
    /// Optional cap on total bytes tracked; entries are evicted LRU above it.
    pub max_total_bytes: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("goxel-render"),
            ttl_seconds: 3600,
            sweep_interval_seconds: 300,
            max_total_bytes: None,
        }
    }
}

/// The worker pool's tuning knobs (§4.5).
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Bounded queue capacity.
    pub queue_capacity: usize,
    /// Whether the queue orders by priority class instead of pure FIFO.
    pub priority_queue: bool,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            queue_capacity: 1024,
            priority_queue: false,
        }
    }
}

/// The script pool's tuning knobs, a dedicated pool serialized by a single
/// process-wide mutex (§4.5).
#[derive(Debug, Clone)]
pub struct ScriptPoolConfig {
    /// Number of worker threads (default 4).
    pub worker_count: usize,
    /// Bounded queue capacity (default 100).
    pub queue_capacity: usize,
    /// Default submitter timeout, seconds (default 30, max 300).
    pub default_timeout_secs: u64,
    /// Maximum submitter timeout, seconds (300 = 5 min).
    pub max_timeout_secs: u64,
}

impl Default for ScriptPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 100,
            default_timeout_secs: 30,
            max_timeout_secs: 300,
        }
    }
}

/// Fully resolved daemon configuration: embedded defaults overlaid by CLI
/// flags. Real config-file parsing is intentionally not implemented (see
/// [`crate::Config::config_path`]); `-c/--config <file>` records a path for
/// diagnostic display only.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listening socket path.
    pub socket: PathBuf,
    /// PID file path.
    pub pid_file: PathBuf,
    /// Whether a PID file should be created at all.
    pub create_pid_file: bool,
    /// Optional log file; stderr is used when unset.
    pub log_file: Option<PathBuf>,
    /// Working directory to chdir into (daemonize always chdirs to `/`
    /// afterwards per §4.9; this is recorded for the foreground path).
    pub working_dir: Option<PathBuf>,
    /// Privilege-drop target user (name or numeric uid).
    pub user: Option<String>,
    /// Privilege-drop target group (name or numeric gid).
    pub group: Option<String>,
    /// Path passed via `-c/--config`, stored but not parsed.
    pub config_path: Option<PathBuf>,
    /// Verbose logging.
    pub verbose: bool,
    /// Run in the foreground instead of daemonizing.
    pub foreground: bool,
    /// Daemonize on startup.
    pub daemonize: bool,
    /// Maximum concurrent client connections.
    pub max_connections: u32,
    /// Maximum payload size in bytes (default 16 MiB).
    pub max_payload_bytes: u32,
    /// Protocol detection mode.
    pub protocol: ProtocolMode,
    /// Shutdown deadline before a forced transition to `Stopped` (§4.8).
    pub shutdown_timeout_ms: u64,
    /// Seconds of project-lock inactivity before the idle sweeper resets
    /// engine state (§4.6).
    pub idle_timeout_secs: u64,
    /// General worker pool configuration.
    pub worker_pool: WorkerPoolConfig,
    /// Script worker pool configuration.
    pub script_pool: ScriptPoolConfig,
    /// Render artifact manager configuration.
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: vxd_core::DaemonPaths::default_socket_path(),
            pid_file: PathBuf::from(vxd_core::dirs::DEFAULT_PID_FILE),
            create_pid_file: true,
            log_file: None,
            working_dir: None,
            user: None,
            group: None,
            config_path: None,
            verbose: false,
            foreground: false,
            daemonize: false,
            max_connections: 256,
            max_payload_bytes: 16 * 1024 * 1024,
            protocol: ProtocolMode::Auto,
            shutdown_timeout_ms: 10_000,
            idle_timeout_secs: 300,
            worker_pool: WorkerPoolConfig::default(),
            script_pool: ScriptPoolConfig::default(),
            render: RenderConfig::default(),
        }
    }
}
