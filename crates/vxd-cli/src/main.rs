//! `vxd` — command-line entry point for the voxel editing daemon.
//!
//! A single flat-flag binary (no subcommands): flags select one of three
//! modes — run the daemon (the default), issue a control command against an
//! already-running daemon (`--status`/`--stop`/`--reload`), or run a
//! self-test (`--test-signals`/`--test-lifecycle`).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use vxd_config::{Config, ProtocolMode};
use vxd_core::DaemonError;
use vxd_daemon::daemonize;
use vxd_daemon::lifecycle::{self, Lifecycle, State};
use vxd_daemon::{DaemonContext, server};
use vxd_telemetry::{LogConfig, LogFormat};

/// Headless voxel editing daemon.
#[derive(Parser, Debug)]
#[command(name = "vxd", version, about = "Headless voxel editing daemon", disable_version_flag = true)]
struct Args {
    /// Print version information and exit.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: bool,

    /// Enable verbose (debug-level) logging.
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Daemonize: fork into the background.
    #[arg(short = 'D', long)]
    daemonize: bool,

    /// Run in the foreground (default unless `-D` is given).
    #[arg(short = 'f', long)]
    foreground: bool,

    /// PID file path.
    #[arg(short = 'p', long, value_name = "path")]
    pid_file: Option<PathBuf>,

    /// Listening socket path.
    #[arg(short = 's', long, value_name = "path")]
    socket: Option<PathBuf>,

    /// Configuration file (recorded for diagnostics; contents are not parsed).
    #[arg(short = 'c', long, value_name = "file")]
    config: Option<PathBuf>,

    /// Log file path (stderr is used when unset).
    #[arg(short = 'l', long, value_name = "path")]
    log_file: Option<PathBuf>,

    /// Working directory for the foreground path.
    #[arg(short = 'w', long, value_name = "dir")]
    working_dir: Option<PathBuf>,

    /// Drop privileges to this user after binding the socket.
    #[arg(short = 'u', long, value_name = "name|uid")]
    user: Option<String>,

    /// Drop privileges to this group after binding the socket.
    #[arg(short = 'g', long, value_name = "name|gid")]
    group: Option<String>,

    /// Worker pool thread count, 1..=64.
    #[arg(short = 'j', long, value_name = "1..64")]
    workers: Option<usize>,

    /// Bounded queue capacity, 1..=65536.
    #[arg(short = 'q', long, value_name = "1..65536")]
    queue_size: Option<usize>,

    /// Maximum concurrent client connections, 1..=65536.
    #[arg(short = 'm', long, value_name = "1..65536")]
    max_connections: Option<u32>,

    /// Wire protocol detection mode.
    #[arg(short = 'P', long, value_name = "auto|jsonrpc|mcp")]
    protocol: Option<String>,

    /// Order the worker pool queue by priority class instead of FIFO.
    #[arg(long)]
    priority_queue: bool,

    /// Report whether the daemon named by the PID file is running.
    #[arg(long)]
    status: bool,

    /// Stop the running daemon named by the PID file.
    #[arg(long)]
    stop: bool,

    /// Ask the running daemon to reload (SIGHUP).
    #[arg(long)]
    reload: bool,

    /// Self-test: install signal handlers, raise each one, report results.
    #[arg(long)]
    test_signals: bool,

    /// Self-test: walk the lifecycle state machine through its transitions.
    #[arg(long)]
    test_lifecycle: bool,
}

fn main() {
    let args = Args::parse();
    let exit_code = run(args);
    std::process::exit(exit_code);
}

fn run(args: Args) -> i32 {
    let level = if args.verbose { "debug" } else { "info" };
    let mut log_config = LogConfig::new(level).with_format(LogFormat::Compact);
    if let Some(path) = &args.log_file {
        log_config = log_config.with_log_file(path.clone());
    }
    let _ = vxd_telemetry::setup_logging(&log_config);

    if args.test_signals {
        return run_test_signals();
    }
    if args.test_lifecycle {
        return run_test_lifecycle();
    }

    let pid_file = args
        .pid_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(vxd_core::dirs::DEFAULT_PID_FILE));

    if args.status {
        return run_status(&pid_file);
    }
    if args.stop {
        return run_stop(&pid_file);
    }
    if args.reload {
        return run_reload(&pid_file);
    }

    match build_config(&args) {
        Ok(config) => run_daemon(config, &args),
        Err(e) => {
            eprintln!("{}", format!("configuration error: {e}").red());
            1
        }
    }
}

fn build_config(args: &Args) -> Result<Config, DaemonError> {
    let mut config = Config::load_defaults().map_err(|e| DaemonError::ConfigInvalid(e.to_string()))?;

    if let Some(socket) = &args.socket {
        config.socket = socket.clone();
    }
    if let Some(pid_file) = &args.pid_file {
        config.pid_file = pid_file.clone();
    }
    config.config_path = args.config.clone();
    config.log_file = args.log_file.clone();
    config.working_dir = args.working_dir.clone();
    config.user = args.user.clone();
    config.group = args.group.clone();
    config.verbose = args.verbose;
    config.foreground = args.foreground || !args.daemonize;
    config.daemonize = args.daemonize && !args.foreground;
    if let Some(workers) = args.workers {
        config.worker_pool.worker_count = workers;
    }
    if let Some(queue_size) = args.queue_size {
        config.worker_pool.queue_capacity = queue_size;
    }
    if let Some(max_connections) = &args.max_connections {
        config.max_connections = *max_connections;
    }
    if args.priority_queue {
        config.worker_pool.priority_queue = true;
    }
    if let Some(protocol) = &args.protocol {
        config.protocol = ProtocolMode::from_str(protocol).map_err(|e| DaemonError::ConfigInvalid(e.to_string()))?;
    }

    config.validate().map_err(|e| DaemonError::ConfigInvalid(e.to_string()))?;
    Ok(config)
}

fn run_daemon(config: Config, args: &Args) -> i32 {
    if config.daemonize {
        if let Err(e) = daemonize::daemonize() {
            eprintln!("{}", format!("failed to daemonize: {e}").red());
            return 1;
        }
    } else if let Some(dir) = &args.working_dir {
        if std::env::set_current_dir(dir).is_err() {
            eprintln!("{}", format!("failed to chdir into {}", dir.display()).red());
            return 1;
        }
    }

    if config.create_pid_file {
        if let Err(e) = daemonize::write_pid_file(&config.pid_file) {
            eprintln!("{}", format!("{e}").red());
            return 1;
        }
    }

    if let Err(e) = daemonize::drop_privileges(config.user.as_deref(), config.group.as_deref()) {
        eprintln!("{}", format!("{e}").red());
        daemonize::remove_pid_file(&config.pid_file);
        return 1;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", format!("failed to start async runtime: {e}").red());
            daemonize::remove_pid_file(&config.pid_file);
            return 1;
        }
    };

    let pid_file = config.pid_file.clone();
    let result = runtime.block_on(serve(config));
    daemonize::remove_pid_file(&pid_file);

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", format!("{e}").red());
            1
        }
    }
}

async fn serve(config: Config) -> Result<(), DaemonError> {
    let ctx = Arc::new(DaemonContext::new(config));

    let flags = ctx.lifecycle.flags();
    lifecycle::install(flags)?;

    ctx.lifecycle.initialize()?;
    ctx.lifecycle.start()?;
    ctx.spawn_background_tasks();

    tracing::info!(pid = std::process::id(), "vxd-daemon started");
    server::run(Arc::clone(&ctx)).await?;

    let shutdown_timeout = Duration::from_millis(ctx.config.shutdown_timeout_ms);
    match tokio::time::timeout(shutdown_timeout, ctx.shutdown()).await {
        Ok(()) => {
            ctx.lifecycle.finish_shutdown()?;
            tracing::info!("vxd-daemon stopped");
        }
        Err(_) => {
            tracing::warn!(timeout_ms = ctx.config.shutdown_timeout_ms, "graceful shutdown timed out, forcing");
            ctx.lifecycle.force_shutdown();
        }
    }
    Ok(())
}

fn run_status(pid_file: &std::path::Path) -> i32 {
    match daemonize::read_pid_file(pid_file) {
        Some(pid) if daemonize::is_process_alive(pid) => {
            println!("{}", format!("status: running (pid {pid})").green());
            0
        }
        Some(pid) => {
            println!("{}", format!("status: not running (stale pid file, pid {pid})").yellow());
            1
        }
        None => {
            println!("{}", "status: not running".yellow());
            1
        }
    }
}

fn run_stop(pid_file: &std::path::Path) -> i32 {
    let Some(pid) = daemonize::read_pid_file(pid_file) else {
        eprintln!("{}", "daemon not running".red());
        return 1;
    };
    if !daemonize::is_process_alive(pid) {
        eprintln!("{}", "daemon not running".red());
        return 1;
    }
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::Signal::SIGTERM) {
        Ok(()) => {
            wait_for_exit(pid);
            println!("{}", "daemon stopped".green());
            0
        }
        Err(e) => {
            eprintln!("{}", format!("failed to stop daemon: {e}").red());
            1
        }
    }
}

fn run_reload(pid_file: &std::path::Path) -> i32 {
    let Some(pid) = daemonize::read_pid_file(pid_file) else {
        eprintln!("{}", "daemon not running".red());
        return 1;
    };
    if !daemonize::is_process_alive(pid) {
        eprintln!("{}", "daemon not running".red());
        return 1;
    }
    match nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), nix::sys::signal::Signal::SIGHUP) {
        Ok(()) => {
            println!("{}", "reload signal sent".green());
            0
        }
        Err(e) => {
            eprintln!("{}", format!("failed to reload daemon: {e}").red());
            1
        }
    }
}

fn wait_for_exit(pid: i32) {
    for _ in 0..lifecycle::DEFAULT_SHUTDOWN_TIMEOUT.as_millis() / 100 {
        if !daemonize::is_process_alive(pid) {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
}

fn run_test_signals() -> i32 {
    let flags = Arc::new(lifecycle::SignalFlags::default());
    if let Err(e) = lifecycle::install(Arc::clone(&flags)) {
        eprintln!("{}", format!("signal setup failed: {e}").red());
        return 1;
    }

    let pid = nix::unistd::Pid::this();
    let checks = [
        ("SIGHUP", nix::sys::signal::Signal::SIGHUP),
        ("SIGTERM", nix::sys::signal::Signal::SIGTERM),
    ];
    let mut all_ok = true;
    for (name, signal) in checks {
        if nix::sys::signal::kill(pid, signal).is_err() {
            eprintln!("{}", format!("failed to raise {name}").red());
            all_ok = false;
        }
    }
    std::thread::sleep(std::time::Duration::from_millis(50));

    println!("{}", serde_json::json!({
        "shutdown_requested": flags.shutdown_requested(),
        "reload_requested": flags.reload_requested(),
    }));

    if all_ok && flags.shutdown_requested() && flags.reload_requested() {
        println!("{}", "signal handling: ok".green());
        0
    } else {
        println!("{}", "signal handling: failed".red());
        1
    }
}

fn run_test_lifecycle() -> i32 {
    let lc = Lifecycle::new();
    let steps: [(&str, fn(&Lifecycle) -> Result<(), DaemonError>); 4] = [
        ("initialize", Lifecycle::initialize),
        ("start", Lifecycle::start),
        ("request_shutdown", Lifecycle::request_shutdown),
        ("finish_shutdown", Lifecycle::finish_shutdown),
    ];

    for (name, step) in steps {
        if let Err(e) = step(&lc) {
            eprintln!("{}", format!("lifecycle step {name} failed: {e}").red());
            return 1;
        }
    }

    if lc.state() == State::Stopped {
        println!("{}", "lifecycle: ok".green());
        0
    } else {
        println!("{}", format!("lifecycle ended in unexpected state {:?}", lc.state()).red());
        1
    }
}
