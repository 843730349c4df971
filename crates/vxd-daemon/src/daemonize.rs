//! Daemonization (§4.9): double-fork, detach from the controlling
//! terminal, redirect standard streams, write a PID file, and optionally
//! drop privileges.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Gid, Uid};
use tracing::{info, warn};

use vxd_core::DaemonError;

/// Fork into the background, detach the session, and redirect stdio to
/// `/dev/null` (or to the configured log file, handled by the caller
/// afterwards). On success, only the grandchild process returns.
///
/// # Errors
///
/// Returns [`DaemonError::DaemonizeFailed`] if any fork/setsid/chdir step
/// fails.
pub fn daemonize() -> Result<(), DaemonError> {
    // SAFETY: fork is only safe this early in `main`, before any threads
    // (tokio runtime, logging worker) have started.
    match unsafe { unistd::fork() }.map_err(|e| DaemonError::DaemonizeFailed(format!("first fork: {e}")))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    unistd::setsid().map_err(|e| DaemonError::DaemonizeFailed(format!("setsid: {e}")))?;

    // SAFETY: still single-threaded; second fork prevents reacquiring a
    // controlling terminal.
    match unsafe { unistd::fork() }.map_err(|e| DaemonError::DaemonizeFailed(format!("second fork: {e}")))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    unistd::chdir("/").map_err(|e| DaemonError::DaemonizeFailed(format!("chdir: {e}")))?;
    unistd::umask(Mode::empty());
    redirect_stdio()?;

    info!(pid = std::process::id(), "daemonized");
    Ok(())
}

fn redirect_stdio() -> Result<(), DaemonError> {
    let dev_null = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(|e| DaemonError::DaemonizeFailed(format!("open /dev/null: {e}")))?;
    let fd = dev_null.as_raw_fd();
    for target in [0, 1, 2] {
        unistd::dup2(fd, target).map_err(|e| DaemonError::DaemonizeFailed(format!("dup2({target}): {e}")))?;
    }
    Ok(())
}

/// Create the PID file at `path` exclusively (`O_CREAT | O_EXCL`). If a
/// stale PID file is found (holds a PID of a process that is no longer
/// alive), it is removed and creation is retried once.
///
/// # Errors
///
/// Returns [`DaemonError::AlreadyRunning`] if the PID file names a live
/// process, or [`DaemonError::PidFile`] for any other I/O failure.
pub fn write_pid_file(path: &Path) -> Result<(), DaemonError> {
    match try_create_pid_file(path) {
        Ok(()) => return Ok(()),
        Err(DaemonError::PidFile(_)) => {}
        Err(e) => return Err(e),
    }

    if let Some(existing_pid) = read_pid_file(path) {
        if is_process_alive(existing_pid) {
            return Err(DaemonError::AlreadyRunning(u32::try_from(existing_pid).unwrap_or(0)));
        }
        warn!(pid = existing_pid, path = %path.display(), "removing stale pid file");
        std::fs::remove_file(path).map_err(|e| DaemonError::PidFile(e.to_string()))?;
    }

    try_create_pid_file(path)
}

fn try_create_pid_file(path: &Path) -> Result<(), DaemonError> {
    use std::io::Write as _;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o644)
        .open(path)
        .map_err(|e| DaemonError::PidFile(e.to_string()))?;
    write!(file, "{}", std::process::id()).map_err(|e| DaemonError::PidFile(e.to_string()))?;
    Ok(())
}

/// Read the PID recorded in `path`, if the file exists and parses.
#[must_use]
pub fn read_pid_file(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// True iff a process with `pid` exists and is signalable, checked via
/// `kill(pid, 0)`.
#[must_use]
pub fn is_process_alive(pid: i32) -> bool {
    nix::sys::signal::kill(unistd::Pid::from_raw(pid), None).is_ok()
}

/// Remove the PID file, ignoring a missing file.
pub fn remove_pid_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove pid file"),
    }
}

/// Drop privileges to the named group then user, in that order (group
/// first, since dropping the user first would remove permission to change
/// group). Both steps must succeed or neither takes effect in spirit: an
/// error here should be treated as fatal by the caller.
///
/// # Errors
///
/// Returns [`DaemonError::PermissionDenied`] if either lookup or `set*id`
/// call fails.
pub fn drop_privileges(user: Option<&str>, group: Option<&str>) -> Result<(), DaemonError> {
    if let Some(group) = group {
        let gid = lookup_gid(group)?;
        unistd::setgid(gid).map_err(|e| DaemonError::PermissionDenied(format!("setgid({group}): {e}")))?;
    }
    if let Some(user) = user {
        let uid = lookup_uid(user)?;
        unistd::setuid(uid).map_err(|e| DaemonError::PermissionDenied(format!("setuid({user}): {e}")))?;
    }
    Ok(())
}

fn lookup_uid(name: &str) -> Result<Uid, DaemonError> {
    if let Ok(uid) = name.parse::<u32>() {
        return Ok(Uid::from_raw(uid));
    }
    nix::unistd::User::from_name(name)
        .map_err(|e| DaemonError::PermissionDenied(format!("user lookup {name}: {e}")))?
        .map(|u| u.uid)
        .ok_or_else(|| DaemonError::PermissionDenied(format!("no such user: {name}")))
}

fn lookup_gid(name: &str) -> Result<Gid, DaemonError> {
    if let Ok(gid) = name.parse::<u32>() {
        return Ok(Gid::from_raw(gid));
    }
    nix::unistd::Group::from_name(name)
        .map_err(|e| DaemonError::PermissionDenied(format!("group lookup {name}: {e}")))?
        .map(|g| g.gid)
        .ok_or_else(|| DaemonError::PermissionDenied(format!("no such group: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_pid_file_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pid");
        write_pid_file(&path).unwrap();
        assert_eq!(read_pid_file(&path), Some(std::process::id() as i32));
    }

    #[test]
    fn write_pid_file_rejects_when_live_process_holds_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pid");
        std::fs::write(&path, std::process::id().to_string()).unwrap();
        let err = write_pid_file(&path);
        assert!(matches!(err, Err(DaemonError::AlreadyRunning(_))));
    }

    #[test]
    fn write_pid_file_replaces_a_stale_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pid");
        // PID 1 is init and will not match a plausible dead PID in most
        // sandboxes, so use a PID unlikely to be alive instead: the max
        // PID value is never a live process.
        std::fs::write(&path, "2147483647").unwrap();
        write_pid_file(&path).unwrap();
        assert_eq!(read_pid_file(&path), Some(std::process::id() as i32));
    }

    #[test]
    fn read_pid_file_returns_none_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_pid_file(&dir.path().join("missing.pid")), None);
    }

    #[test]
    fn is_process_alive_is_true_for_self() {
        assert!(is_process_alive(std::process::id() as i32));
    }

    #[test]
    fn is_process_alive_is_false_for_implausible_pid() {
        assert!(!is_process_alive(2_147_483_647));
    }

    #[test]
    fn lookup_uid_accepts_numeric_id_without_passwd_lookup() {
        assert_eq!(lookup_uid("0").unwrap(), Uid::from_raw(0));
    }

    #[test]
    fn lookup_gid_accepts_numeric_id_without_group_lookup() {
        assert_eq!(lookup_gid("0").unwrap(), Gid::from_raw(0));
    }
}
