//! Binding and lifecycle of the listening Unix domain socket.
//!
//! Stale-socket cleanup and parent-directory creation mirror a long-running
//! daemon pattern: a prior crash can leave the socket file behind, and the
//! next `bind` must not fail because of it.

use std::path::Path;

use tokio::net::UnixListener;
use tracing::{info, warn};

use vxd_core::DaemonError;

/// Bind a [`UnixListener`] at `path`, removing any stale socket file left
/// behind by a previous run and creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`DaemonError::Io`] if the parent directory cannot be created or
/// the bind itself fails.
pub fn bind_listener(path: &Path) -> Result<UnixListener, DaemonError> {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove stale socket file");
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DaemonError::Io(e.to_string()))?;
    }

    let listener = UnixListener::bind(path).map_err(|e| DaemonError::Io(e.to_string()))?;
    info!(path = %path.display(), "listening on unix domain socket");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_listener_removes_a_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        std::fs::write(&path, b"stale").unwrap();

        let listener = bind_listener(&path).unwrap();
        drop(listener);
        assert!(path.exists());
    }

    #[test]
    fn bind_listener_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("daemon.sock");

        let listener = bind_listener(&path).unwrap();
        drop(listener);
        assert!(path.parent().unwrap().is_dir());
    }
}
