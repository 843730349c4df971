//! Filesystem locations the daemon reads and writes: the PID file, the
//! listening socket, and the render-artifact base directory.
//!
//! # Layout
//!
//! ```text
//! /tmp/goxel-daemon.pid      (DaemonPaths::pid_file, default)
//! /tmp/goxel-daemon.sock     (DaemonPaths::socket, default)
//! <tmp>/goxel-render/        (DaemonPaths::render_base_dir, default)
//! ```
//!
//! All three are overridable — the PID file and socket via CLI flags
//! (`-p/--pid-file`, `-s/--socket`), the render directory via the render
//! manager's own `base_dir` option.

use std::path::{Path, PathBuf};

/// Default PID-file path.
pub const DEFAULT_PID_FILE: &str = "/tmp/goxel-daemon.pid";

/// Default socket path.
pub const DEFAULT_SOCKET: &str = "/tmp/goxel-daemon.sock";

/// Fallback socket directory used when `/tmp` is not writable or does not
/// exist, mirroring the spec's "fallback path under a system prefix".
pub const FALLBACK_SOCKET_DIR: &str = "/var/run/goxel-daemon";

/// Filesystem paths the daemon uses for its own bookkeeping.
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pid_file: PathBuf,
    socket: PathBuf,
    render_base_dir: PathBuf,
}

impl DaemonPaths {
    /// Build paths from explicit overrides, falling back to the documented
    /// defaults for anything left `None`.
    #[must_use]
    pub fn new(pid_file: Option<PathBuf>, socket: Option<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.unwrap_or_else(|| PathBuf::from(DEFAULT_PID_FILE)),
            socket: socket.unwrap_or_else(Self::default_socket_path),
            render_base_dir: std::env::temp_dir().join("goxel-render"),
        }
    }

    /// The default socket path, falling back to [`FALLBACK_SOCKET_DIR`] if
    /// `/tmp` does not exist (e.g. a minimal container image).
    #[must_use]
    pub fn default_socket_path() -> PathBuf {
        let tmp = PathBuf::from("/tmp");
        if tmp.is_dir() {
            PathBuf::from(DEFAULT_SOCKET)
        } else {
            PathBuf::from(FALLBACK_SOCKET_DIR).join("goxel-daemon.sock")
        }
    }

    /// Path to the PID file.
    #[must_use]
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Path to the listening Unix domain socket.
    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Default base directory for render artifacts
    /// (`render.base_dir` config overrides this per-manager).
    #[must_use]
    pub fn default_render_base_dir(&self) -> &Path {
        &self.render_base_dir
    }
}

impl Default for DaemonPaths {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let paths = DaemonPaths::default();
        assert_eq!(paths.pid_file(), Path::new(DEFAULT_PID_FILE));
    }

    #[test]
    fn overrides_are_honored() {
        let paths = DaemonPaths::new(Some("/tmp/custom.pid".into()), Some("/tmp/custom.sock".into()));
        assert_eq!(paths.pid_file(), Path::new("/tmp/custom.pid"));
        assert_eq!(paths.socket(), Path::new("/tmp/custom.sock"));
    }
}
