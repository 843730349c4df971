//! Test fixtures for common types.

use tempfile::TempDir;
use vxd_config::Config;
use vxd_core::{DaemonPaths, Rgba};

/// A [`DaemonPaths`] rooted in a freshly created temp directory, plus the
/// `TempDir` handle that must be kept alive for the paths to stay valid.
#[must_use]
pub fn test_daemon_paths() -> (DaemonPaths, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let pid_file = dir.path().join("daemon.pid");
    let socket = dir.path().join("daemon.sock");
    (DaemonPaths::new(Some(pid_file), Some(socket)), dir)
}

/// A default [`Config`] pointed at a freshly created temp directory so
/// tests never touch `/tmp/goxel-daemon.*` directly.
#[must_use]
pub fn test_config() -> (Config, TempDir) {
    let (paths, dir) = test_daemon_paths();
    let mut config = Config::default();
    config.pid_file = paths.pid_file().to_path_buf();
    config.socket = paths.socket().to_path_buf();
    config.render.base_dir = dir.path().join("render");
    (config, dir)
}

/// An opaque but deterministic test color.
#[must_use]
pub const fn test_rgba() -> Rgba {
    Rgba::new(12, 34, 56, 255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fixture_paths_live_under_tempdir() {
        let (config, dir) = test_config();
        assert!(config.pid_file.starts_with(dir.path()));
        assert!(config.socket.starts_with(dir.path()));
    }

    #[test]
    fn test_daemon_paths_fixture_is_distinct_per_call() {
        let (a, _dir_a) = test_daemon_paths();
        let (b, _dir_b) = test_daemon_paths();
        assert_ne!(a.pid_file(), b.pid_file());
    }
}
