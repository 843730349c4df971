//! Render artifact manager (§4.7): a TTL-expiring on-disk cache keyed by
//! absolute path, with background sweeping and optional LRU eviction above
//! a total-bytes cap.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use vxd_core::DaemonError;

/// One tracked render artifact.
#[derive(Debug, Clone)]
pub struct RenderEntry {
    /// Absolute path to the file on disk.
    pub path: PathBuf,
    /// Session this render was produced for, if any.
    pub session_id: Option<String>,
    /// Output format (e.g. `"png"`).
    pub format: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// File size in bytes at registration time.
    pub size_bytes: u64,
    /// `"sha256:<hex>"`, or `"sha256:unavailable"` if hashing failed.
    pub checksum: String,
    /// When this entry was registered.
    pub created_at: SystemTime,
    /// When the sweeper should delete this entry.
    pub expires_at: SystemTime,
    /// Last time this entry was read via `get`, for LRU eviction.
    last_accessed: SystemTime,
}

struct Inner {
    entries: HashMap<PathBuf, RenderEntry>,
}

/// Manages the lifecycle of rendered-image artifacts on disk.
pub struct RenderManager {
    base_dir: PathBuf,
    ttl: Duration,
    max_total_bytes: Option<u64>,
    inner: Mutex<Inner>,
}

impl RenderManager {
    /// Build a manager rooted at `base_dir`, creating it if needed.
    #[must_use]
    pub fn new(base_dir: PathBuf, ttl: Duration, max_total_bytes: Option<u64>) -> Self {
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            warn!(path = %base_dir.display(), error = %e, "failed to create render base directory");
        }
        Self {
            base_dir,
            ttl,
            max_total_bytes,
            inner: Mutex::new(Inner { entries: HashMap::new() }),
        }
    }

    /// Generate a unique path under `base_dir` encoding a timestamp,
    /// session id, random suffix, and extension.
    #[must_use]
    pub fn create_path(&self, session_id: Option<&str>, format: &str) -> PathBuf {
        let unix_ts = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let session = session_id.unwrap_or("none");
        let suffix: u32 = rand::random();
        self.base_dir
            .join(format!("render_{unix_ts}_{session}_{suffix:08x}.{format}"))
    }

    /// Register a produced render file: computes its size and checksum and
    /// records it with a fresh expiry. Checksum failures do not abort
    /// registration.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Filesystem`] if the file's metadata cannot be
    /// read (the file must exist before calling this).
    pub fn register(
        &self,
        path: PathBuf,
        session_id: Option<String>,
        format: String,
        width: u32,
        height: u32,
    ) -> Result<(), DaemonError> {
        let metadata = std::fs::metadata(&path).map_err(|e| DaemonError::Filesystem(e.to_string()))?;
        let size_bytes = metadata.len();
        let checksum = checksum_file(&path).unwrap_or_else(|| "sha256:unavailable".to_owned());
        let now = SystemTime::now();

        let entry = RenderEntry {
            path: path.clone(),
            session_id,
            format,
            width,
            height,
            size_bytes,
            checksum,
            created_at: now,
            expires_at: now + self.ttl,
            last_accessed: now,
        };

        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.entries.insert(path, entry);
        self.evict_lru_over_cap(&mut inner);
        Ok(())
    }

    /// Fetch a tracked entry, bumping its last-accessed time for LRU
    /// purposes.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<RenderEntry> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = inner.entries.get_mut(path)?;
        entry.last_accessed = SystemTime::now();
        Some(entry.clone())
    }

    /// Delete the on-disk file (if present) and drop the tracked entry.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Filesystem`] if the file exists but cannot be
    /// removed.
    pub fn remove(&self, path: &Path) -> Result<(), DaemonError> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| DaemonError::Filesystem(e.to_string()))?;
        }
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .remove(path);
        Ok(())
    }

    /// All tracked entries.
    #[must_use]
    pub fn list(&self) -> Vec<RenderEntry> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .values()
            .cloned()
            .collect()
    }

    /// Delete every entry whose `expires_at` has passed.
    pub fn sweep_expired(&self) {
        let now = SystemTime::now();
        let expired: Vec<PathBuf> = {
            let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner
                .entries
                .values()
                .filter(|e| e.expires_at <= now)
                .map(|e| e.path.clone())
                .collect()
        };
        for path in expired {
            if let Err(e) = self.remove(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove expired render entry");
            } else {
                debug!(path = %path.display(), "removed expired render entry");
            }
        }
    }

    fn evict_lru_over_cap(&self, inner: &mut Inner) {
        let Some(cap) = self.max_total_bytes else {
            return;
        };
        let mut total: u64 = inner.entries.values().map(|e| e.size_bytes).sum();
        if total <= cap {
            return;
        }
        let mut by_age: Vec<(PathBuf, SystemTime)> = inner
            .entries
            .iter()
            .map(|(path, e)| (path.clone(), e.last_accessed))
            .collect();
        by_age.sort_by_key(|(_, accessed)| *accessed);

        for (path, _) in by_age {
            if total <= cap {
                break;
            }
            if let Some(entry) = inner.entries.remove(&path) {
                total = total.saturating_sub(entry.size_bytes);
                let _ = std::fs::remove_file(&entry.path);
                info!(path = %entry.path.display(), "evicted render entry over byte cap");
            }
        }
    }
}

fn checksum_file(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Background sweeper loop: at `interval`, delete expired entries. Exits
/// when `shutdown` reports true.
pub async fn run_sweeper(
    manager: std::sync::Arc<RenderManager>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                manager.sweep_expired();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn register_computes_checksum_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RenderManager::new(dir.path().to_path_buf(), Duration::from_secs(3600), None);
        let path = write_temp_file(&dir, "a.png", b"hello");
        manager.register(path.clone(), None, "png".into(), 4, 4).unwrap();

        let entry = manager.get(&path).unwrap();
        assert_eq!(entry.size_bytes, 5);
        assert!(entry.checksum.starts_with("sha256:"));
        assert_ne!(entry.checksum, "sha256:unavailable");
    }

    #[test]
    fn remove_deletes_file_and_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RenderManager::new(dir.path().to_path_buf(), Duration::from_secs(3600), None);
        let path = write_temp_file(&dir, "a.png", b"hi");
        manager.register(path.clone(), None, "png".into(), 1, 1).unwrap();

        manager.remove(&path).unwrap();
        assert!(!path.exists());
        assert!(manager.get(&path).is_none());
    }

    #[test]
    fn sweep_expired_removes_only_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RenderManager::new(dir.path().to_path_buf(), Duration::from_millis(1), None);
        let path = write_temp_file(&dir, "a.png", b"hi");
        manager.register(path.clone(), None, "png".into(), 1, 1).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        manager.sweep_expired();
        assert!(manager.get(&path).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn eviction_over_cap_removes_least_recently_accessed_first() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RenderManager::new(dir.path().to_path_buf(), Duration::from_secs(3600), Some(5));
        let a = write_temp_file(&dir, "a.png", b"aaa");
        let b = write_temp_file(&dir, "b.png", b"bbb");
        manager.register(a.clone(), None, "png".into(), 1, 1).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        manager.register(b.clone(), None, "png".into(), 1, 1).unwrap();

        assert!(manager.get(&a).is_none());
        assert!(manager.get(&b).is_some());
    }

    #[test]
    fn create_path_is_unique_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RenderManager::new(dir.path().to_path_buf(), Duration::from_secs(3600), None);
        assert_ne!(
            manager.create_path(Some("s1"), "png"),
            manager.create_path(Some("s1"), "png")
        );
    }

    #[test]
    fn create_path_matches_naming_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RenderManager::new(dir.path().to_path_buf(), Duration::from_secs(3600), None);
        let path = manager.create_path(Some("sess-1"), "png");
        let name = path.file_name().unwrap().to_str().unwrap();
        let rest = name.strip_prefix("render_").expect("render_ prefix");
        let rest = rest.strip_suffix(".png").expect("png suffix");
        let parts: Vec<&str> = rest.splitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[1], "sess-1");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
