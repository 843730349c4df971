//! Environment variable overrides (§6.4).

use crate::types::Config;

/// Name of the environment variable that overrides the render sweeper
/// interval.
pub const RENDER_CLEANUP_INTERVAL_VAR: &str = "RENDER_MANAGER_CLEANUP_INTERVAL";

/// Apply recognized environment variable overrides to `config` in place.
/// Unset or unparsable values are left untouched.
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(raw) = std::env::var(RENDER_CLEANUP_INTERVAL_VAR) {
        if let Ok(secs) = raw.trim().parse::<u64>() {
            config.render.sweep_interval_seconds = secs;
        } else {
            tracing::warn!(
                value = %raw,
                "ignoring non-numeric {RENDER_CLEANUP_INTERVAL_VAR}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn overrides_sweep_interval_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        // SAFETY: serialized by ENV_MUTEX.
        unsafe { std::env::set_var(RENDER_CLEANUP_INTERVAL_VAR, "42") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.render.sweep_interval_seconds, 42);
        unsafe { std::env::remove_var(RENDER_CLEANUP_INTERVAL_VAR) };
    }

    #[test]
    fn ignores_non_numeric_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        // SAFETY: serialized by ENV_MUTEX.
        unsafe { std::env::set_var(RENDER_CLEANUP_INTERVAL_VAR, "not-a-number") };
        let mut cfg = Config::default();
        let before = cfg.render.sweep_interval_seconds;
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.render.sweep_interval_seconds, before);
        unsafe { std::env::remove_var(RENDER_CLEANUP_INTERVAL_VAR) };
    }
}
