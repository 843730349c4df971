//! Bounds checking for the CLI-facing configuration knobs (§6.3).

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate `config` against the bounds implied by the CLI flag ranges:
/// workers `1..=64`, queue-size and max-connections `1..=65536`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first out-of-range field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    let workers = config.worker_pool.worker_count;
    if !(1..=64).contains(&workers) {
        return Err(ConfigError::Invalid(format!(
            "workers must be in 1..=64, got {workers}"
        )));
    }
    let queue_size = config.worker_pool.queue_capacity;
    if !(1..=65536).contains(&queue_size) {
        return Err(ConfigError::Invalid(format!(
            "queue-size must be in 1..=65536, got {queue_size}"
        )));
    }
    let max_connections = config.max_connections as usize;
    if !(1..=65536).contains(&max_connections) {
        return Err(ConfigError::Invalid(format!(
            "max-connections must be in 1..=65536, got {max_connections}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let mut cfg = Config::default();
        cfg.worker_pool.worker_count = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn workers_above_64_rejected() {
        let mut cfg = Config::default();
        cfg.worker_pool.worker_count = 65;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn max_connections_above_65536_rejected() {
        let mut cfg = Config::default();
        cfg.max_connections = 65537;
        assert!(validate(&cfg).is_err());
    }
}
