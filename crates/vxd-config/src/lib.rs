#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the voxel daemon runtime.
//!
//! [`Config`] consolidates every tunable the CLI surface (§6.3) exposes:
//! socket/pid-file paths, worker pool sizing, protocol mode, and the render
//! artifact manager's TTL knobs. It starts from [`Config::default`] and is
//! overlaid with CLI flags via [`Config::apply_cli`].
//!
//! Real configuration-FILE parsing (the `-c/--config <file>` flag's target)
//! is intentionally not implemented: the upstream design only ever shipped
//! defaults plus CLI overrides, and no wire format for a config file was
//! ever specified. The path is recorded on [`Config::config_path`] for
//! diagnostic display (`--status`) but its contents are never read.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{Config, ProtocolMode, RenderConfig, ScriptPoolConfig, WorkerPoolConfig};

impl Config {
    /// Build the default configuration, apply environment overrides, and
    /// validate it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the result fails validation.
    pub fn load_defaults() -> ConfigResult<Self> {
        let mut config = Self::default();
        env::apply_env_overrides(&mut config);
        validate::validate(&config)?;
        Ok(config)
    }

    /// Validate this configuration against the CLI flag ranges.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first out-of-range field.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::validate(self)
    }
}
