//! Logging setup built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// Single-line compact format.
    Compact,
    /// Structured JSON, one object per line.
    Json,
}

/// Where log output is written.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Write to stderr (the default; stdout is reserved for wire protocol
    /// traffic when running attached to a terminal during `--test-*`).
    #[default]
    Stderr,
    /// Write to a file at the given path, in addition to stderr.
    File(std::path::PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    format: LogFormat,
    target: LogTarget,
    directives: Vec<String>,
}

impl LogConfig {
    /// Start from a base level (`"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Also write log output to `path`.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.target = LogTarget::File(path.into());
        self
    }

    /// Add an extra `EnvFilter` directive (e.g. `"vxd_daemon=trace"`).
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));
        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }
}

/// Install a global tracing subscriber built from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InitError`] if a global subscriber is already
/// installed, or [`TelemetryError::IoError`] if the configured log file
/// cannot be opened.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter();

    let log_file = match &config.target {
        LogTarget::Stderr => None,
        LogTarget::File(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match (config.format, log_file) {
        (LogFormat::Json, Some(file)) => builder
            .json()
            .with_writer(file.with_max_level(tracing::Level::TRACE).and(std::io::stderr))
            .try_init(),
        (LogFormat::Json, None) => builder.json().try_init(),
        (LogFormat::Compact, Some(file)) => builder
            .compact()
            .with_writer(file.with_max_level(tracing::Level::TRACE).and(std::io::stderr))
            .try_init(),
        (LogFormat::Compact, None) => builder.compact().try_init(),
        (LogFormat::Pretty, Some(file)) => builder
            .with_writer(file.with_max_level(tracing::Level::TRACE).and(std::io::stderr))
            .try_init(),
        (LogFormat::Pretty, None) => builder.try_init(),
    };

    result.map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Install the default logging configuration: `info` level, pretty format,
/// stderr only.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_compose() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .with_directive("vxd_daemon=trace");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, vec!["vxd_daemon=trace".to_owned()]);
    }

    #[test]
    fn log_file_target_set() {
        let config = LogConfig::new("info").with_log_file("/tmp/vxd-test.log");
        assert!(matches!(config.target, LogTarget::File(_)));
    }
}
