/// Unified logger for centralized logging configuration

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// Include thread IDs
    pub include_thread_ids: bool,

    /// Include target module paths
    pub include_targets: bool,

    /// Colored output
    pub ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_thread_ids: false,
            include_targets: true,
            ansi: true,
        }
    }
}

impl LoggerConfig {
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }
}

/// Unified logger
pub struct UnifiedLogger;

impl UnifiedLogger {
    /// Initialize the global logger.
    ///
    /// `RUST_LOG` takes precedence over the configured level. Calling this
    /// again once a global subscriber is installed is a no-op.
    pub fn init(config: LoggerConfig) -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))?;

        let console_layer = fmt::layer()
            .with_target(config.include_targets)
            .with_thread_ids(config.include_thread_ids)
            .with_ansi(config.ansi);

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init();

        match installed {
            Ok(()) => tracing::info!("Logging initialized with level: {}", config.level),
            Err(_) => tracing::debug!("Logging already initialized"),
        }
        Ok(())
    }

    /// Initialize with default configuration
    pub fn init_default() -> anyhow::Result<()> {
        Self::init(LoggerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_config_default() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.include_targets);
    }

    #[test]
    fn test_init_is_idempotent() {
        assert!(UnifiedLogger::init(LoggerConfig::with_level("debug")).is_ok());
        assert!(UnifiedLogger::init_default().is_ok());
    }
}
