//! Logging setup for provider binaries
//!
//! Terraform owns the plugin's stdout for the handshake, so logs go to stderr.
//! The level follows `TF_LOG` when it names a level we understand.

use std::str::FromStr;
use tracing::Level;

/// Log level for the provider process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level from `TF_LOG`, or `fallback` when unset or unrecognised
    pub fn from_env_or(fallback: LogLevel) -> Self {
        std::env::var("TF_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" | "json" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Install a stderr fmt subscriber. Returns false if one was already installed.
pub fn init_logging(level: LogLevel) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn parses_terraform_levels() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("json".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    #[serial]
    fn falls_back_when_tf_log_unset() {
        std::env::remove_var("TF_LOG");
        assert_eq!(LogLevel::from_env_or(LogLevel::Warn), LogLevel::Warn);

        std::env::set_var("TF_LOG", "trace");
        assert_eq!(LogLevel::from_env_or(LogLevel::Warn), LogLevel::Trace);
        std::env::remove_var("TF_LOG");
    }

    #[test]
    fn second_init_is_rejected() {
        init_logging(LogLevel::Info);
        assert!(!init_logging(LogLevel::Debug));
    }
}
