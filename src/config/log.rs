use std::{fmt::Display, io::IsTerminal};

use clap::ValueEnum;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_ansi_enabled")]
    pub ansi_enabled: bool,

    #[serde(default = "LogConfig::default_log_format")]
    pub format: LogFormat,

    #[serde(default = "LogConfig::default_log_output")]
    pub output: LogOutput,

    #[serde(default = "LogConfig::default_log_level")]
    pub level: LogLevel,

    // One level per target in log/targets.rs
    #[serde(default = "LogConfig::default_log_level")]
    pub billing_level: LogLevel,

    #[serde(default = "LogConfig::default_log_level")]
    pub config_level: LogLevel,

    #[serde(default = "LogConfig::default_log_level")]
    pub desk_level: LogLevel,

    #[serde(default = "LogConfig::default_log_level")]
    pub lifecycle_level: LogLevel,

    #[serde(default = "LogConfig::default_log_level")]
    pub payment_level: LogLevel,

    #[serde(default = "LogConfig::default_log_level")]
    pub store_level: LogLevel,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    // Lowercase, capitalised or upper case are accepted
    #[serde(alias = "Pretty", alias = "pretty", alias = "PRETTY")]
    Pretty,
    #[serde(alias = "Structured", alias = "structured", alias = "STRUCTURED")]
    Structured,
    #[serde(alias = "Text", alias = "text", alias = "TEXT")]
    Text,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[serde(alias = "Stdout", alias = "stdout", alias = "STDOUT")]
    Stdout,
    #[serde(alias = "Stderr", alias = "stderr", alias = "STDERR")]
    Stderr,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "Error", alias = "error", alias = "ERROR")]
    Error,
    #[serde(alias = "Warn", alias = "warn", alias = "WARN")]
    Warn,
    #[serde(alias = "Info", alias = "info", alias = "INFO")]
    Info,
    #[serde(alias = "Debug", alias = "debug", alias = "DEBUG")]
    Debug,
    #[serde(alias = "Trace", alias = "trace", alias = "TRACE")]
    Trace,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        write!(f, "{s}")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::with_level(LogConfig::default_log_level())
    }
}

impl LogConfig {
    pub fn with_level(level: LogLevel) -> Self {
        LogConfig {
            format: LogConfig::default_log_format(),
            output: LogConfig::default_log_output(),
            ansi_enabled: LogConfig::default_ansi_enabled(),
            level,
            billing_level: level,
            config_level: level,
            desk_level: level,
            lifecycle_level: level,
            payment_level: level,
            store_level: level,
        }
    }

    /// Pretty output for a person at a terminal, JSON lines when piped.
    pub fn default_log_format() -> LogFormat {
        if std::io::stdout().is_terminal() {
            LogFormat::Pretty
        } else {
            LogFormat::Structured
        }
    }

    pub fn default_ansi_enabled() -> bool {
        std::io::stdout().is_terminal()
    }

    // Command output owns stdout.
    pub const fn default_log_output() -> LogOutput {
        LogOutput::Stderr
    }

    pub const fn default_log_level() -> LogLevel {
        LogLevel::Warn
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{DeskConfig, LogFormat, LogLevel, LogOutput};
    use crate::error::Error;
    use crate::test_helpers::with_no_desk_vars;

    const TEST_CONFIG: &str = "tests/config/frontdesk-test.toml";

    #[test]
    fn log_config_is_almost_case_insensitive() {
        with_no_desk_vars(|| {
            temp_env::with_vars([("DESK_LOG__LEVEL", Some("error"))], || {
                let config = DeskConfig::build(TEST_CONFIG).unwrap();
                assert_eq!(config.log.level, LogLevel::Error);
            });

            temp_env::with_vars([("DESK_LOG__LEVEL", Some("WARN"))], || {
                let config = DeskConfig::build(TEST_CONFIG).unwrap();
                assert_eq!(config.log.level, LogLevel::Warn);
            });

            temp_env::with_vars([("DESK_LOG__OUTPUT", Some("stdout"))], || {
                let config = DeskConfig::build(TEST_CONFIG).unwrap();
                assert_eq!(config.log.output, LogOutput::Stdout);
            });

            temp_env::with_vars([("DESK_LOG__FORMAT", Some("Pretty"))], || {
                let config = DeskConfig::build(TEST_CONFIG).unwrap();
                assert_eq!(config.log.format, LogFormat::Pretty);
            });

            temp_env::with_vars([("DESK_LOG__FORMAT", Some("dEbUG"))], || {
                let config = DeskConfig::build(TEST_CONFIG);
                assert!(matches!(config.unwrap_err(), Error::Config(_)));
            });
        });
    }

    #[test]
    fn target_levels_are_set_independently() {
        with_no_desk_vars(|| {
            temp_env::with_vars([("DESK_LOG__LIFECYCLE_LEVEL", Some("debug"))], || {
                let config = DeskConfig::build(TEST_CONFIG).unwrap();
                assert_eq!(config.log.lifecycle_level, LogLevel::Debug);
                assert_eq!(config.log.payment_level, LogLevel::Warn);
            });
        });
    }
}
