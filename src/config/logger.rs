//! `[logger]` section: level, console layout, journald and timestamps.
//!
//! ```toml
//! [logger]
//! level = "info"
//! timestamp_format = { custom = "[hour]:[minute]:[second]" }
//!
//! [logger.console]
//! format = "json"
//!
//! [logger.journald]
//! enabled = true
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{
    error::InvalidFormatDescription,
    format_description::{self, OwnedFormatItem},
};
use validator::{Validate, ValidationError};

/// Verbosity of every output. `RUST_LOG` still wins when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// How event timestamps are rendered on the console.
///
/// `Custom` holds a `time` format description such as
/// `"[hour]:[minute]:[second]"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampFormat {
    #[default]
    Rfc3339,
    Unix,
    Custom(String),
}

impl TimestampFormat {
    /// Compiles a custom description. Built-in formats need none.
    pub fn compile(&self) -> Result<Option<OwnedFormatItem>, InvalidFormatDescription> {
        match self {
            TimestampFormat::Custom(description) => {
                format_description::parse_owned::<2>(description).map(Some)
            }
            _ => Ok(None),
        }
    }
}

fn validate_timestamp_format(format: &TimestampFormat) -> Result<(), ValidationError> {
    let message = match format {
        TimestampFormat::Custom(s) if s.trim().is_empty() => {
            "Custom timestamp format cannot be empty".to_string()
        }
        _ => match format.compile() {
            Ok(_) => return Ok(()),
            Err(e) => format!("Invalid custom timestamp format: {}", e),
        },
    };
    let mut err = ValidationError::new("invalid_timestamp_format");
    err.message = Some(message.into());
    Err(err)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,

    /// `None` or `enabled = false` turns console output off.
    pub console: Option<ConsoleConfig>,

    #[validate(nested)]
    pub journald: Option<JournaldConfig>,

    #[validate(custom(function = "validate_timestamp_format"))]
    pub timestamp_format: TimestampFormat,
}

impl LoggerConfig {
    /// Raises verbosity to at least `debug`. Used by `HOSTBEE_DEBUG`.
    pub fn enable_debug(&mut self) {
        self.level = self.level.min(LogLevel::Debug);
    }

    pub fn console_enabled(&self) -> bool {
        self.console.as_ref().is_some_and(|c| c.enabled)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            level: LogLevel::default(),
            console: Some(ConsoleConfig::default()),
            journald: Some(JournaldConfig::default()),
            timestamp_format: TimestampFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    /// Prefix events with their module path.
    pub show_target: bool,
    pub ansi_colors: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            enabled: true,
            format: LogFormat::Compact,
            show_target: false,
            ansi_colors: true,
        }
    }
}

/// Disabled by default; the console already reaches the journal under systemd.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JournaldConfig {
    pub enabled: bool,

    /// `SYSLOG_IDENTIFIER` of every entry.
    #[validate(length(min = 1, message = "Journald identifier cannot be empty"))]
    pub identifier: String,
}

impl Default for JournaldConfig {
    fn default() -> Self {
        JournaldConfig {
            enabled: false,
            identifier: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.console_enabled());
        assert_eq!(config.journald.unwrap().identifier, "hostbee");
    }

    #[test]
    fn test_enable_debug_never_lowers_verbosity() {
        let mut config = LoggerConfig {
            level: LogLevel::Warn,
            ..Default::default()
        };
        config.enable_debug();
        assert_eq!(config.level, LogLevel::Debug);

        config.level = LogLevel::Trace;
        config.enable_debug();
        assert_eq!(config.level, LogLevel::Trace);
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        assert!(toml::from_str::<LoggerConfig>(r#"level = "verbose""#).is_err());
    }

    #[test]
    fn test_timestamp_format_compiles() {
        assert!(TimestampFormat::Unix.compile().unwrap().is_none());
        assert!(TimestampFormat::Custom("[hour]:[minute]".into())
            .compile()
            .unwrap()
            .is_some());
        assert!(validate_timestamp_format(&TimestampFormat::Custom(" ".into())).is_err());
        assert!(validate_timestamp_format(&TimestampFormat::Custom("[nonsense]".into())).is_err());
    }

    #[test]
    fn test_from_toml() {
        let config: LoggerConfig = toml::from_str(
            r#"
            level = "debug"
            timestamp_format = "unix"

            [console]
            format = "json"
            ansi_colors = false

            [journald]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.timestamp_format, TimestampFormat::Unix);
        let console = config.console.as_ref().unwrap();
        assert_eq!(console.format, LogFormat::Json);
        assert!(console.enabled);
        assert!(!console.ansi_colors);
        let journald = config.journald.unwrap();
        assert!(journald.enabled);
        assert_eq!(journald.identifier, "hostbee");
    }

    #[test]
    fn test_custom_timestamp_from_toml() {
        let config: LoggerConfig =
            toml::from_str(r#"timestamp_format = { custom = "[hour]:[minute]" }"#).unwrap();
        assert_eq!(
            config.timestamp_format,
            TimestampFormat::Custom("[hour]:[minute]".into())
        );
        assert!(config.validate().is_ok());
    }
}
