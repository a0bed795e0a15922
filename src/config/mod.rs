//! Application configuration loading, validation, and management.
//!
//! This module provides the top-level `Config` structure that aggregates
//! logging, metrics, and transport configurations. Values come from an
//! optional TOML file, then `HOSTBEE_*` environment variables override them.
//!
//! The configuration is loaded once at startup and passed down explicitly;
//! nothing reads it through a global.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::{logger::LoggerConfig, metrics::MetricsConfig};

pub mod logger;
pub mod metrics;

pub const CONFIG_PATH_ENV: &str = "HOSTBEE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostbee/config.toml";

#[doc(hidden)]
pub fn console_timestamp() -> String {
    let format = time::macros::format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    time::OffsetDateTime::now_utc()
        .format(format)
        .unwrap_or_default()
}

/// Simple macros for printing timestamped messages before the tracing subscriber
/// is initialized. These are used during early configuration loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style($crate::config::console_timestamp()).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style($crate::config::console_timestamp()).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        );
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style($crate::config::console_timestamp()).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur during configuration loading, parsing or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required value is absent from both the file and the environment.
    #[error("Missing required setting '{key}' (set it in the config file or via {env})")]
    Missing { key: &'static str, env: &'static str },

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    #[validate(nested)]
    pub logger: LoggerConfig,

    /// Metrics collection and discovery configuration.
    #[validate(nested)]
    pub metrics: MetricsConfig,

    /// Broker connection configuration.
    #[validate(nested)]
    pub transport: TransportConfig,
}

#[cfg(feature = "hostbee-mqtt")]
pub type TransportConfig = hostbee_mqtt::Config;

/// Placeholder when the binary is built without a transport; the
/// `[transport]` section is accepted and ignored.
#[cfg(not(feature = "hostbee-mqtt"))]
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
pub struct TransportConfig {}

impl Config {
    /// Locates the optional config file, applies environment overrides and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed, an
    /// override is malformed, or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let config = match Self::get_config_path()? {
            Some(path) => Self::read(&path)?,
            None => {
                print_info!("No configuration file found, using defaults and environment");
                Config::default()
            }
        };

        config.with_env(|key| std::env::var(key).ok())?.finish()
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `HOSTBEE_CONFIG` environment variable (the file must exist)
    /// 2. `/etc/hostbee/config.toml`, if present
    fn get_config_path() -> Result<Option<PathBuf>, ConfigError> {
        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(config_path);
            print_info!("Using config from {}: {}", CONFIG_PATH_ENV, path.display());
            if !path.exists() {
                return Err(ConfigError::Config(format!(
                    "{} points to a missing file: {}",
                    CONFIG_PATH_ENV,
                    path.display()
                )));
            }
            return Ok(Some(path));
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(Some(fallback.to_path_buf()));
        }

        Ok(None)
    }

    fn read(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Applies `HOSTBEE_*` overrides read through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("HOSTBEE_DEVICE_NAME") {
            self.metrics.device_name = name;
        }
        if lookup("HOSTBEE_DEBUG").is_some() {
            self.logger.enable_debug();
        }

        #[cfg(feature = "hostbee-mqtt")]
        {
            if let Some(host) = lookup("HOSTBEE_HOST") {
                self.transport.host = host;
            }
            if let Some(raw) = lookup("HOSTBEE_PORT") {
                self.transport.port = match raw.trim().parse::<u16>() {
                    Ok(port) if port != 0 => port,
                    _ => {
                        return Err(ConfigError::Config(format!(
                            "HOSTBEE_PORT is invalid: {}",
                            raw
                        )))
                    }
                };
            }
            if let Some(username) = lookup("HOSTBEE_USERNAME") {
                self.transport.username = Some(username);
            }
            if let Some(password) = lookup("HOSTBEE_PASSWORD") {
                self.transport.password = Some(password);
            }
        }

        Ok(self)
    }

    /// Checks required values, fills derived defaults and validates.
    pub fn finish(mut self) -> Result<Self, ConfigError> {
        if self.metrics.device_name.is_empty() {
            return Err(ConfigError::Missing {
                key: "metrics.device_name",
                env: "HOSTBEE_DEVICE_NAME",
            });
        }

        #[cfg(feature = "hostbee-mqtt")]
        {
            let transport = &mut self.transport;
            if transport.host.is_empty() {
                return Err(ConfigError::Missing {
                    key: "transport.host",
                    env: "HOSTBEE_HOST",
                });
            }
            if transport.username.is_none() {
                return Err(ConfigError::Missing {
                    key: "transport.username",
                    env: "HOSTBEE_USERNAME",
                });
            }
            if transport.password.is_none() {
                return Err(ConfigError::Missing {
                    key: "transport.password",
                    env: "HOSTBEE_PASSWORD",
                });
            }
            if transport.client_id.is_empty() {
                transport.client_id = self.metrics.device_name.clone();
            }
        }

        self.validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(self)
    }
}
