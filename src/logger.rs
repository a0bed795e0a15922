//! Centralized logging configuration and initialization manager.
//!
//! The `LoggerManager` validates logging configuration and initializes
//! the global `tracing` subscriber with layers for console and/or systemd
//! journald output.

use std::io;

use thiserror::Error;
use time::{format_description::OwnedFormatItem, OffsetDateTime};
use tracing::instrument;
use tracing_subscriber::{
    fmt::{self, format::Writer, time::FormatTime},
    prelude::*,
    EnvFilter, Layer,
};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, LogFormat, LoggerConfig, TimestampFormat},
    print_info, print_warn,
};

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// General initialization failure with a descriptive message.
    #[error("Logger initialization error: {0}")]
    InitializationError(String),

    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically during journald socket operations.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// No output layers were successfully configured.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Journald failed while console output is also enabled.
    #[error(
        "Failed to initialize journald logger, and console logger is enabled. Please check your configuration."
    )]
    JournaldFailedWithConsoleEnabled,
}

/// Event timestamp rendering selected by `TimestampFormat`.
#[derive(Debug, Clone)]
pub enum LogTimer {
    Rfc3339,
    Unix,
    Custom(OwnedFormatItem),
}

impl LogTimer {
    pub fn from_config(format: &TimestampFormat) -> Result<Self, LoggerError> {
        let compiled = format
            .compile()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))?;
        Ok(match (format, compiled) {
            (_, Some(items)) => LogTimer::Custom(items),
            (TimestampFormat::Unix, None) => LogTimer::Unix,
            (_, None) => LogTimer::Rfc3339,
        })
    }

    fn render(&self, now: OffsetDateTime) -> Result<String, time::error::Format> {
        match self {
            LogTimer::Rfc3339 => now.format(&time::format_description::well_known::Rfc3339),
            LogTimer::Unix => Ok(now.unix_timestamp().to_string()),
            LogTimer::Custom(items) => now.format(items),
        }
    }
}

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let rendered = self
            .render(OffsetDateTime::now_utc())
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", rendered)
    }
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if configuration validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    /// Initializes the global `tracing` subscriber with configured layers.
    ///
    /// Must be called once at startup, before any tracing macros are used.
    /// `RUST_LOG` takes precedence over the configured level.
    #[instrument(skip(self))]
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let mut layers = Vec::new();
        if let Some(console_config) = self.config.console.as_ref().filter(|c| c.enabled) {
            let timer = LogTimer::from_config(&self.config.timestamp_format)?;
            let console_layer =
                self.init_console_logger(console_config, timer, self.filter())?;
            layers.push(console_layer);
        }

        // Journald layer (Linux/systemd only)
        if let Some(journald_config) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match self.init_journald_logger(&journald_config.identifier, self.filter()) {
                Ok(journald_layer) => {
                    layers.push(journald_layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald_config.identifier
                    );
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                    if self.config.console_enabled() {
                        return Err(LoggerError::JournaldFailedWithConsoleEnabled);
                    }
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()))
    }

    /// Constructs a console output layer according to the provided configuration.
    fn init_console_logger(
        &self,
        config: &ConsoleConfig,
        timer: LogTimer,
        filter: EnvFilter,
    ) -> Result<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>, LoggerError> {
        let writer = io::stdout;

        let layer = match config.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_timer(timer)
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_timer(timer)
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_timer(timer)
                .with_target(config.show_target)
                .with_ansi(config.ansi_colors)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        };

        Ok(layer)
    }

    /// Constructs a journald output layer tagged with `identifier`.
    fn init_journald_logger(
        &self,
        identifier: &str,
        filter: EnvFilter,
    ) -> Result<Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>, LoggerError> {
        let journald_layer = tracing_journald::layer()?.with_syslog_identifier(identifier.to_string());
        Ok(journald_layer.with_filter(filter).boxed())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_rejects_invalid_timestamp_format() {
        let config = LoggerConfig {
            timestamp_format: TimestampFormat::Custom("[nonsense]".into()),
            ..Default::default()
        };
        assert!(matches!(
            LoggerManager::new(config),
            Err(LoggerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_timer_formats() {
        let at = datetime!(2024-03-01 12:30:05 UTC);

        let rfc = LogTimer::from_config(&TimestampFormat::Rfc3339).unwrap();
        assert_eq!(rfc.render(at).unwrap(), "2024-03-01T12:30:05Z");

        let unix = LogTimer::from_config(&TimestampFormat::Unix).unwrap();
        assert_eq!(unix.render(at).unwrap(), "1709296205");

        let custom =
            LogTimer::from_config(&TimestampFormat::Custom("[hour]:[minute]".into())).unwrap();
        assert_eq!(custom.render(at).unwrap(), "12:30");
    }

    #[test]
    fn test_no_layers() {
        let config = LoggerConfig {
            console: None,
            journald: None,
            ..Default::default()
        };
        let mut manager = LoggerManager::new(config).unwrap();
        assert!(matches!(manager.init(), Err(LoggerError::NoLayersConfigured)));
    }
}
