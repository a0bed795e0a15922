//! Configuration structures for metrics collection and discovery.
//!
//! Controls the device identity used in topics, the reporting interval,
//! which collectors run, and where the `/proc` and `/sys` trees are read
//! from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::discovery::DEFAULT_DISCOVERY_PREFIX;

/// Every built-in collector, in the order they run.
pub const DEFAULT_COLLECTORS: [&str; 6] = [
    "load_average",
    "uptime",
    "memory",
    "hwmon",
    "power",
    "pressure",
];

/// Top-level metrics configuration container.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricsConfig {
    /// Device name used as a topic segment and as the discovery device
    /// identifier. Required.
    #[validate(custom(function = "validate_topic_segment"))]
    pub device_name: String,

    /// First topic segment of every discovery and state topic.
    #[validate(custom(function = "validate_prefix"))]
    pub discovery_prefix: String,

    /// Seconds between two reporting cycles.
    #[validate(range(min = 1, message = "Interval must be at least 1 second"))]
    pub interval: u64,

    /// Collectors to run. Order is fixed by the registry, not by this list.
    #[validate(length(
        min = 1,
        message = "At least one collector must be enabled, possible values: load_average, uptime, memory, hwmon, power, pressure"
    ))]
    pub enabled: Vec<String>,

    #[validate(nested)]
    pub sources: SourcesConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            interval: 60,
            enabled: DEFAULT_COLLECTORS.iter().map(|s| s.to_string()).collect(),
            sources: SourcesConfig::default(),
        }
    }
}

/// Roots of the pseudo-filesystems collectors read from. Overridable so a
/// container can point at the host's mounts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourcesConfig {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
        }
    }
}

/// A topic segment must be non-empty and free of separators and wildcards.
fn validate_topic_segment(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("device_name is required".into());
        return Err(err);
    }
    if value.contains(['/', '+', '#']) || value.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("invalid_topic_segment");
        err.message = Some(format!("'{}' must not contain '/', '+', '#' or spaces", value).into());
        return Err(err);
    }
    Ok(())
}

/// The prefix may span several levels (`a/b`) but cannot hold wildcards
/// or empty levels.
fn validate_prefix(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.contains(['+', '#']) || value.split('/').any(str::is_empty) {
        let mut err = ValidationError::new("invalid_discovery_prefix");
        err.message = Some(format!("Invalid discovery prefix: '{}'", value).into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MetricsConfig {
        MetricsConfig {
            device_name: "host1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = valid();
        assert_eq!(config.discovery_prefix, "homeassistant");
        assert_eq!(config.interval, 60);
        assert_eq!(config.enabled, DEFAULT_COLLECTORS);
        assert_eq!(config.sources.proc_root, PathBuf::from("/proc"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_name_required() {
        let errors = MetricsConfig::default().validate().unwrap_err();
        assert!(errors.field_errors().contains_key("device_name"));
    }

    #[test]
    fn test_device_name_rejects_topic_characters() {
        for bad in ["a/b", "a+", "#", "my host"] {
            let config = MetricsConfig {
                device_name: bad.into(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_prefix_validation() {
        assert!(validate_prefix("homeassistant").is_ok());
        assert!(validate_prefix("site/hass").is_ok());
        assert!(validate_prefix("").is_err());
        assert!(validate_prefix("hass/").is_err());
        assert!(validate_prefix("ha+").is_err());
    }

    #[test]
    fn test_interval_and_enabled_bounds() {
        let config = MetricsConfig {
            interval: 0,
            enabled: Vec::new(),
            ..valid()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("interval"));
        assert!(errors.field_errors().contains_key("enabled"));
    }

    #[test]
    fn test_from_toml() {
        let config: MetricsConfig = toml::from_str(
            r#"
            device_name = "nas"
            interval = 30
            enabled = ["memory", "pressure"]

            [sources]
            proc_root = "/host/proc"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_name, "nas");
        assert_eq!(config.interval, 30);
        assert_eq!(config.enabled, ["memory", "pressure"]);
        assert_eq!(config.sources.proc_root, PathBuf::from("/host/proc"));
        assert_eq!(config.sources.sys_root, PathBuf::from("/sys"));
    }
}
