use std::path::PathBuf;

use tracing::{trace, warn};

use super::{
    error::{CollectorError, CollectorResult},
    sysfs,
    traits::{DataProducer, IntoReports},
};
use crate::core::report::{sanitize_name, Report};

/// Charge level of one power supply entry that exposes `capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub name: String,
    /// Percent, always within 0..=100.
    pub capacity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PowerBuffer {
    batteries: Vec<Battery>,
}

impl PowerBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            batteries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, battery: Battery) {
        self.batteries.push(battery);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Battery> {
        self.batteries.iter()
    }

    pub fn len(&self) -> usize {
        self.batteries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batteries.is_empty()
    }
}

impl IntoReports for PowerBuffer {
    fn into_reports(self) -> Vec<Report> {
        self.batteries
            .into_iter()
            .map(|battery| {
                Report::new(battery.name, battery.capacity)
                    .with_device_class("battery")
                    .with_unit("%")
            })
            .collect()
    }
}

/// Enumerates `<sys>/class/power_supply` and reports the `capacity`
/// attribute of every entry that has one. Mains adapters and USB supplies
/// have no such attribute and are skipped.
#[derive(Debug, Clone)]
pub struct PowerCollector {
    sys_root: PathBuf,
}

impl PowerCollector {
    pub fn new(sys_root: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
        }
    }

    fn parse_capacity(raw: &str, location: &str) -> CollectorResult<i32> {
        let value = raw
            .trim()
            .parse::<i32>()
            .map_err(|_| CollectorError::ParseError {
                metric: "capacity".to_string(),
                location: location.to_string(),
                reason: format!("invalid value: {:?}", raw.trim()),
            })?;

        if !(0..=100).contains(&value) {
            return Err(CollectorError::InvalidFormat {
                location: location.to_string(),
                reason: format!("capacity {} outside 0..=100", value),
            });
        }
        Ok(value)
    }
}

impl Default for PowerCollector {
    fn default() -> Self {
        Self::new("/sys")
    }
}

#[async_trait::async_trait]
impl DataProducer for PowerCollector {
    type Output = PowerBuffer;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let root = self.sys_root.join("class").join("power_supply");
        let entries = sysfs::list_dir(&root).await?;
        let mut buffer = PowerBuffer::with_capacity(entries.len());

        for entry in entries {
            let path = root.join(&entry).join("capacity");
            let raw = match sysfs::read_optional(&path, sysfs::ATTRIBUTE_LIMIT).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    trace!("Power supply {} has no capacity attribute", entry);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping power supply {}: {}", entry, e);
                    continue;
                }
            };

            match Self::parse_capacity(&raw, &path.display().to_string()) {
                Ok(capacity) => buffer.push(Battery {
                    name: sanitize_name(&entry),
                    capacity,
                }),
                Err(e) => warn!("Skipping power supply {}: {}", entry, e),
            }
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;
    use tracing_test::traced_test;

    use super::*;
    use crate::core::report::MetricValue;

    fn supply(root: &Path, name: &str, capacity: Option<&str>) {
        let dir = root.join("class/power_supply").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("type"), "Battery\n").unwrap();
        if let Some(capacity) = capacity {
            std::fs::write(dir.join("capacity"), capacity).unwrap();
        }
    }

    #[tokio::test]
    async fn test_entry_without_capacity_is_skipped() {
        let dir = TempDir::new().unwrap();
        supply(dir.path(), "BAT0", Some("42\n"));
        supply(dir.path(), "AC", None);

        let reports = PowerCollector::new(dir.path())
            .produce()
            .await
            .unwrap()
            .into_reports();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name(), "BAT0");
        assert_eq!(reports[0].value(), &MetricValue::Int(42));
        assert_eq!(reports[0].device_class(), Some("battery"));
        assert_eq!(reports[0].unit(), Some("%"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_invalid_capacities_warn() {
        let dir = TempDir::new().unwrap();
        supply(dir.path(), "BAT0", Some("full"));
        supply(dir.path(), "BAT1", Some("150"));
        supply(dir.path(), "BAT2", Some(&"9".repeat(sysfs::ATTRIBUTE_LIMIT + 1)));
        supply(dir.path(), "BAT3", Some("0"));

        let buffer = PowerCollector::new(dir.path()).produce().await.unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.iter().next().unwrap().name, "BAT3");
        assert!(logs_contain("Skipping power supply BAT0"));
        assert!(logs_contain("Skipping power supply BAT1"));
        assert!(logs_contain("Skipping power supply BAT2"));
    }

    #[test]
    fn test_parse_capacity_bounds() {
        assert_eq!(PowerCollector::parse_capacity("100\n", "c").unwrap(), 100);
        assert!(PowerCollector::parse_capacity("-1", "c").is_err());
        assert!(PowerCollector::parse_capacity("", "c").is_err());
    }

    #[tokio::test]
    async fn test_no_power_supply_class() {
        let dir = TempDir::new().unwrap();
        let buffer = PowerCollector::new(dir.path()).produce().await.unwrap();
        assert!(buffer.is_empty());
    }
}
