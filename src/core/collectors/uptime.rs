use std::path::PathBuf;

use super::{
    error::{CollectorError, CollectorResult},
    sysfs,
    traits::{DataProducer, IntoReports},
};
use crate::core::report::{parse_finite, Report};

/// Time since boot, read from `<proc>/uptime`.
#[derive(Debug, Clone, PartialEq)]
pub struct UptimeInfo {
    /// Seconds since boot, with fractional precision.
    pub uptime_seconds: f64,
}

impl IntoReports for UptimeInfo {
    fn into_reports(self) -> Vec<Report> {
        vec![Report::new("uptime", self.uptime_seconds)
            .with_device_class("duration")
            .with_unit("s")]
    }
}

#[derive(Debug, Clone)]
pub struct UptimeCollector {
    proc_root: PathBuf,
}

impl UptimeCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Parses `"123456.78 987654.32"`. Only the first field is read.
    fn parse(content: &str, location: &str) -> CollectorResult<UptimeInfo> {
        let raw = content.split_whitespace().next().ok_or_else(|| CollectorError::InvalidFormat {
            location: location.to_string(),
            reason: "Expected at least 1 field".to_string(),
        })?;

        let uptime_seconds = parse_finite(raw).ok_or_else(|| CollectorError::ParseError {
            metric: "uptime".to_string(),
            location: location.to_string(),
            reason: format!("invalid value: {}", raw),
        })?;

        Ok(UptimeInfo { uptime_seconds })
    }
}

impl Default for UptimeCollector {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait::async_trait]
impl DataProducer for UptimeCollector {
    type Output = UptimeInfo;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let path = self.proc_root.join("uptime");
        let content = sysfs::read_to_string(&path).await?;
        Self::parse(&content, &path.display().to_string())
    }
}
