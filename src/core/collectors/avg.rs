use std::path::PathBuf;

use super::{
    error::{CollectorError, CollectorResult},
    sysfs,
    traits::{DataProducer, IntoReports},
};
use crate::core::report::{parse_finite, Report};

/// System load average over the 1, 5 and 15 minute windows.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadAverage {
    pub one_minute: f64,
    pub five_minutes: f64,
    pub fifteen_minutes: f64,
}

impl IntoReports for LoadAverage {
    fn into_reports(self) -> Vec<Report> {
        vec![
            Report::new("load1", self.one_minute),
            Report::new("load5", self.five_minutes),
            Report::new("load15", self.fifteen_minutes),
        ]
    }
}

/// Collector for `<proc>/loadavg`.
#[derive(Debug, Clone)]
pub struct LoadAverageCollector {
    proc_root: PathBuf,
}

impl LoadAverageCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Parses `"1.23 1.45 1.67 1/234 12345"`. Only the three samples are
    /// read; the scheduler counters that follow are ignored.
    fn parse(content: &str, location: &str) -> CollectorResult<LoadAverage> {
        let mut parts = content.split_whitespace();
        let mut sample = |metric: &str| -> CollectorResult<f64> {
            let raw = parts.next().ok_or_else(|| CollectorError::InvalidFormat {
                location: location.to_string(),
                reason: "Expected at least 3 fields".to_string(),
            })?;
            parse_finite(raw).ok_or_else(|| CollectorError::ParseError {
                metric: metric.to_string(),
                location: location.to_string(),
                reason: format!("invalid value: {}", raw),
            })
        };

        Ok(LoadAverage {
            one_minute: sample("load1")?,
            five_minutes: sample("load5")?,
            fifteen_minutes: sample("load15")?,
        })
    }
}

impl Default for LoadAverageCollector {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait::async_trait]
impl DataProducer for LoadAverageCollector {
    type Output = LoadAverage;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let path = self.proc_root.join("loadavg");
        let content = sysfs::read_to_string(&path).await?;
        Self::parse(&content, &path.display().to_string())
    }
}
