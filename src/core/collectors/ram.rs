use std::{collections::HashMap, path::PathBuf};

use super::{
    error::{CollectorError, CollectorResult},
    sysfs,
    traits::{DataProducer, IntoReports},
};
use crate::core::report::Report;

/// Physical memory figures from `<proc>/meminfo`, all in kB.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryStats {
    pub mem_total: u64,
    pub mem_free: u64,
    /// `None` on kernels older than 3.14, which lack `MemAvailable`.
    pub mem_available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
}

impl MemoryStats {
    /// Memory in use: `MemTotal - MemAvailable`, or, without `MemAvailable`,
    /// everything that is neither free nor reclaimable page cache.
    pub fn used(&self) -> u64 {
        match self.mem_available {
            Some(available) => self.mem_total.saturating_sub(available),
            None => self
                .mem_total
                .saturating_sub(self.mem_free)
                .saturating_sub(self.buffers)
                .saturating_sub(self.cached),
        }
    }
}

impl IntoReports for MemoryStats {
    fn into_reports(self) -> Vec<Report> {
        vec![
            Report::new("used_memory", self.used())
                .with_device_class("data_size")
                .with_unit("kB"),
            Report::new("total_memory", self.mem_total)
                .with_device_class("data_size")
                .with_unit("kB"),
        ]
    }
}

/// Reads `<proc>/meminfo`. The daemon cannot report anything meaningful
/// without it, so the registry marks this collector mandatory.
#[derive(Debug, Clone)]
pub struct MemoryCollector {
    proc_root: PathBuf,
}

impl MemoryCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn parse_meminfo_content(content: &str, location: &str) -> CollectorResult<MemoryStats> {
        let mut mem_map: HashMap<&str, u64> = HashMap::with_capacity(32);

        for line in content.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            // The unit (kB) is ignored.
            if let Some(Ok(val)) = rest.split_whitespace().next().map(str::parse::<u64>) {
                mem_map.insert(key.trim(), val);
            }
        }

        let field = |name: &str| mem_map.get(name).copied().unwrap_or(0);

        Ok(MemoryStats {
            mem_total: mem_map
                .get("MemTotal")
                .copied()
                .ok_or_else(|| CollectorError::MissingField {
                    field: "MemTotal".to_string(),
                    location: location.to_string(),
                })?,
            mem_free: field("MemFree"),
            mem_available: mem_map.get("MemAvailable").copied(),
            buffers: field("Buffers"),
            cached: field("Cached"),
        })
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait::async_trait]
impl DataProducer for MemoryCollector {
    type Output = MemoryStats;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let path = self.proc_root.join("meminfo");
        let content = sysfs::read_to_string(&path).await?;
        Self::parse_meminfo_content(&content, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::core::report::MetricValue;

    #[test]
    fn test_parse_valid_meminfo() {
        let content = "MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12288000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapTotal:       4096000 kB
";
        let stats = MemoryCollector::parse_meminfo_content(content, "meminfo").unwrap();
        assert_eq!(stats.mem_total, 16384000);
        assert_eq!(stats.mem_available, Some(12288000));
        assert_eq!(stats.used(), 4096000);
    }

    #[test]
    fn test_used_without_mem_available() {
        let content = "MemTotal: 10000 kB
MemFree: 2000 kB
Buffers: 1000 kB
Cached: 3000 kB
";
        let stats = MemoryCollector::parse_meminfo_content(content, "meminfo").unwrap();
        assert_eq!(stats.mem_available, None);
        assert_eq!(stats.used(), 4000);
    }

    #[test]
    fn test_parse_missing_memtotal() {
        let content = "MemFree: 8192000 kB\nMemAvailable: 12288000 kB\n";
        let result = MemoryCollector::parse_meminfo_content(content, "meminfo");
        assert!(matches!(
            result,
            Err(CollectorError::MissingField { ref field, .. }) if field == "MemTotal"
        ));
    }

    #[test]
    fn test_parse_malformed_lines() {
        let content = "garbage line
MemTotal:       16384000 kB
MemFree:        not_a_number kB
:::
MemAvailable:   16384000 kB
";
        let stats = MemoryCollector::parse_meminfo_content(content, "meminfo").unwrap();
        assert_eq!(stats.mem_free, 0);
        assert_eq!(stats.used(), 0);
    }

    #[test]
    fn test_used_never_underflows() {
        let stats = MemoryStats {
            mem_total: 100,
            mem_available: Some(200),
            ..Default::default()
        };
        assert_eq!(stats.used(), 0);
    }

    #[tokio::test]
    async fn test_memory_reports() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("meminfo"),
            "MemTotal: 8192 kB\nMemFree: 1024 kB\nMemAvailable: 6144 kB\n",
        )
        .unwrap();

        let reports = MemoryCollector::new(dir.path())
            .produce()
            .await
            .unwrap()
            .into_reports();

        assert_eq!(reports[0].name(), "used_memory");
        assert_eq!(reports[0].value(), &MetricValue::UnsignedLong(2048));
        assert_eq!(reports[0].device_class(), Some("data_size"));
        assert_eq!(reports[0].unit(), Some("kB"));
        assert_eq!(reports[1].name(), "total_memory");
        assert_eq!(reports[1].value(), &MetricValue::UnsignedLong(8192));
    }
}
