use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{
    error::CollectorResult,
    sysfs,
    traits::{DataProducer, IntoReports},
};
use crate::core::report::{parse_finite, sanitize_name, Report};

/// Feature types a hwmon chip may expose. Only `temp` is reported.
const FEATURE_TYPES: [&str; 8] = [
    "temp", "fan", "in", "curr", "power", "energy", "humidity", "intrusion",
];

/// One temperature reading, already converted to °C.
#[derive(Debug, Clone, PartialEq)]
pub struct HwmonSensor {
    /// `<chip>_<label>`
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HwmonBuffer {
    sensors: Vec<HwmonSensor>,
}

impl HwmonBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sensor: HwmonSensor) {
        self.sensors.push(sensor);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HwmonSensor> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

impl IntoReports for HwmonBuffer {
    fn into_reports(self) -> Vec<Report> {
        self.sensors
            .into_iter()
            .map(|sensor| {
                Report::new(sensor.name, sensor.value)
                    .with_device_class("temperature")
                    .with_unit("°C")
            })
            .collect()
    }
}

/// Splits an attribute file name such as `temp3_input` into
/// `("temp", 3, "input")`.
fn parse_feature(file: &str) -> Option<(&str, u32, &str)> {
    let (head, attribute) = file.split_once('_')?;
    let kind = head.trim_end_matches(|c: char| c.is_ascii_digit());
    let index = head[kind.len()..].parse().ok()?;
    Some((kind, index, attribute))
}

/// Enumerates the chips under `<sys>/class/hwmon` and reads every
/// temperature input they expose.
#[derive(Debug, Clone)]
pub struct HwmonCollector {
    sys_root: PathBuf,
}

impl HwmonCollector {
    pub fn new(sys_root: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
        }
    }

    /// `<name>-<device>`, where `<device>` is the basename of the `device`
    /// link or the hwmon directory itself when the link is absent.
    async fn chip_name(dir: &Path, dir_name: &str) -> String {
        let name = match sysfs::read_optional(&dir.join("name"), sysfs::ATTRIBUTE_LIMIT).await {
            Ok(Some(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => dir_name.to_string(),
        };

        let device = tokio::fs::read_link(dir.join("device"))
            .await
            .ok()
            .and_then(|target| {
                target
                    .file_name()
                    .and_then(|base| base.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| dir_name.to_string());

        format!("{}-{}", name, device)
    }

    async fn read_chip(dir: &Path, dir_name: &str, buffer: &mut HwmonBuffer) -> CollectorResult<()> {
        let chip = Self::chip_name(dir, dir_name).await;
        let files = sysfs::list_dir(dir).await?;

        let mut temps: Vec<u32> = Vec::new();
        for file in &files {
            match parse_feature(file) {
                Some(("temp", index, "input")) => temps.push(index),
                Some((kind, _, "input")) if FEATURE_TYPES.contains(&kind) => {
                    debug!("Skipping unmapped {} feature {} on {}", kind, file, chip);
                }
                _ => {}
            }
        }
        temps.sort_unstable();

        for index in temps {
            let input = dir.join(format!("temp{}_input", index));
            let millidegrees = match sysfs::read_bounded(&input, sysfs::ATTRIBUTE_LIMIT).await {
                Ok(raw) => match parse_finite(raw.trim()) {
                    Some(value) => value,
                    None => {
                        debug!("Unparsable temperature {:?} in {}", raw.trim(), input.display());
                        continue;
                    }
                },
                Err(e) => {
                    debug!("Skipping {}: {}", input.display(), e);
                    continue;
                }
            };

            let label_path = dir.join(format!("temp{}_label", index));
            let label = match sysfs::read_optional(&label_path, sysfs::ATTRIBUTE_LIMIT).await {
                Ok(Some(label)) if !label.trim().is_empty() => label.trim().to_string(),
                _ => format!("temp{}", index),
            };

            buffer.push(HwmonSensor {
                name: sanitize_name(&format!("{}_{}", chip, label)),
                value: millidegrees / 1000.0,
            });
        }

        Ok(())
    }
}

impl Default for HwmonCollector {
    fn default() -> Self {
        Self::new("/sys")
    }
}

#[async_trait::async_trait]
impl DataProducer for HwmonCollector {
    type Output = HwmonBuffer;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let root = self.sys_root.join("class").join("hwmon");
        let mut buffer = HwmonBuffer::new();

        for dir_name in sysfs::list_dir(&root).await? {
            let dir = root.join(&dir_name);
            if let Err(e) = Self::read_chip(&dir, &dir_name, &mut buffer).await {
                warn!("Skipping hwmon chip {}: {}", dir_name, e);
            }
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tracing_test::traced_test;

    use super::*;
    use crate::core::report::MetricValue;

    fn chip(root: &Path, dir: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = root.join("class/hwmon").join(dir);
        std::fs::create_dir_all(&path).unwrap();
        for (name, content) in files {
            std::fs::write(path.join(name), content).unwrap();
        }
        path
    }

    #[test]
    fn test_parse_feature() {
        assert_eq!(parse_feature("temp1_input"), Some(("temp", 1, "input")));
        assert_eq!(parse_feature("fan12_label"), Some(("fan", 12, "label")));
        assert_eq!(parse_feature("name"), None);
        assert_eq!(parse_feature("temp_input"), None);
    }

    #[tokio::test]
    async fn test_temperature_with_label() {
        let dir = TempDir::new().unwrap();
        chip(
            dir.path(),
            "hwmon0",
            &[
                ("name", "coretemp\n"),
                ("temp1_input", "45500\n"),
                ("temp1_label", "Package id 0\n"),
                ("temp2_input", "38000\n"),
            ],
        );

        let reports = HwmonCollector::new(dir.path())
            .produce()
            .await
            .unwrap()
            .into_reports();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name(), "coretemp-hwmon0_Package_id_0");
        assert_eq!(reports[0].value(), &MetricValue::Double(45.5));
        assert_eq!(reports[0].device_class(), Some("temperature"));
        assert_eq!(reports[0].unit(), Some("°C"));
        assert_eq!(reports[1].name(), "coretemp-hwmon0_temp2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_chip_name_uses_device_link() {
        let dir = TempDir::new().unwrap();
        let path = chip(dir.path(), "hwmon3", &[("name", "nvme\n"), ("temp1_input", "30000")]);
        let device = dir.path().join("devices/nvme0");
        std::fs::create_dir_all(&device).unwrap();
        std::os::unix::fs::symlink(&device, path.join("device")).unwrap();

        let buffer = HwmonCollector::new(dir.path()).produce().await.unwrap();
        assert_eq!(buffer.iter().next().unwrap().name, "nvme-nvme0_temp1");
    }

    #[traced_test]
    #[tokio::test]
    async fn test_other_features_and_bad_inputs_are_skipped() {
        let dir = TempDir::new().unwrap();
        chip(
            dir.path(),
            "hwmon1",
            &[
                ("name", "acpitz"),
                ("fan1_input", "1200"),
                ("temp1_input", "hot"),
                ("temp2_input", "27800"),
                ("temp3_input", "NaN"),
            ],
        );

        let buffer = HwmonCollector::new(dir.path()).produce().await.unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.iter().next().unwrap().value, 27.8);
        assert!(logs_contain("Skipping unmapped fan feature"));
        assert!(logs_contain("Unparsable temperature"));
    }

    #[tokio::test]
    async fn test_no_hwmon_class() {
        let dir = TempDir::new().unwrap();
        let buffer = HwmonCollector::new(dir.path()).produce().await.unwrap();
        assert!(buffer.is_empty());
    }
}
