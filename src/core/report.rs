//! Uniform value and report model shared by every collector.
//!
//! A collector turns whatever it read into a list of [`Report`]s; the cycle
//! driver merges them into one [`ReportCollection`] which is later rendered
//! into discovery and state documents.

use std::{borrow::Cow, collections::HashSet, fmt};

use serde::{ser::SerializeMap, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

use super::discovery::RUNNING_ENTITY;

/// A single metric reading. The active variant decides the JSON type.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Serialized as a JSON number that always keeps a fractional part (`2.0`).
    Double(f64),
    Long(i64),
    UnsignedLong(u64),
    Int(i32),
    Text(String),
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Double(v) => serializer.serialize_f64(*v),
            MetricValue::Long(v) => serializer.serialize_i64(*v),
            MetricValue::UnsignedLong(v) => serializer.serialize_u64(*v),
            MetricValue::Int(v) => serializer.serialize_i32(*v),
            MetricValue::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Double(v) => write!(f, "{v}"),
            MetricValue::Long(v) => write!(f, "{v}"),
            MetricValue::UnsignedLong(v) => write!(f, "{v}"),
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Double(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Long(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::UnsignedLong(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// One named measurement, immutable once built.
///
/// `name` is the JSON key in the state document and the suffix of every
/// topic and identifier derived for the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    name: String,
    value: MetricValue,
    device_class: Option<Cow<'static, str>>,
    unit: Option<Cow<'static, str>>,
}

impl Report {
    pub fn new(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            device_class: None,
            unit: None,
        }
    }

    pub fn with_device_class(mut self, device_class: impl Into<Cow<'static, str>>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<Cow<'static, str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn device_class(&self) -> Option<&str> {
        self.device_class.as_deref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
///
/// Hub object ids are restricted to that set; sensor labels and power supply
/// names read from sysfs are not.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parses a decimal reading, refusing `NaN` and infinities. JSON has no
/// representation for them.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Why a report was refused by a [`ReportCollection`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report name must not be empty")]
    EmptyName,

    #[error("Duplicate report name '{0}' in this cycle")]
    DuplicateName(String),

    #[error("Report name '{0}' is reserved for the liveness entity")]
    ReservedName(String),
}

/// Ordered, append-only set of reports for one cycle.
///
/// Insertion order is preserved in every rendering. Names are unique: the
/// first report with a given name wins.
#[derive(Debug, Clone, Default)]
pub struct ReportCollection {
    reports: Vec<Report>,
    names: HashSet<String>,
}

impl ReportCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `report`, refusing empty, reserved and already-present names.
    pub fn push(&mut self, report: Report) -> Result<(), ReportError> {
        if report.name.is_empty() {
            return Err(ReportError::EmptyName);
        }
        if report.name == RUNNING_ENTITY {
            return Err(ReportError::ReservedName(report.name));
        }
        if !self.names.insert(report.name.clone()) {
            return Err(ReportError::DuplicateName(report.name));
        }
        self.reports.push(report);
        Ok(())
    }

    /// Appends every report from `reports`, logging and dropping the rejected ones.
    ///
    /// Returns how many were accepted.
    pub fn extend_from(&mut self, source: &str, reports: impl IntoIterator<Item = Report>) -> usize {
        let mut accepted = 0;
        for report in reports {
            match self.push(report) {
                Ok(()) => accepted += 1,
                Err(e) => warn!("Dropping report from '{}': {}", source, e),
            }
        }
        accepted
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.name == name)
    }
}

impl<'a> IntoIterator for &'a ReportCollection {
    type Item = &'a Report;
    type IntoIter = std::slice::Iter<'a, Report>;

    fn into_iter(self) -> Self::IntoIter {
        self.reports.iter()
    }
}

/// Renders as a JSON object `{ name: value, ... }` in insertion order.
impl Serialize for ReportCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.reports.len()))?;
        for report in &self.reports {
            map.serialize_entry(report.name(), report.value())?;
        }
        map.end()
    }
}
