//! Topic naming and document synthesis for hub auto-discovery.
//!
//! Every entity gets a retained discovery document on
//! `<prefix>/sensor/<device>/<entity>/config` that points the hub at the
//! shared state topic `<prefix>/sensor/<device>/state`, where each cycle
//! publishes one JSON object holding all current values.

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::report::{Report, ReportCollection};

pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Liveness entity. Always the first member of the state document.
pub const RUNNING_ENTITY: &str = "running";

/// Registered as the last will on the state topic.
pub const LAST_WILL_PAYLOAD: &str = r#"{"running":false}"#;

/// Liveness-only state document, published on a clean shutdown where the
/// broker does not deliver the last will.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessDocument {
    pub running: bool,
}

pub fn state_topic(prefix: &str, device_name: &str) -> String {
    format!("{}/sensor/{}/state", prefix, device_name)
}

pub fn discovery_topic(prefix: &str, device_name: &str, entity: &str) -> String {
    format!("{}/sensor/{}/{}/config", prefix, device_name, entity)
}

pub fn unique_id(device_name: &str, entity: &str) -> String {
    format!("{}_{}", device_name, entity)
}

pub fn value_template(entity: &str) -> String {
    format!("{{{{ value_json['{}'] }}}}", entity)
}

/// Device grouping shared by every discovery document of this host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo<'a> {
    pub name: &'a str,
    pub identifiers: [&'a str; 1],
}

/// Discovery payload for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryDocument<'a> {
    pub name: &'a str,
    pub state_topic: String,
    pub unique_id: String,
    pub value_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'a str>,
    pub device: DeviceInfo<'a>,
}

/// State payload: `{"running": true, <report>: <value>, ...}`.
#[derive(Debug, Clone, Copy)]
pub struct StateDocument<'a> {
    reports: &'a ReportCollection,
}

impl Serialize for StateDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.reports.len() + 1))?;
        map.serialize_entry(RUNNING_ENTITY, &true)?;
        for report in self.reports {
            map.serialize_entry(report.name(), report.value())?;
        }
        map.end()
    }
}

/// Topic namespace and device grouping for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    prefix: String,
    device_name: String,
}

impl DeviceIdentity {
    pub fn new(prefix: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            device_name: device_name.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn state_topic(&self) -> String {
        state_topic(&self.prefix, &self.device_name)
    }

    pub fn discovery_topic(&self, entity: &str) -> String {
        discovery_topic(&self.prefix, &self.device_name, entity)
    }

    pub fn discovery<'a>(
        &'a self,
        entity: &'a str,
        device_class: Option<&'a str>,
        unit: Option<&'a str>,
    ) -> DiscoveryDocument<'a> {
        DiscoveryDocument {
            name: entity,
            state_topic: self.state_topic(),
            unique_id: unique_id(&self.device_name, entity),
            value_template: value_template(entity),
            device_class,
            unit_of_measurement: unit,
            device: DeviceInfo {
                name: &self.device_name,
                identifiers: [&self.device_name],
            },
        }
    }

    pub fn report_discovery<'a>(&'a self, report: &'a Report) -> DiscoveryDocument<'a> {
        self.discovery(report.name(), report.device_class(), report.unit())
    }

    /// The liveness entity has neither device class nor unit.
    pub fn running_discovery(&self) -> DiscoveryDocument<'_> {
        self.discovery(RUNNING_ENTITY, None, None)
    }

    pub fn state<'a>(&self, reports: &'a ReportCollection) -> StateDocument<'a> {
        StateDocument { reports }
    }
}
