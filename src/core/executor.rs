//! Reporting cycle driver.
//!
//! The `Executor` runs every enabled collector in registry order, merges the
//! reports into one collection, announces entities it has not announced yet
//! and publishes the state document. It then sleeps for the rest of the
//! interval and starts over.

use std::{collections::HashSet, sync::Arc};

use erased_serde::Serialize;
use thiserror::Error;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    collectors::{error::CollectorError, registry::CollectorRegistry},
    discovery::{DeviceIdentity, RUNNING_ENTITY},
    report::ReportCollection,
};

/// Trait for publishers that can send documents to the broker.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        data: &(dyn Serialize + Send + Sync),
        retain: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Failures that end the reporting loop.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Mandatory collector '{name}' failed")]
    MandatoryCollector {
        name: &'static str,
        #[source]
        source: CollectorError,
    },

    #[error("Failed to publish to '{topic}': {source}")]
    Publish {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Where the driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing announced yet. The first cycle announces the liveness entity
    /// and every collected entity.
    Announcing,
    /// Steady state. Only entity names never seen before are announced.
    Reporting,
}

pub struct Executor {
    publisher: Arc<dyn Publisher>,
    registry: CollectorRegistry,
    identity: DeviceIdentity,
    interval: Duration,
    state: DriverState,
    announced: HashSet<String>,
}

impl Executor {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        registry: CollectorRegistry,
        identity: DeviceIdentity,
        interval: Duration,
    ) -> Self {
        Self {
            publisher,
            registry,
            identity,
            interval,
            state: DriverState::Announcing,
            announced: HashSet::new(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Runs cycles until one fails fatally.
    pub async fn run(mut self) -> Result<(), ExecutorError> {
        info!(
            "Reporting started for '{}' (interval: {}s, collectors: {})",
            self.identity.device_name(),
            self.interval.as_secs(),
            self.registry.len()
        );

        loop {
            let start = Instant::now();
            self.run_cycle().await?;

            let elapsed = start.elapsed();
            debug!("Cycle finished in {:?}", elapsed);
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
    }

    /// Collects, announces what is new, then publishes the state document.
    pub async fn run_cycle(&mut self) -> Result<(), ExecutorError> {
        let reports = self.collect().await?;
        self.announce(&reports).await?;

        let topic = self.identity.state_topic();
        self.publish(&topic, &self.identity.state(&reports), false)
            .await?;
        debug!("Published {} reports to '{}'", reports.len(), topic);
        Ok(())
    }

    /// Runs every collector sequentially and merges their reports.
    pub async fn collect(&self) -> Result<ReportCollection, ExecutorError> {
        let mut reports = ReportCollection::new();

        for collector in self.registry.iter() {
            let name = collector.name();
            match collector.collect().await {
                Ok(produced) => {
                    let added = reports.extend_from(name, produced);
                    debug!("Collected {} reports from '{}'", added, name);
                }
                Err(source) if collector.is_mandatory() => {
                    return Err(ExecutorError::MandatoryCollector { name, source });
                }
                Err(e) => warn!("Collector '{}' failed: {}", name, e),
            }
        }

        Ok(reports)
    }

    async fn announce(&mut self, reports: &ReportCollection) -> Result<(), ExecutorError> {
        if self.state == DriverState::Announcing {
            info!("Announcing device '{}'", self.identity.device_name());
            let topic = self.identity.discovery_topic(RUNNING_ENTITY);
            self.publish(&topic, &self.identity.running_discovery(), true)
                .await?;
            self.announced.insert(RUNNING_ENTITY.to_string());
        }

        for report in reports {
            if self.announced.contains(report.name()) {
                continue;
            }
            if self.state == DriverState::Reporting {
                info!("Announcing new entity '{}'", report.name());
            }

            let topic = self.identity.discovery_topic(report.name());
            self.publish(&topic, &self.identity.report_discovery(report), true)
                .await?;
            self.announced.insert(report.name().to_string());
        }

        self.state = DriverState::Reporting;
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        data: &(dyn Serialize + Send + Sync),
        retain: bool,
    ) -> Result<(), ExecutorError> {
        self.publisher
            .publish(topic, data, retain)
            .await
            .map_err(|source| ExecutorError::Publish {
                topic: topic.to_string(),
                source,
            })
    }
}

/// MQTT-specific publisher implementation.
#[cfg(feature = "hostbee-mqtt")]
#[async_trait::async_trait]
impl Publisher for hostbee_mqtt::Publisher {
    async fn publish(
        &self,
        topic: &str,
        data: &(dyn Serialize + Send + Sync),
        retain: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        hostbee_mqtt::Publisher::publish(self, topic, data, retain)
            .await
            .map_err(|e| Box::new(e) as _)
    }
}
