use std::{collections::BTreeSet, process, sync::Arc, time::Duration};

use hostbee::{
    config::Config,
    core::{
        collectors::registry::CollectorRegistry,
        discovery::DeviceIdentity,
        executor::{Executor, Publisher},
    },
    logger::LoggerManager,
    print_error,
};
use tracing::{error, info};

fn log_collectors_table(enabled: &[&str], available: &[&'static str]) {
    let enabled_set: BTreeSet<&str> = enabled.iter().copied().collect();

    // Registry order first, then anything configured but unknown.
    let all_names: Vec<&str> = available
        .iter()
        .copied()
        .chain(enabled_set.iter().copied().filter(|n| !available.contains(n)))
        .collect();

    let name_width = all_names
        .iter()
        .map(|s| s.len())
        .max()
        .unwrap_or(10)
        .max("Collector".len());

    info!("{:<width$} | Status", "Collector", width = name_width);
    info!("{}-+-{}", "-".repeat(name_width), "-".repeat(12));

    for name in all_names {
        let status = match (enabled_set.contains(name), available.contains(&name)) {
            (true, true) => "ENABLED",
            (true, false) => "ENABLED (missing)",
            (false, _) => "DISABLED",
        };
        info!("{:<width$} | {}", name, status, width = name_width);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cfg = Config::new().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting hostbee version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);

    let available = CollectorRegistry::with_defaults(&cfg.metrics.sources);
    let enabled: Vec<&str> = cfg.metrics.enabled.iter().map(String::as_str).collect();
    log_collectors_table(&enabled, &available.list_names());

    let registry = available.filtered(&enabled).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });

    let identity = DeviceIdentity::new(
        cfg.metrics.discovery_prefix.clone(),
        cfg.metrics.device_name.clone(),
    );
    let interval = Duration::from_secs(cfg.metrics.interval);

    #[cfg(feature = "hostbee-mqtt")]
    let code = mqtt::run(&cfg, registry, identity, interval).await;

    #[cfg(not(feature = "hostbee-mqtt"))]
    let code = run_without_transport(registry, identity, interval).await;

    info!("Shutdown complete");
    process::exit(code);
}

/// Drives the executor until it fails or Ctrl+C arrives.
async fn drive(executor: Executor) -> Option<i32> {
    tokio::select! {
        result = executor.run() => Some(match result {
            Ok(()) => 0,
            Err(e) => {
                error!("Reporting stopped: {}", e);
                1
            }
        }),
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
            None
        }
    }
}

#[cfg(feature = "hostbee-mqtt")]
mod mqtt {
    use hostbee::core::discovery::{LivenessDocument, LAST_WILL_PAYLOAD};
    use hostbee_mqtt::{LastWillConfig, MqttInstance, MqttManager};
    use tracing::{debug, warn};

    use super::*;

    pub async fn run(
        cfg: &Config,
        registry: CollectorRegistry,
        identity: DeviceIdentity,
        interval: Duration,
    ) -> i32 {
        let state_topic = identity.state_topic();

        let mut transport = cfg.transport.clone();
        transport.last_will = Some(LastWillConfig::new(state_topic.clone(), LAST_WILL_PAYLOAD));
        info!(
            "Connecting to MQTT broker {}:{} as '{}'",
            transport.host, transport.port, transport.client_id
        );
        let qos = transport.qos;

        let instance = match start(transport).await {
            Ok(instance) => instance,
            Err(e) => {
                error!("Failed to start MQTT client: {}", e);
                return 1;
            }
        };

        tokio::select! {
            result = instance.wait_connected() => {
                if let Err(e) = result {
                    error!("MQTT connection failed: {}", e);
                    instance.shutdown().await;
                    return 1;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C before the broker connection was up");
                instance.shutdown().await;
                return 0;
            }
        }

        let publisher: Arc<dyn Publisher> =
            match hostbee_mqtt::Publisher::new(Arc::new(instance.clone()), qos) {
                Ok(publisher) => Arc::new(publisher),
                Err(e) => {
                    error!("Failed to create publisher: {}", e);
                    instance.shutdown().await;
                    return 1;
                }
            };

        let executor = Executor::new(publisher.clone(), registry, identity, interval);
        info!("Starting reporting loop...");

        let code = tokio::select! {
            outcome = drive(executor) => match outcome {
                Some(code) => code,
                None => {
                    // A clean DISCONNECT suppresses the last will.
                    if let Err(e) = publisher
                        .publish(&state_topic, &LivenessDocument { running: false }, false)
                        .await
                    {
                        warn!("Failed to publish offline state: {}", e);
                    }
                    0
                }
            },
            state = instance.disconnected() => {
                error!("MQTT connection lost: {}", state);
                1
            }
        };

        debug!("Cancellation token triggered, MQTT disconnecting...");
        instance.shutdown().await;
        code
    }

    async fn start(transport: hostbee_mqtt::Config) -> hostbee_mqtt::Result<MqttInstance> {
        MqttManager::from_config(transport)?.build_and_start().await
    }
}

#[cfg(not(feature = "hostbee-mqtt"))]
async fn run_without_transport(
    registry: CollectorRegistry,
    identity: DeviceIdentity,
    interval: Duration,
) -> i32 {
    use tracing::debug;

    info!("Running without MQTT (noop publisher)");

    struct NoopPublisher;

    #[async_trait::async_trait]
    impl Publisher for NoopPublisher {
        async fn publish(
            &self,
            topic: &str,
            data: &(dyn erased_serde::Serialize + Send + Sync),
            retain: bool,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let payload = serde_json::to_string(data)?;
            debug!("[noop] {} (retain: {}): {}", topic, retain, payload);
            Ok(())
        }
    }

    let executor = Executor::new(Arc::new(NoopPublisher), registry, identity, interval);
    drive(executor).await.unwrap_or(0)
}
