//! hostbee — host telemetry publisher with hub auto-discovery.
//!
//! Collects load average, uptime, memory, hardware temperatures, battery
//! capacity and pressure-stall information from `/proc` and `/sys`, and
//! publishes them over MQTT as one state document per cycle together with
//! retained discovery documents, so a home-automation hub picks every
//! entity up without manual configuration.
//!
//! ## Modules
//!
//! * `config` — Configuration structures, loading, environment overrides and
//!   validation via the `validator` crate.
//!
//! * `core` — Core runtime components:
//!   - Report model and PSI decoder
//!   - Collector registry and traits
//!   - Topic naming and discovery documents
//!   - Reporting cycle driver and publisher abstraction
//!
//! * `logger` — Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration.
//!
//! ## Features
//!
//! * `hostbee-mqtt` — Enables MQTT transport using the `hostbee_mqtt` crate
//!   (default: enabled). Without it the binary logs documents instead of
//!   publishing them.

pub mod config;
pub mod core;
pub mod logger;
