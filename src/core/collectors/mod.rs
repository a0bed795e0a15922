/// System load average collector module.
/// Reports 1, 5 and 15 minute load averages from `<proc>/loadavg`.
pub mod avg;

/// Common error types used across all collectors.
pub mod error;

/// Hardware monitoring sensor collector module.
/// Reports every temperature input exposed under `<sys>/class/hwmon`.
pub mod hwmon;

/// Battery capacity collector module.
/// Reads the `capacity` attribute of each `<sys>/class/power_supply` entry.
pub mod powerstat;

/// Pressure Stall Information (PSI) collector module.
/// Collects CPU, memory, and I/O pressure metrics.
pub mod pressure;

/// Memory and RAM statistics collector module.
/// Reports used and total physical memory from `<proc>/meminfo`.
pub mod ram;

/// Collector registry.
/// Fixed-order list of collectors, filtered by configuration at startup.
pub mod registry;

/// Bounded file and directory helpers for pseudo-filesystems.
pub mod sysfs;

/// Core traits and interfaces.
pub mod traits;

/// System uptime collector module.
pub mod uptime;
