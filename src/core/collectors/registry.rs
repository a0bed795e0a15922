use std::sync::Arc;

use super::{
    avg::LoadAverageCollector,
    error::{CollectorError, CollectorResult},
    hwmon::HwmonCollector,
    powerstat::PowerCollector,
    pressure::PressureCollector,
    ram::MemoryCollector,
    traits::{DataProducer, IntoReports},
    uptime::UptimeCollector,
};
use crate::{config::metrics::SourcesConfig, core::report::Report};

/// Object-safe view of a collector, so collectors with different output
/// types can be stored and run uniformly.
#[async_trait::async_trait]
pub trait DynCollector: Send + Sync {
    /// Name used in configuration and log lines.
    fn name(&self) -> &'static str;

    /// A failing mandatory collector ends the reporting loop; any other
    /// collector failing only drops its reports for that cycle.
    fn is_mandatory(&self) -> bool;

    /// Produces the snapshot and converts it into reports.
    async fn collect(&self) -> CollectorResult<Vec<Report>>;
}

/// Wraps a concrete `DataProducer` as a `DynCollector`.
pub struct DynWrapper<T> {
    inner: T,
    name: &'static str,
    mandatory: bool,
}

impl<T> DynWrapper<T> {
    pub fn new(name: &'static str, inner: T) -> Self {
        Self {
            name,
            inner,
            mandatory: false,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

#[async_trait::async_trait]
impl<T> DynCollector for DynWrapper<T>
where
    T: DataProducer,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    async fn collect(&self) -> CollectorResult<Vec<Report>> {
        let output = self.inner.produce().await?;
        Ok(output.into_reports())
    }
}

/// Ordered set of collectors. Iteration order is the order reports appear
/// in the state document.
#[derive(Clone, Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn DynCollector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in collector, reading from the configured roots.
    pub fn with_defaults(sources: &SourcesConfig) -> Self {
        let proc_root = &sources.proc_root;
        let sys_root = &sources.sys_root;

        let mut registry = Self::new();
        registry.register(DynWrapper::new(
            "load_average",
            LoadAverageCollector::new(proc_root),
        ));
        registry.register(DynWrapper::new("uptime", UptimeCollector::new(proc_root)));
        registry.register(DynWrapper::new("memory", MemoryCollector::new(proc_root)).mandatory());
        registry.register(DynWrapper::new("hwmon", HwmonCollector::new(sys_root)));
        registry.register(DynWrapper::new("power", PowerCollector::new(sys_root)));
        registry.register(DynWrapper::new("pressure", PressureCollector::new(proc_root)));
        registry
    }

    /// Appends a collector. A name that is already registered is replaced
    /// in place, keeping its position.
    pub fn register(&mut self, collector: impl DynCollector + 'static) {
        let collector: Arc<dyn DynCollector> = Arc::new(collector);
        match self
            .collectors
            .iter_mut()
            .find(|c| c.name() == collector.name())
        {
            Some(slot) => *slot = collector,
            None => self.collectors.push(collector),
        }
    }

    /// Keeps only the collectors named in `enabled`, preserving registry
    /// order. Unknown names are an error.
    pub fn filtered<S: AsRef<str>>(&self, enabled: &[S]) -> CollectorResult<Self> {
        if let Some(unknown) = enabled.iter().find(|name| !self.contains(name.as_ref())) {
            return Err(CollectorError::CollectorNotFound(unknown.as_ref().to_string()));
        }

        Ok(Self {
            collectors: self
                .collectors
                .iter()
                .filter(|c| enabled.iter().any(|name| name.as_ref() == c.name()))
                .cloned()
                .collect(),
        })
    }

    pub fn list_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collectors.iter().any(|c| c.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DynCollector>> {
        self.collectors.iter()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
