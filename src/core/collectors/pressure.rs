use std::path::PathBuf;

use tracing::{debug, warn};

use super::{
    error::{CollectorError, CollectorResult},
    sysfs,
    traits::{DataProducer, IntoReports},
};
use crate::core::{
    psi::{self, Psi},
    report::Report,
};

/// Resources the kernel tracks pressure for, in report order.
pub const PRESSURE_KINDS: [&str; 3] = ["cpu", "memory", "io"];

#[derive(Debug, Clone, PartialEq)]
pub struct PressureStats {
    pub kind: &'static str,
    pub psi: Psi,
}

#[derive(Debug, Clone, Default)]
pub struct PressureBuffer {
    stats: Vec<PressureStats>,
}

impl PressureBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stats: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, stat: PressureStats) {
        self.stats.push(stat);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PressureStats> {
        self.stats.iter()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl IntoReports for PressureBuffer {
    fn into_reports(self) -> Vec<Report> {
        self.stats
            .iter()
            .flat_map(|stat| psi::reports(stat.kind, &stat.psi))
            .collect()
    }
}

/// Reads `<proc>/pressure/{cpu,memory,io}`.
///
/// Each kind is independent: a missing or malformed file drops that kind
/// only. Kernels built without `CONFIG_PSI` have no `pressure` directory at
/// all, which yields an empty buffer.
#[derive(Debug, Clone)]
pub struct PressureCollector {
    proc_root: PathBuf,
}

impl PressureCollector {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    async fn read_kind(&self, kind: &str) -> CollectorResult<Psi> {
        let path = self.proc_root.join("pressure").join(kind);
        let content = sysfs::read_bounded(&path, sysfs::PSEUDO_FILE_LIMIT).await?;
        psi::decode(&content).map_err(|source| CollectorError::Psi {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Default for PressureCollector {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait::async_trait]
impl DataProducer for PressureCollector {
    type Output = PressureBuffer;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let mut buffer = PressureBuffer::with_capacity(PRESSURE_KINDS.len());

        for kind in PRESSURE_KINDS {
            match self.read_kind(kind).await {
                Ok(psi) => buffer.push(PressureStats { kind, psi }),
                Err(CollectorError::FileRead { ref source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!("No pressure stall information for {}", kind);
                }
                Err(e) => warn!("Skipping {} pressure: {}", kind, e),
            }
        }

        Ok(buffer)
    }
}
