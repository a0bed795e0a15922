use super::error::CollectorResult;
use crate::core::report::Report;

/// Contract every collector implements.
///
/// A producer reads one OS data source and returns a typed snapshot. It holds
/// no state between calls, so producers can run in any order and a failure
/// in one never affects another.
#[async_trait::async_trait]
pub trait DataProducer: Send + Sync + 'static {
    /// Typed snapshot of the source.
    type Output: IntoReports + Send + Sync + 'static;

    /// Reads the source and returns the snapshot.
    ///
    /// Every file handle or directory iterator opened here must be released
    /// before returning, on success and on error alike.
    async fn produce(&self) -> CollectorResult<Self::Output>;
}

/// Conversion of a collector snapshot into named reports.
pub trait IntoReports {
    fn into_reports(self) -> Vec<Report>;
}

impl IntoReports for Vec<Report> {
    fn into_reports(self) -> Vec<Report> {
        self
    }
}
