use thiserror::Error;

use crate::core::psi::PsiDecodeError;

/// Error type for the collector system.
///
/// Whether an error ends the process is decided by the collector that raised
/// it (see `DynCollector::is_mandatory`), not by the variant.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Failed to read a file from disk.
    #[error("Failed to read file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A bounded read hit its limit before the end of the file.
    #[error("File {path} exceeds {limit} bytes")]
    FileTooLarge { path: String, limit: usize },

    /// Encountered a parsing error while extracting a metric.
    #[error("Failed to parse {metric} from {location}: {reason}")]
    ParseError {
        metric: String,
        location: String,
        reason: String,
    },

    /// A required field was not present in the source.
    #[error("Missing required field: {field} in {location}")]
    MissingField { field: String, location: String },

    /// Data was found but did not conform to the expected format.
    #[error("Invalid format in {location}: {reason}")]
    InvalidFormat { location: String, reason: String },

    /// A pressure stall file could not be decoded.
    #[error("Failed to decode {path}")]
    Psi {
        path: String,
        #[source]
        source: PsiDecodeError,
    },

    /// Tried to access a collector by name, but it was not registered.
    #[error("Collector not found for: {0}")]
    CollectorNotFound(String),
}

/// Result type returned by every collector operation.
pub type CollectorResult<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_file_read_keeps_source() {
        let err = CollectorError::FileRead {
            path: "/proc/meminfo".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "Failed to read file /proc/meminfo");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_psi_error_display() {
        let err = CollectorError::Psi {
            path: "/proc/pressure/io".into(),
            source: PsiDecodeError::Empty,
        };
        assert_eq!(err.to_string(), "Failed to decode /proc/pressure/io");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("empty pressure stall input".to_string())
        );
    }
}
