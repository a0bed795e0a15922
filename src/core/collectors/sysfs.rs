//! Small helpers for reading `/proc` and `/sys` attributes.

use std::path::Path;

use tokio::io::AsyncReadExt;

use super::error::{CollectorError, CollectorResult};

/// Upper bound for single-value sysfs attributes such as `capacity`.
pub const ATTRIBUTE_LIMIT: usize = 64;

/// Upper bound for small multi-line pseudo-files such as `/proc/pressure/*`.
pub const PSEUDO_FILE_LIMIT: usize = 4096;

pub async fn read_to_string(path: &Path) -> CollectorResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CollectorError::FileRead {
            path: path.display().to_string(),
            source,
        })
}

/// Reads at most `limit` bytes. A longer file is an error rather than being
/// silently truncated.
pub async fn read_bounded(path: &Path, limit: usize) -> CollectorResult<String> {
    let file_read = |source| CollectorError::FileRead {
        path: path.display().to_string(),
        source,
    };

    let file = tokio::fs::File::open(path).await.map_err(file_read)?;
    let mut content = String::with_capacity(limit.min(256));
    file.take(limit as u64 + 1)
        .read_to_string(&mut content)
        .await
        .map_err(file_read)?;

    if content.len() > limit {
        return Err(CollectorError::FileTooLarge {
            path: path.display().to_string(),
            limit,
        });
    }
    Ok(content)
}

/// Reads an attribute, mapping a missing file to `None`.
pub async fn read_optional(path: &Path, limit: usize) -> CollectorResult<Option<String>> {
    match read_bounded(path, limit).await {
        Ok(content) => Ok(Some(content)),
        Err(CollectorError::FileRead { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Returns the names of the entries of `dir`, sorted, or an empty list when
/// `dir` does not exist.
pub async fn list_dir(dir: &Path) -> CollectorResult<Vec<String>> {
    let read_err = |source| CollectorError::FileRead {
        path: dir.display().to_string(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_err(e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
