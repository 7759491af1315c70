//! Source object discovery and reads.
//!
//! A source location names either one object or a prefix that is listed
//! recursively. Beneath a listed prefix, objects with any path component
//! starting with `_` or `.` are skipped (markers, run records, temp files).

use opendal::{ErrorKind, Operator};

use crate::error::{Result, StorageError};
use crate::location::StorageLocation;

/// One object to be read as part of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject {
    /// Operator-relative path
    pub path: String,
}

/// Resolve a source location into the objects it covers, sorted by path.
///
/// Returns an error when nothing matches.
pub async fn list_source_objects(
    operator: &Operator,
    location: &StorageLocation,
) -> Result<Vec<SourceObject>> {
    if !location.is_dir_like() {
        match operator.stat(location.path()).await {
            Ok(meta) if meta.is_file() => {
                return Ok(vec![SourceObject {
                    path: location.path().to_string(),
                }]);
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::read_failure(format!(
                    "Failed to stat '{}': {}",
                    location, e
                )));
            }
        }
    }

    let prefix = location.dir_path();
    let entries = match operator.list_with(&prefix).recursive(true).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(StorageError::read_failure(format!(
                "Failed to list '{}': {}",
                location, e
            )));
        }
    };

    let mut objects: Vec<SourceObject> = entries
        .into_iter()
        .filter(|entry| entry.metadata().is_file())
        .filter(|entry| !is_hidden(entry.path().strip_prefix(&prefix).unwrap_or(entry.path())))
        .map(|entry| SourceObject {
            path: entry.path().to_string(),
        })
        .collect();
    objects.sort_by(|a, b| a.path.cmp(&b.path));

    if objects.is_empty() {
        return Err(StorageError::read_failure(format!(
            "Source location '{}' matches no objects",
            location
        )));
    }

    tracing::debug!(location = %location, objects = objects.len(), "Resolved source objects");
    Ok(objects)
}

/// Read an entire object into memory.
pub async fn read_object(operator: &Operator, path: &str) -> Result<Vec<u8>> {
    let buffer = operator
        .read(path)
        .await
        .map_err(|e| StorageError::read_failure(format!("Failed to read '{}': {}", path, e)))?;
    Ok(buffer.to_vec())
}

fn is_hidden(relative_path: &str) -> bool {
    relative_path
        .split('/')
        .any(|component| component.starts_with('_') || component.starts_with('.'))
}
