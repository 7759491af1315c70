//! Hive-style partition layout
//!
//! Splits a batch by the values of its partition columns and produces paths
//! like `date=2024-01-01/station_id=ST1/`. Partition columns are dropped
//! from the file data because the directory already encodes them.

use arrow::array::{Array, RecordBatch, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::{Result, StorageError};

/// Directory name used for null or empty partition values.
pub const DEFAULT_PARTITION_NAME: &str = "__HIVE_DEFAULT_PARTITION__";

/// Ordered partition columns, outermost directory first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    columns: Vec<String>,
}

impl PartitionSpec {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Rows of one partition, with partition columns removed.
#[derive(Debug, Clone)]
pub struct PartitionedBatch {
    /// `(column, rendered value)` pairs, outermost first
    pub values: Vec<(String, String)>,
    pub batch: RecordBatch,
}

impl PartitionedBatch {
    /// Relative directory, e.g. `date=2024-01-01/station_id=ST1/`.
    pub fn relative_dir(&self) -> String {
        let mut dir = String::new();
        for (column, value) in &self.values {
            dir.push_str(&escape_path_name(column));
            dir.push('=');
            dir.push_str(&escape_path_name(value));
            dir.push('/');
        }
        dir
    }
}

/// Split `batch` into one batch per distinct partition key.
///
/// Row order inside each partition follows input order. Partitions come back
/// sorted by their rendered values.
pub fn split_by_partition(batch: &RecordBatch, spec: &PartitionSpec) -> Result<Vec<PartitionedBatch>> {
    let schema = batch.schema();
    let mut partition_indices = Vec::with_capacity(spec.columns().len());
    for column in spec.columns() {
        let index = schema.index_of(column).map_err(|_| {
            StorageError::partition(format!("partition column '{}' not found in batch", column))
        })?;
        partition_indices.push(index);
    }

    let data_indices: Vec<usize> = (0..batch.num_columns())
        .filter(|i| !partition_indices.contains(i))
        .collect();
    let data = batch
        .project(&data_indices)
        .map_err(|e| StorageError::partition(format!("Failed to project data columns: {}", e)))?;

    let options = FormatOptions::default();
    let mut formatters = Vec::with_capacity(partition_indices.len());
    for &index in &partition_indices {
        let formatter = ArrayFormatter::try_new(batch.column(index).as_ref(), &options)
            .map_err(|e| {
                StorageError::partition(format!(
                    "Cannot render partition column '{}': {}",
                    schema.field(index).name(),
                    e
                ))
            })?;
        formatters.push((index, formatter));
    }

    let mut groups: BTreeMap<Vec<String>, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let key: Vec<String> = formatters
            .iter()
            .map(|(index, formatter)| {
                if batch.column(*index).is_null(row) {
                    return DEFAULT_PARTITION_NAME.to_string();
                }
                let value = formatter.value(row).to_string();
                if value.is_empty() {
                    DEFAULT_PARTITION_NAME.to_string()
                } else {
                    value
                }
            })
            .collect();
        groups.entry(key).or_default().push(row as u32);
    }

    let mut partitions = Vec::with_capacity(groups.len());
    for (key, rows) in groups {
        let indices = UInt32Array::from(rows);
        let rows_batch = take_record_batch(&data, &indices)
            .map_err(|e| StorageError::partition(format!("Failed to gather partition rows: {}", e)))?;
        let values = spec.columns().iter().cloned().zip(key).collect();
        partitions.push(PartitionedBatch {
            values,
            batch: rows_batch,
        });
    }

    Ok(partitions)
}

fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '\u{01}'..='\u{1F}'
            | '"'
            | '#'
            | '%'
            | '\''
            | '*'
            | '/'
            | ':'
            | '='
            | '?'
            | '\\'
            | '\u{7F}'
            | '{'
            | '['
            | ']'
            | '^'
    )
}

/// Percent-escape characters that cannot appear in a partition directory name.
pub fn escape_path_name(value: &str) -> Cow<'_, str> {
    if !value.chars().any(needs_escape) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if needs_escape(c) {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}
