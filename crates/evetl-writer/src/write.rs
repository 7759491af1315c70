//! Append-only partitioned dataset writer
//!
//! Each call to [`DatasetWriter::append`] splits the batch by partition key
//! and writes one new Parquet file per partition. Existing files are never
//! touched; file names carry the run id so concurrent runs cannot collide.

use arrow::array::RecordBatch;
use opendal::Operator;
use serde::{Deserialize, Serialize};

use crate::encoding::encode_parquet;
use crate::error::{Result, StorageError};
use crate::partition::{split_by_partition, PartitionSpec};

/// Result of writing one data file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    /// Operator-relative path of the file
    pub path: String,
    /// Partition directory, e.g. `date=2024-01-01/station_id=ST1/`
    pub partition: String,
    /// Number of rows written
    pub rows: u64,
    /// File size in bytes
    pub bytes: u64,
}

pub struct DatasetWriter {
    operator: Operator,
    root: String,
    spec: PartitionSpec,
    run_id: String,
    next_part: usize,
    files: Vec<WrittenFile>,
}

impl DatasetWriter {
    /// `root` is an operator-relative directory; an empty root or one ending
    /// in `/` is used as-is, otherwise a trailing `/` is added.
    pub fn new(
        operator: Operator,
        root: impl Into<String>,
        spec: PartitionSpec,
        run_id: impl Into<String>,
    ) -> Self {
        let mut root = root.into();
        if !root.is_empty() && !root.ends_with('/') {
            root.push('/');
        }
        Self {
            operator,
            root,
            spec,
            run_id: run_id.into(),
            next_part: 0,
            files: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn next_file_name(&mut self) -> String {
        let name = format!(
            "part-{:05}-{}.c000.snappy.parquet",
            self.next_part, self.run_id
        );
        self.next_part += 1;
        name
    }

    /// Append one batch to the dataset. Empty batches write nothing.
    pub async fn append(&mut self, batch: &RecordBatch) -> Result<Vec<WrittenFile>> {
        if batch.num_rows() == 0 {
            return Ok(Vec::new());
        }

        let partitions = split_by_partition(batch, &self.spec)?;
        let mut written = Vec::with_capacity(partitions.len());

        for partition in partitions {
            let partition_dir = partition.relative_dir();
            let file_name = self.next_file_name();
            let path = format!("{}{}{}", self.root, partition_dir, file_name);
            let bytes = encode_parquet(&partition.batch)?;
            let size = bytes.len() as u64;

            self.operator.write(&path, bytes).await.map_err(|e| {
                StorageError::write_failure(format!("Failed to write '{}': {}", path, e))
            })?;

            tracing::debug!(
                path = %path,
                rows = partition.batch.num_rows(),
                bytes = size,
                "Wrote partition file"
            );

            written.push(WrittenFile {
                path,
                partition: partition_dir,
                rows: partition.batch.num_rows() as u64,
                bytes: size,
            });
        }

        self.files.extend(written.iter().cloned());
        Ok(written)
    }

    pub fn files(&self) -> &[WrittenFile] {
        &self.files
    }

    pub fn rows_written(&self) -> u64 {
        self.files.iter().map(|f| f.rows).sum()
    }

    pub fn into_files(self) -> Vec<WrittenFile> {
        self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use opendal::services::Memory;
    use std::sync::Arc;

    fn memory_operator() -> Operator {
        Operator::new(Memory::default()).unwrap().finish()
    }

    fn batch(stations: Vec<&str>) -> RecordBatch {
        let n = stations.len() as i64;
        let schema = Arc::new(Schema::new(vec![
            Field::new("station_id", DataType::Utf8, true),
            Field::new("value", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(stations)) as ArrayRef,
                Arc::new(Int64Array::from((0..n).collect::<Vec<_>>())) as ArrayRef,
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn writes_one_file_per_partition() {
        let op = memory_operator();
        let mut writer =
            DatasetWriter::new(op.clone(), "out", PartitionSpec::new(["station_id"]), "run-1");

        let files = writer.append(&batch(vec!["ST1", "ST2", "ST1"])).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(
            files[0].path,
            "out/station_id=ST1/part-00000-run-1.c000.snappy.parquet"
        );
        assert_eq!(files[0].rows, 2);
        assert_eq!(
            files[1].path,
            "out/station_id=ST2/part-00001-run-1.c000.snappy.parquet"
        );
        assert_eq!(writer.rows_written(), 3);

        let meta = op.stat(&files[0].path).await.unwrap();
        assert_eq!(meta.content_length(), files[0].bytes);
    }

    #[tokio::test]
    async fn sequence_continues_across_appends() {
        let op = memory_operator();
        let mut writer = DatasetWriter::new(op, "", PartitionSpec::new(["station_id"]), "r");

        writer.append(&batch(vec!["A"])).await.unwrap();
        let second = writer.append(&batch(vec!["A"])).await.unwrap();
        assert_eq!(second[0].path, "station_id=A/part-00001-r.c000.snappy.parquet");
        assert_eq!(writer.files().len(), 2);
    }

    #[tokio::test]
    async fn empty_batch_writes_nothing() {
        let op = memory_operator();
        let mut writer = DatasetWriter::new(op, "out/", PartitionSpec::new(["station_id"]), "r");
        let files = writer.append(&batch(vec![])).await.unwrap();
        assert!(files.is_empty());
        assert!(writer.into_files().is_empty());
    }
}
