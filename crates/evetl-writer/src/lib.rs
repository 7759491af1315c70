//! Object-storage access and partitioned Parquet output for evetl
//!
//! This crate resolves source locations into objects, writes processed
//! batches as a Hive-partitioned Parquet dataset through OpenDAL, and records
//! run commits next to the data.

mod encoding;
mod error;
mod ledger;
mod location;
mod partition;
mod source;
mod storage;
mod write;

pub use encoding::set_parquet_row_group_size;
pub use error::{Result, StorageError};
pub use ledger::{RunLedger, RunRecord, RUNS_DIR, SUCCESS_MARKER};
pub use location::{Scheme, StorageLocation};
pub use partition::{
    escape_path_name, split_by_partition, PartitionSpec, PartitionedBatch, DEFAULT_PARTITION_NAME,
};
pub use source::{list_source_objects, read_object, SourceObject};
pub use storage::OperatorFactory;
pub use write::{DatasetWriter, WrittenFile};

// Re-export for callers building operators directly
pub use opendal;
