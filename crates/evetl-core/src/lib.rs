// evetl-core - Platform-agnostic session transformation logic
//
// Pure processing only: raw CSV bytes -> typed, derived Arrow batches.
// No I/O, no async, no runtime dependencies. Storage and orchestration
// live in evetl-writer, evetl-job and evetl-lambda.

use anyhow::Result;
use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;

pub mod reader;
pub mod derive;
pub mod schema;
pub mod transform;

pub use derive::{DerivedSession, UtilizationStatus, LONG_SESSION_THRESHOLD_SECS};
pub use schema::{field, PARTITION_COLUMNS, REQUIRED_COLUMNS};
pub use transform::{ParseStats, SessionTransformer};

/// Result of processing one raw CSV object
#[derive(Debug)]
pub struct ProcessingResult {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
    pub input_rows: usize,
    pub parse_stats: ParseStats,
}

impl ProcessingResult {
    pub fn output_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Decode a raw session CSV and apply all column derivations.
///
/// Field-level parse failures become nulls; only structural problems
/// (undecodable CSV, missing required column) are errors.
pub fn process_session_csv(bytes: &[u8]) -> Result<ProcessingResult> {
    let raw = reader::read_raw_csv(bytes)?;
    let input_rows = raw.num_rows();
    let transformer = SessionTransformer::try_new(raw.schema.clone())?;

    let mut parse_stats = ParseStats::default();
    let mut batches = Vec::with_capacity(raw.batches.len());
    for batch in &raw.batches {
        let (processed, stats) = transformer.transform(batch)?;
        parse_stats += stats;
        batches.push(processed);
    }

    Ok(ProcessingResult {
        schema: transformer.output_schema(),
        batches,
        input_rows,
        parse_stats,
    })
}
