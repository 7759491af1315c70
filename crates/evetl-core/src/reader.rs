// CSV decoding for raw session files
//
// Header row, comma separator, double-quote quoting. Every column is read
// as nullable Utf8 so that typing stays a row-level, null-on-failure step.
// Empty fields and missing trailing fields read as null. Fields beyond the
// header width are dropped, and invalid UTF-8 is replaced with U+FFFD, so a
// malformed line never costs the other rows of the file.

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, RecordBatch, RecordBatchOptions, StringBuilder};
use arrow::datatypes::SchemaRef;
use std::borrow::Cow;
use std::sync::Arc;

use crate::schema::raw_schema;

const DELIMITER: u8 = b',';
const QUOTE: u8 = b'"';
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Rows per decoded batch
pub const DEFAULT_BATCH_SIZE: usize = 8 * 1024;

/// Decoded contents of one CSV object.
#[derive(Debug, Clone)]
pub struct RawCsv {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
    /// Records that carried more fields than the header
    pub overlong_rows: usize,
    /// Fields that were not valid UTF-8
    pub invalid_utf8_fields: usize,
}

impl RawCsv {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Decode a CSV object into all-Utf8 record batches.
pub fn read_raw_csv(bytes: &[u8]) -> Result<RawCsv> {
    read_raw_csv_with_batch_size(bytes, DEFAULT_BATCH_SIZE)
}

fn decode_field<'a>(field: &'a [u8], invalid_utf8_fields: &mut usize) -> Cow<'a, str> {
    match std::str::from_utf8(field) {
        Ok(value) => Cow::Borrowed(value),
        Err(_) => {
            *invalid_utf8_fields += 1;
            String::from_utf8_lossy(field)
        }
    }
}

fn finish_batch(
    schema: &SchemaRef,
    builders: &mut [StringBuilder],
    rows: usize,
) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = builders
        .iter_mut()
        .map(|builder| Arc::new(builder.finish()) as ArrayRef)
        .collect();
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    RecordBatch::try_new_with_options(schema.clone(), columns, &options)
        .context("Failed to assemble CSV batch")
}

pub fn read_raw_csv_with_batch_size(bytes: &[u8], batch_size: usize) -> Result<RawCsv> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let batch_size = batch_size.max(1);

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .flexible(true)
        .from_reader(bytes);

    let mut invalid_utf8_fields = 0;
    let header: Vec<String> = reader
        .byte_headers()
        .context("Failed to read CSV header row")?
        .iter()
        .map(|name| decode_field(name, &mut invalid_utf8_fields).into_owned())
        .collect();
    let width = header.len();
    let schema = raw_schema(header);

    let mut builders: Vec<StringBuilder> = (0..width).map(|_| StringBuilder::new()).collect();
    let mut batches = Vec::new();
    let mut rows_in_batch = 0;
    let mut overlong_rows = 0;
    let mut record = ::csv::ByteRecord::new();

    while reader
        .read_byte_record(&mut record)
        .context("Failed to decode CSV records")?
    {
        if record.len() > width {
            overlong_rows += 1;
        }
        for (index, builder) in builders.iter_mut().enumerate() {
            match record.get(index) {
                Some(field) if !field.is_empty() => {
                    builder.append_value(decode_field(field, &mut invalid_utf8_fields))
                }
                _ => builder.append_null(),
            }
        }

        rows_in_batch += 1;
        if rows_in_batch == batch_size {
            batches.push(finish_batch(&schema, &mut builders, rows_in_batch)?);
            rows_in_batch = 0;
        }
    }
    if rows_in_batch > 0 {
        batches.push(finish_batch(&schema, &mut builders, rows_in_batch)?);
    }

    if overlong_rows > 0 {
        tracing::warn!(
            rows = overlong_rows,
            columns = width,
            "Dropped fields beyond the header width"
        );
    }
    if invalid_utf8_fields > 0 {
        tracing::warn!(
            fields = invalid_utf8_fields,
            "Replaced invalid UTF-8 in CSV fields"
        );
    }

    Ok(RawCsv {
        schema,
        batches,
        overlong_rows,
        invalid_utf8_fields,
    })
}
