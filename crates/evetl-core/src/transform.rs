// Raw session batch -> processed session batch
//
// Row-local only: every output row comes from exactly one input row, in
// order, so row count is preserved by construction.

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Date32Builder, Float64Builder, Int64Builder, RecordBatch, StringArray,
    StringBuilder, TimestampMicrosecondBuilder,
};
use arrow::datatypes::SchemaRef;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::ops::AddAssign;
use std::sync::Arc;

use crate::derive::DerivedSession;
use crate::schema::{field, processed_schema};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Counts of raw values that were present but could not be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub invalid_start_time: usize,
    pub invalid_end_time: usize,
    pub invalid_energy_delivered_kwh: usize,
}

impl ParseStats {
    pub fn total(&self) -> usize {
        self.invalid_start_time + self.invalid_end_time + self.invalid_energy_delivered_kwh
    }
}

impl AddAssign for ParseStats {
    fn add_assign(&mut self, other: Self) {
        self.invalid_start_time += other.invalid_start_time;
        self.invalid_end_time += other.invalid_end_time;
        self.invalid_energy_delivered_kwh += other.invalid_energy_delivered_kwh;
    }
}

/// Converts raw all-Utf8 batches into processed session batches
pub struct SessionTransformer {
    raw_schema: SchemaRef,
    output_schema: SchemaRef,
}

impl SessionTransformer {
    /// Fails when the raw schema lacks a required column.
    pub fn try_new(raw_schema: SchemaRef) -> Result<Self> {
        let output_schema = processed_schema(&raw_schema)?;
        Ok(Self {
            raw_schema,
            output_schema,
        })
    }

    pub fn output_schema(&self) -> SchemaRef {
        Arc::clone(&self.output_schema)
    }

    /// Transform one raw batch, returning the processed batch and parse stats.
    pub fn transform(&self, batch: &RecordBatch) -> Result<(RecordBatch, ParseStats)> {
        if batch.num_columns() != self.raw_schema.fields().len() {
            bail!(
                "raw batch has {} columns, expected {}",
                batch.num_columns(),
                self.raw_schema.fields().len()
            );
        }

        let start_raw = string_column(batch, field::START_TIME)?;
        let end_raw = string_column(batch, field::END_TIME)?;
        let energy_raw = string_column(batch, field::ENERGY_DELIVERED_KWH)?;

        let rows = batch.num_rows();
        let mut start_builder = TimestampMicrosecondBuilder::with_capacity(rows).with_timezone("UTC");
        let mut end_builder = TimestampMicrosecondBuilder::with_capacity(rows).with_timezone("UTC");
        let mut energy_builder = Float64Builder::with_capacity(rows);
        let mut duration_builder = Int64Builder::with_capacity(rows);
        let mut date_builder = Date32Builder::with_capacity(rows);
        let mut status_builder = StringBuilder::with_capacity(rows, rows * 13);
        let mut stats = ParseStats::default();

        for row in 0..rows {
            let start = value_at(start_raw, row);
            let end = value_at(end_raw, row);
            let energy = value_at(energy_raw, row);
            let derived = DerivedSession::from_raw(start, end, energy);

            if start.is_some() && derived.start_time.is_none() {
                stats.invalid_start_time += 1;
            }
            if end.is_some() && derived.end_time.is_none() {
                stats.invalid_end_time += 1;
            }
            if energy.is_some() && derived.energy_delivered_kwh.is_none() {
                stats.invalid_energy_delivered_kwh += 1;
            }

            start_builder.append_option(derived.start_time.map(|t| t.timestamp_micros()));
            end_builder.append_option(derived.end_time.map(|t| t.timestamp_micros()));
            energy_builder.append_option(derived.energy_delivered_kwh);
            duration_builder.append_option(derived.session_duration_sec);
            date_builder.append_option(derived.date.map(date_to_epoch_days));
            status_builder.append_value(derived.utilization_status.as_str());
        }

        let mut typed: HashMap<&str, ArrayRef> = HashMap::from([
            (field::START_TIME, Arc::new(start_builder.finish()) as ArrayRef),
            (field::END_TIME, Arc::new(end_builder.finish()) as ArrayRef),
            (
                field::ENERGY_DELIVERED_KWH,
                Arc::new(energy_builder.finish()) as ArrayRef,
            ),
            (
                field::SESSION_DURATION_SEC,
                Arc::new(duration_builder.finish()) as ArrayRef,
            ),
            (field::DATE, Arc::new(date_builder.finish()) as ArrayRef),
            (
                field::UTILIZATION_STATUS,
                Arc::new(status_builder.finish()) as ArrayRef,
            ),
        ]);

        let mut columns = Vec::with_capacity(self.output_schema.fields().len());
        for (index, output_field) in self.output_schema.fields().iter().enumerate() {
            match typed.remove(output_field.name().as_str()) {
                Some(array) => columns.push(array),
                None => columns.push(Arc::clone(batch.column(index))),
            }
        }

        let processed = RecordBatch::try_new(self.output_schema(), columns)
            .context("Failed to assemble processed session batch")?;

        if stats.total() > 0 {
            tracing::debug!(
                rows,
                invalid_start_time = stats.invalid_start_time,
                invalid_end_time = stats.invalid_end_time,
                invalid_energy_delivered_kwh = stats.invalid_energy_delivered_kwh,
                "Unparsable values degraded to null"
            );
        }

        Ok((processed, stats))
    }
}

/// Date32 value (days since the Unix epoch) for a calendar date.
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .with_context(|| format!("column '{}' not found in raw batch", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("column '{}' is not a Utf8 column", name))
}

fn value_at(array: &StringArray, row: usize) -> Option<&str> {
    if array.is_null(row) {
        None
    } else {
        Some(array.value(row))
    }
}
