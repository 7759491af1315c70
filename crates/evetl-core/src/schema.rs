// Arrow schemas for raw and processed charging-session records
//
// Raw records are read with every column as nullable Utf8. The processed
// schema keeps raw column order, swaps the typed columns in place and
// appends the derived columns.

use anyhow::{bail, Result};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// Column names shared by the raw and processed schemas.
pub mod field {
    pub const START_TIME: &str = "start_time";
    pub const END_TIME: &str = "end_time";
    pub const ENERGY_DELIVERED_KWH: &str = "energy_delivered_kwh";
    pub const STATION_ID: &str = "station_id";
    pub const SESSION_DURATION_SEC: &str = "session_duration_sec";
    pub const DATE: &str = "date";
    pub const UTILIZATION_STATUS: &str = "utilization_status";
}

/// Columns every source file must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    field::START_TIME,
    field::END_TIME,
    field::ENERGY_DELIVERED_KWH,
    field::STATION_ID,
];

/// Output partition columns, outermost first.
pub const PARTITION_COLUMNS: [&str; 2] = [field::DATE, field::STATION_ID];

pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Build the all-Utf8 raw schema from header column names.
pub fn raw_schema<I, S>(columns: I) -> SchemaRef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let fields: Vec<Field> = columns
        .into_iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Fail when a raw schema lacks one of the required columns.
pub fn ensure_required_columns(raw: &Schema) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| raw.index_of(name).is_err())
        .collect();

    if !missing.is_empty() {
        bail!(
            "source header is missing required column(s): {} (found: {})",
            missing.join(", "),
            raw.fields()
                .iter()
                .map(|f| f.name().as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

/// Type of a processed column, or `None` when the raw column passes through.
pub(crate) fn processed_type(name: &str) -> Option<DataType> {
    match name {
        field::START_TIME | field::END_TIME => Some(timestamp_type()),
        field::ENERGY_DELIVERED_KWH => Some(DataType::Float64),
        field::SESSION_DURATION_SEC => Some(DataType::Int64),
        field::DATE => Some(DataType::Date32),
        field::UTILIZATION_STATUS => Some(DataType::Utf8),
        _ => None,
    }
}

/// Derived columns in append order.
pub(crate) const DERIVED_COLUMNS: [&str; 3] = [
    field::SESSION_DURATION_SEC,
    field::DATE,
    field::UTILIZATION_STATUS,
];

/// Processed schema for a given raw schema.
pub fn processed_schema(raw: &Schema) -> Result<SchemaRef> {
    ensure_required_columns(raw)?;

    let mut fields: Vec<Field> = raw
        .fields()
        .iter()
        .map(|f| match processed_type(f.name()) {
            Some(data_type) => output_field(f.name(), data_type),
            None => f.as_ref().clone(),
        })
        .collect();

    for name in DERIVED_COLUMNS {
        if raw.index_of(name).is_err() {
            let data_type = processed_type(name).unwrap_or(DataType::Utf8);
            fields.push(output_field(name, data_type));
        }
    }

    Ok(Arc::new(Schema::new(fields)))
}

fn output_field(name: &str, data_type: DataType) -> Field {
    let nullable = name != field::UTILIZATION_STATUS;
    Field::new(name, data_type, nullable)
}
