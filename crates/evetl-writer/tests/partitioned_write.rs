//! Writes processed sessions to an in-memory store and reads them back.

use arrow::array::{Array, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::DataType;
use evetl_core::{process_session_csv, PARTITION_COLUMNS};
use evetl_writer::opendal::services::Memory;
use evetl_writer::opendal::Operator;
use evetl_writer::{list_source_objects, DatasetWriter, PartitionSpec, StorageLocation};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

async fn read_parquet(op: &Operator, path: &str) -> Vec<RecordBatch> {
    let buffer = op.read(path).await.unwrap();
    ParquetRecordBatchReaderBuilder::try_new(buffer.to_bytes())
        .unwrap()
        .build()
        .unwrap()
        .map(|batch| batch.unwrap())
        .collect()
}

const SESSIONS: &str = "\
start_time,end_time,energy_delivered_kwh,station_id
2024-01-01T10:00:00,2024-01-01T11:30:00,12.5,ST1
2024-01-01T12:00:00,2024-01-01T12:20:00,N/A,ST1
2024-01-01T09:00:00,2024-01-01T09:30:00,3.0,ST2
";

fn memory_operator() -> Operator {
    Operator::new(Memory::default()).unwrap().finish()
}

async fn write_run(op: &Operator, run_id: &str) -> Vec<evetl_writer::WrittenFile> {
    let result = process_session_csv(SESSIONS.as_bytes()).unwrap();
    let mut writer = DatasetWriter::new(
        op.clone(),
        "processed_sessions/",
        PartitionSpec::new(PARTITION_COLUMNS),
        run_id,
    );
    for batch in &result.batches {
        writer.append(batch).await.unwrap();
    }
    writer.into_files()
}

#[tokio::test]
async fn writes_hive_partitions_without_partition_columns() {
    let op = memory_operator();
    let files = write_run(&op, "run-1").await;

    let partitions: Vec<&str> = files.iter().map(|f| f.partition.as_str()).collect();
    assert_eq!(
        partitions,
        vec![
            "date=2024-01-01/station_id=ST1/",
            "date=2024-01-01/station_id=ST2/"
        ]
    );

    let st1 = &files[0];
    assert!(st1
        .path
        .starts_with("processed_sessions/date=2024-01-01/station_id=ST1/part-"));
    assert!(st1.path.ends_with("-run-1.c000.snappy.parquet"));

    let batches = read_parquet(&op, &st1.path).await;
    let batch = &batches[0];
    let schema = batch.schema();
    assert!(schema.index_of("date").is_err());
    assert!(schema.index_of("station_id").is_err());
    assert_eq!(batch.num_rows(), 2);

    let duration = batch
        .column(schema.index_of("session_duration_sec").unwrap())
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(duration.value(0), 5400);

    let energy = batch
        .column(schema.index_of("energy_delivered_kwh").unwrap())
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(energy.value(0), 12.5);
    assert!(energy.is_null(1));

    let status = batch
        .column(schema.index_of("utilization_status").unwrap())
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(status.value(0), "LONG_SESSION");
    assert_eq!(status.value(1), "SHORT_SESSION");

    assert!(matches!(
        schema.field_with_name("start_time").unwrap().data_type(),
        DataType::Timestamp(_, _)
    ));
}

#[tokio::test]
async fn second_run_appends_alongside_first() {
    let op = memory_operator();
    write_run(&op, "run-1").await;
    write_run(&op, "run-2").await;

    let target = StorageLocation::parse("s3://curated/processed_sessions/").unwrap();
    let objects = list_source_objects(&op, &target).await.unwrap();
    assert_eq!(objects.len(), 4);

    let mut rows = 0;
    for object in objects {
        for batch in read_parquet(&op, &object.path).await {
            rows += batch.num_rows();
        }
    }
    assert_eq!(rows, 6);
}
