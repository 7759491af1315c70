// End-to-end transform runs against an in-memory object store

use arrow::array::{Array, Float64Array, Int64Array, RecordBatch, StringArray};
use evetl_job::{JobArgs, JobContext, TransformJob};
use evetl_writer::{RunRecord, StorageLocation};
use opendal::services::Memory;
use opendal::Operator;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

const SESSIONS: &str = "\
start_time,end_time,energy_delivered_kwh,station_id
2024-01-01T10:00:00,2024-01-01T11:30:00,12.5,ST1
2024-01-01T12:00:00,2024-01-01T12:20:00,N/A,ST1
2024-01-02T09:00:00,2024-01-02T09:30:00,3.0,ST2
";

fn memory_operator() -> Operator {
    Operator::new(Memory::default()).unwrap().finish()
}

fn context(run_id: &str, source: &str) -> JobContext {
    JobContext {
        job_name: "ev-station-etl-job".to_string(),
        run_id: run_id.to_string(),
        source: StorageLocation::parse(source).unwrap(),
        target: StorageLocation::parse("s3://curated/processed_sessions/").unwrap(),
    }
}

async fn data_files(op: &Operator) -> Vec<String> {
    let mut paths: Vec<String> = op
        .list_with("processed_sessions/")
        .recursive(true)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.path().to_string())
        .filter(|path| path.ends_with(".parquet"))
        .collect();
    paths.sort();
    paths
}

async fn read_parquet(op: &Operator, path: &str) -> Vec<RecordBatch> {
    let buffer = op.read(path).await.unwrap();
    ParquetRecordBatchReaderBuilder::try_new(buffer.to_bytes())
        .unwrap()
        .build()
        .unwrap()
        .map(|batch| batch.unwrap())
        .collect()
}

async fn total_rows(op: &Operator) -> usize {
    let mut rows = 0;
    for path in data_files(op).await {
        rows += read_parquet(op, &path)
            .await
            .iter()
            .map(|b| b.num_rows())
            .sum::<usize>();
    }
    rows
}

#[tokio::test]
async fn single_file_run_writes_partitions_and_commits() {
    let op = memory_operator();
    op.write("uploads/sessions.csv", SESSIONS.as_bytes().to_vec())
        .await
        .unwrap();

    let job = TransformJob::new(op.clone(), op.clone());
    let summary = job
        .run(&context("run-1", "s3://raw/uploads/sessions.csv"))
        .await
        .unwrap();

    assert_eq!(summary.objects_read, 1);
    assert_eq!(summary.input_rows, 3);
    assert_eq!(summary.output_rows, 3);
    assert_eq!(summary.files_written, 2);
    assert_eq!(summary.parse_stats.invalid_energy_delivered_kwh, 1);
    assert!(summary.skipped_by.is_none());

    let files = data_files(&op).await;
    assert_eq!(
        files,
        vec![
            "processed_sessions/date=2024-01-01/station_id=ST1/part-00000-run-1.c000.snappy.parquet",
            "processed_sessions/date=2024-01-02/station_id=ST2/part-00001-run-1.c000.snappy.parquet",
        ]
    );

    let batches = read_parquet(&op, &files[0]).await;
    let batch = &batches[0];
    let duration = batch
        .column_by_name("session_duration_sec")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(duration.value(0), 5400);
    let status = batch
        .column_by_name("utilization_status")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(status.value(0), "LONG_SESSION");
    assert_eq!(status.value(1), "SHORT_SESSION");
    let energy = batch
        .column_by_name("energy_delivered_kwh")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(energy.value(0), 12.5);
    assert!(energy.is_null(1));
    assert!(batch.column_by_name("station_id").is_none());
    assert!(batch.column_by_name("date").is_none());

    let record_path = summary.record_path.unwrap();
    assert_eq!(
        record_path,
        "processed_sessions/_job_runs/ev-station-etl-job/run-1.json"
    );
    let body = op.read(&record_path).await.unwrap().to_vec();
    let record: RunRecord = serde_json::from_slice(&body).unwrap();
    assert_eq!(record.source, "s3://raw/uploads/sessions.csv");
    assert_eq!(record.target, "s3://curated/processed_sessions/");
    assert_eq!(record.output_rows, 3);
    assert_eq!(record.files.len(), 2);
    assert!(op.stat("processed_sessions/_SUCCESS").await.is_ok());
}

#[tokio::test]
async fn prefix_source_skips_hidden_and_empty_objects() {
    let op = memory_operator();
    op.write("raw/2024/01/a.csv", SESSIONS.as_bytes().to_vec())
        .await
        .unwrap();
    op.write("raw/2024/01/b.csv", SESSIONS.as_bytes().to_vec())
        .await
        .unwrap();
    op.write("raw/2024/01/empty.csv", Vec::<u8>::new())
        .await
        .unwrap();
    op.write("raw/_temporary/partial.csv", b"garbage".to_vec())
        .await
        .unwrap();
    op.write("raw/.staging.csv", b"garbage".to_vec())
        .await
        .unwrap();

    let summary = TransformJob::new(op.clone(), op.clone())
        .run(&context("run-1", "s3://landing/raw/"))
        .await
        .unwrap();

    assert_eq!(summary.objects_read, 2);
    assert_eq!(summary.empty_objects, 1);
    assert_eq!(summary.output_rows, 6);
    assert_eq!(total_rows(&op).await, 6);
}

#[tokio::test]
async fn rerun_appends_duplicate_rows() {
    let op = memory_operator();
    op.write("uploads/sessions.csv", SESSIONS.as_bytes().to_vec())
        .await
        .unwrap();
    let job = TransformJob::new(op.clone(), op.clone());

    job.run(&context("run-1", "s3://raw/uploads/sessions.csv"))
        .await
        .unwrap();
    job.run(&context("run-2", "s3://raw/uploads/sessions.csv"))
        .await
        .unwrap();

    assert_eq!(data_files(&op).await.len(), 4);
    assert_eq!(total_rows(&op).await, 6);
}

#[tokio::test]
async fn replay_guard_skips_committed_source() {
    let op = memory_operator();
    op.write("uploads/sessions.csv", SESSIONS.as_bytes().to_vec())
        .await
        .unwrap();
    let job = TransformJob::new(op.clone(), op.clone()).with_skip_processed_sources(true);

    job.run(&context("run-1", "s3://raw/uploads/sessions.csv"))
        .await
        .unwrap();
    let second = job
        .run(&context("run-2", "s3://raw/uploads/sessions.csv"))
        .await
        .unwrap();

    assert_eq!(second.skipped_by.as_deref(), Some("run-1"));
    assert!(second.record_path.is_none());
    assert_eq!(total_rows(&op).await, 3);
    assert!(op
        .stat("processed_sessions/_job_runs/ev-station-etl-job/run-2.json")
        .await
        .is_err());
}

#[tokio::test]
async fn missing_source_fails_the_run() {
    let op = memory_operator();
    let err = TransformJob::new(op.clone(), op.clone())
        .run(&context("run-1", "s3://raw/uploads/missing.csv"))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("matches no objects"));
    assert!(op.stat("processed_sessions/_SUCCESS").await.is_err());
}

#[tokio::test]
async fn missing_required_column_fails_without_commit() {
    let op = memory_operator();
    op.write(
        "uploads/bad.csv",
        b"start_time,station_id\n2024-01-01T10:00:00,ST1\n".to_vec(),
    )
    .await
    .unwrap();

    let err = TransformJob::new(op.clone(), op.clone())
        .run(&context("run-1", "s3://raw/uploads/bad.csv"))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("missing required column"));
    assert!(op
        .stat("processed_sessions/_job_runs/ev-station-etl-job/run-1.json")
        .await
        .is_err());
}

#[test]
fn context_generates_run_id_when_absent() {
    let args = JobArgs::resolve([
        "evetl-job",
        "--JOB_NAME",
        "ev-station-etl-job",
        "--RAW_S3_PATH",
        "s3://raw/file.csv",
        "--TARGET_S3_PATH",
        "s3://curated/out/",
    ])
    .unwrap();
    let ctx = JobContext::from_args(&args).unwrap();
    assert_eq!(ctx.run_id.len(), 36);
    assert_eq!(ctx.source.bucket(), "raw");

    let args = JobArgs::resolve([
        "evetl-job",
        "--JOB_NAME=etl",
        "--RAW_S3_PATH=s3://raw/file.csv",
        "--TARGET_S3_PATH=s3://curated/out/",
        "--JOB_RUN_ID=jr_42",
    ])
    .unwrap();
    assert_eq!(JobContext::from_args(&args).unwrap().run_id, "jr_42");
}

#[test]
fn invalid_location_is_rejected() {
    let args = JobArgs::resolve([
        "evetl-job",
        "--JOB_NAME=etl",
        "--RAW_S3_PATH=raw/file.csv",
        "--TARGET_S3_PATH=s3://curated/out/",
    ])
    .unwrap();
    assert!(JobContext::from_args(&args).is_err());
}
