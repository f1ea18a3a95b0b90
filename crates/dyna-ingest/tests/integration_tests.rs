//! Integration tests for the dataset ingestion pipeline.
//!
//! These tests run uploads end to end: store, clean, persist, then profile
//! and preview the stored dataset.

use dyna_ingest::formats;
use dyna_ingest::imputers::StatisticalImputer;
use dyna_ingest::utils::display_values;
use dyna_ingest::{
    ColumnStats, DataProfiler, DatasetProcessor, DatasetRecord, FileFormat, PipelineConfig,
    PipelineError, ProcessingStage, UploadRequest, cleaner::classify_columns,
};
use parking_lot::Mutex;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn processor(dir: &TempDir) -> DatasetProcessor {
    DatasetProcessor::builder()
        .upload_dir(dir.path())
        .build()
        .expect("default config is valid")
}

fn upload(processor: &DatasetProcessor, fixture: &str, declared_type: &str) -> DatasetRecord {
    let file = File::open(fixtures_path().join(fixture)).expect("fixture exists");
    processor
        .process(file, &UploadRequest::new(fixture, declared_type).owner(1))
        .expect("upload should be processed")
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn cells(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    display_values(df.column(column).unwrap().as_materialized_series()).unwrap()
}

fn some(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

fn upload_count(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

// ============================================================================
// CSV Uploads
// ============================================================================

#[test]
fn test_sales_csv_cleaned_and_stored() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "sales.csv", "csv");

    assert_eq!(record.file_type, FileFormat::Csv);
    assert_eq!(record.original_filename, "sales.csv");
    assert_eq!(record.n_rows, 4);
    assert_eq!(record.n_columns, 6);
    assert_eq!(record.file_path.parent(), Some(dir.path()));

    let stored = formats::read_table(&record.file_path, FileFormat::Csv).unwrap();
    assert_eq!(
        column_names(&stored),
        vec!["id", "date", "amount", "id_outlier", "amount_outlier", "date_date"]
    );
    assert_eq!(stored.height(), record.n_rows);
    assert_eq!(stored.width(), record.n_columns);
}

#[test]
fn test_sales_csv_outliers_and_dates() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "sales.csv", "csv");
    let stored = formats::read_table(&record.file_path, FileFormat::Csv).unwrap();

    assert_eq!(
        cells(&stored, "amount_outlier"),
        some(&["false", "true", "false", "false"])
    );
    assert_eq!(
        cells(&stored, "id_outlier"),
        some(&["false", "false", "false", "false"])
    );
    // the missing date is filled with the mode before parsing
    assert_eq!(
        cells(&stored, "date_date"),
        some(&["2023-01-01", "2023-02-01", "2023-03-01", "2023-01-01"])
    );
    // original values are kept
    assert_eq!(cells(&stored, "amount"), some(&["10", "9999", "11", "12"]));
}

#[test]
fn test_na_tokens_keep_column_numeric() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);
    let upload = "id,amount\n1,10\n2,NA\n3,12\n4,11\n5,9999\n";

    let record = processor
        .process(upload.as_bytes(), &UploadRequest::new("amounts.csv", "csv"))
        .unwrap();
    let stored = formats::read_table(&record.file_path, FileFormat::Csv).unwrap();

    assert_eq!(
        column_names(&stored),
        vec!["id", "amount", "id_outlier", "amount_outlier"]
    );
    // NA is filled with the median of 10, 11, 12, 9999
    assert_eq!(cells(&stored, "amount"), some(&["10", "11.5", "12", "11", "9999"]));
    assert_eq!(
        cells(&stored, "amount_outlier"),
        some(&["false", "false", "false", "false", "true"])
    );

    let profile = processor.build_profile(record.id).unwrap();
    assert!(matches!(
        profile.column_info.get("amount"),
        Some(ColumnStats::Numeric(_))
    ));
}

#[test]
fn test_minority_dates_get_no_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "notes.csv", "csv");
    let stored = formats::read_table(&record.file_path, FileFormat::Csv).unwrap();

    assert_eq!(
        column_names(&stored),
        vec!["ticket", "comment", "opened", "ticket_outlier", "opened_date"]
    );
    assert_eq!(
        cells(&stored, "opened_date"),
        some(&["2023-01-05", "2023-01-06", "2023-01-05", "2023-01-09"])
    );
}

// ============================================================================
// JSON Uploads
// ============================================================================

#[test]
fn test_grouped_json_flattened() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "grouped.json", "json");
    assert_eq!(record.n_rows, 3);

    let stored = formats::read_table(&record.file_path, FileFormat::Json).unwrap();
    assert_eq!(column_names(&stored), vec!["x", "_key", "x_outlier"]);
    assert_eq!(cells(&stored, "x"), some(&["1", "2", "3"]));
    assert_eq!(cells(&stored, "_key"), some(&["groupA", "groupA", "groupB"]));
}

#[test]
fn test_grouped_json_profile() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "grouped.json", "json");
    let profile = processor.build_profile(record.id).unwrap();

    let key = profile.grouped_info.get("_key").expect("_key repeats");
    assert_eq!(key.unique_values, 2);
    assert_eq!(key.top_values.get("groupA"), Some(&2));
    assert_eq!(key.top_values.get("groupB"), Some(&1));
    assert!(!profile.grouped_info.contains_key("x"));

    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["file_type"], "json");
    assert_eq!(json["grouped_info"]["_key"]["top_values"], serde_json::json!({"groupA": 2, "groupB": 1}));
}

#[test]
fn test_json_records_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "customers.json", "json");
    let stored = formats::read_table(&record.file_path, FileFormat::Json).unwrap();

    assert_eq!(
        column_names(&stored),
        vec!["name", "age", "active", "signup", "tags", "age_outlier", "signup_date"]
    );
    assert_eq!(cells(&stored, "age"), some(&["31", "38", "45"]));
    // tie between true and false resolves to the smaller value
    assert_eq!(cells(&stored, "active"), some(&["true", "false", "false"]));
    assert_eq!(
        cells(&stored, "signup_date"),
        vec![Some("2023-03-15".to_string()), Some("2023-04-01".to_string()), None]
    );
    assert_eq!(stored.column("tags").unwrap().null_count(), 0);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[test]
fn test_unsupported_type_rejected_before_storage() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let file = File::open(fixtures_path().join("sales.csv")).unwrap();
    let err = processor
        .process(file, &UploadRequest::new("sales.xlsx", "xlsx"))
        .unwrap_err();

    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    assert_eq!(upload_count(dir.path()), 0);
}

#[test]
fn test_malformed_json_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();
    let processor = DatasetProcessor::builder()
        .upload_dir(dir.path())
        .on_progress(move |update| sink.lock().push(update.stage))
        .build()
        .unwrap();

    let err = processor
        .process("{\"a\": [1, ".as_bytes(), &UploadRequest::new("broken.json", "json"))
        .unwrap_err();

    assert!(err.is_client_error());
    assert_eq!(err.error_code(), "MALFORMED_INPUT");
    assert_eq!(upload_count(dir.path()), 0);
    assert_eq!(
        *stages.lock(),
        vec![ProcessingStage::Reading, ProcessingStage::Failed]
    );
}

#[test]
fn test_process_file_removes_unreadable_upload() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);
    let path = dir.path().join("saved.json");
    fs::write(&path, "42").unwrap();

    let err = processor
        .process_file(&path, &UploadRequest::new("numbers.json", "json"))
        .unwrap_err();

    assert!(matches!(err.root(), PipelineError::MalformedInput(_)));
    assert!(!path.exists());
}

#[test]
fn test_preview_unknown_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let err = processor(&dir).preview(99, None).unwrap_err();
    assert!(matches!(err, PipelineError::DatasetNotFound(99)));
}

// ============================================================================
// Profiles and Previews
// ============================================================================

#[test]
fn test_sales_profile() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "sales.csv", "csv");
    let profile = processor.build_profile(record.id).unwrap();

    assert_eq!(profile.original_filename, "sales.csv");
    assert_eq!(profile.n_rows, 4);
    assert_eq!(profile.n_columns, 6);
    assert_eq!(profile.column_info.len(), 6);

    let Some(ColumnStats::Numeric(amount)) = profile.column_info.get("amount") else {
        panic!("amount should have numeric stats");
    };
    assert_eq!(amount.min, Some(10.0));
    assert_eq!(amount.max, Some(9999.0));
    assert_eq!(amount.median, Some(11.5));

    let Some(ColumnStats::DateTime(dates)) = profile.column_info.get("date_date") else {
        panic!("date_date should have date stats");
    };
    assert_eq!(dates.min.as_deref(), Some("2023-01-01"));
    assert_eq!(dates.max.as_deref(), Some("2023-03-01"));

    let Some(ColumnStats::Categorical(date)) = profile.column_info.get("date") else {
        panic!("date should have categorical stats");
    };
    assert_eq!(date.unique_values, 3);
    assert_eq!(date.top_values.as_ref().unwrap().get("2023-01-01"), Some(&2));

    assert!(profile.grouped_info.contains_key("amount_outlier"));
    assert!(profile.grouped_info.contains_key("date"));
    assert!(!profile.grouped_info.contains_key("id"));
    assert!(!profile.grouped_info.contains_key("amount"));
}

#[test]
fn test_preview_rows() {
    let dir = tempfile::tempdir().unwrap();
    let processor = processor(&dir);

    let record = upload(&processor, "sales.csv", "csv");
    let preview = processor.preview(record.id, Some(2)).unwrap();

    assert_eq!(preview.columns.len(), 6);
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.rows[1][2], serde_json::json!(9999));
}

#[test]
fn test_empty_numeric_column_profile() {
    let df = df! {
        "label" => &["a", "b"],
        "score" => &[None::<f64>, None],
    }
    .unwrap();

    let profile = DataProfiler::new(&PipelineConfig::default()).build_profile(&df, "empty.csv", FileFormat::Csv);

    let json = serde_json::to_value(profile.column_info.get("score").unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "type": "float64",
            "name": "score",
            "min": null,
            "max": null,
            "mean": null,
            "median": null,
            "std": null
        })
    );
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_imputation_is_idempotent_on_fixture() {
    let mut df = formats::read_table(&fixtures_path().join("customers.json"), FileFormat::Json).unwrap();
    let kinds = classify_columns(&df);
    let imputer = StatisticalImputer::default();

    let mut steps = Vec::new();
    imputer.impute(&mut df, &kinds, &mut steps).unwrap();
    let once = df.clone();
    assert!(!steps.is_empty());

    let mut steps = Vec::new();
    let kinds = classify_columns(&df);
    imputer.impute(&mut df, &kinds, &mut steps).unwrap();
    assert!(steps.is_empty());
    assert!(df.equals_missing(&once));
}

#[test]
fn test_concurrent_uploads_share_store() {
    let dir = tempfile::tempdir().unwrap();
    let processor = Arc::new(processor(&dir));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let processor = processor.clone();
            std::thread::spawn(move || upload(&processor, "sales.csv", "csv").id)
        })
        .collect();

    let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(upload_count(dir.path()), 4);
}
