//! Dataset Ingestion Pipeline Library
//!
//! Turns uploaded CSV and JSON files into cleaned tables plus a statistical
//! profile, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Format Reading**: CSV as-is, JSON lists of records or grouped objects
//!   flattened with a `_key` column
//! - **Cleaning**: median/mode imputation, IQR outlier tagging in
//!   `<column>_outlier` siblings, date normalization into `<column>_date`
//! - **Profiling**: per-column statistics and grouping signals for the
//!   visualization service, best-effort per column
//! - **Progress Reporting**: checkpoints while an upload is processed
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dyna_ingest::{DatasetProcessor, PipelineConfig, UploadRequest};
//!
//! let processor = DatasetProcessor::builder()
//!     .config(PipelineConfig::from_env()?)
//!     .on_progress(|update| {
//!         println!("[{:>3}%] {}", update.percent, update.message);
//!     })
//!     .build()?;
//!
//! let upload = std::fs::File::open("sales.csv")?;
//! let record = processor.process(upload, &UploadRequest::new("sales.csv", "csv").owner(7))?;
//!
//! let profile = processor.build_profile(record.id)?;
//! println!("{}", serde_json::to_string_pretty(&profile)?);
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to tune the cleaning and profiling heuristics:
//!
//! ```rust,ignore
//! use dyna_ingest::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .upload_dir("/var/lib/dyna/uploads")
//!     .date_success_threshold(0.5)       // Keep `_date` columns above 50% parsed
//!     .outlier_iqr_multiplier(1.5)       // Fences at Q1 - 1.5*IQR, Q3 + 1.5*IQR
//!     .top_values_cardinality_limit(10)  // `top_values` below 10 distinct values
//!     .profile_max_rows(Some(50_000))    // Profile at most the first 50k rows
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod formats;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleaningOutcome, DataCleaner};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{ColumnStatsError, PipelineError, Result as PipelineResult, ResultExt};
pub use imputers::StatisticalImputer;
pub use pipeline::{
    ClosureProgressReporter, DatasetProcessor, DatasetProcessorBuilder, ProcessingStage,
    ProgressReporter, ProgressUpdate, UploadRequest,
};
pub use profiler::{DataProfiler, ProfileLimits};
pub use store::{DatasetStore, InMemoryDatasetStore};
pub use types::{
    CategoricalStats, ColumnKind, ColumnStats, ColumnValues, DatasetProfile, DatasetRecord,
    DateStats, FileFormat, GroupInfo, MinimalStats, NewDataset, NumericStats, TablePreview,
};
