//! Progress reporting for upload processing.
//!
//! Checkpoints are advisory: a reporter that drops updates does not affect
//! the outcome of a run.
//!
//! # Example
//!
//! ```rust,ignore
//! use dyna_ingest::DatasetProcessor;
//!
//! let processor = DatasetProcessor::builder()
//!     .on_progress(|update| {
//!         println!("[{:>3}%] {}", update.percent, update.message);
//!     })
//!     .build()?;
//! ```

use crate::types::FileFormat;
use serde::{Deserialize, Serialize};

/// Checkpoints of an upload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    /// Parsing the stored upload
    Reading,
    /// Imputation, outlier tagging and date normalization
    Cleaning,
    /// Writing the cleaned table and the dataset record
    Saving,
    /// Run finished successfully
    Complete,
    /// Run failed; the upload was removed
    Failed,
}

impl ProcessingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Reading => "Reading File",
            Self::Cleaning => "Cleaning Data",
            Self::Saving => "Saving Dataset",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Overall progress reported when the stage starts.
    pub fn percent(&self) -> u8 {
        match self {
            Self::Reading => 10,
            Self::Cleaning => 30,
            Self::Saving => 60,
            Self::Complete => 100,
            Self::Failed => 0,
        }
    }
}

/// One progress checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Overall progress (0 - 100)
    pub percent: u8,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: ProcessingStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: stage.percent(),
            message: message.into(),
        }
    }

    pub fn reading(format: FileFormat) -> Self {
        Self::new(
            ProcessingStage::Reading,
            format!("Reading {} file...", format.as_str().to_uppercase()),
        )
    }

    pub fn cleaning() -> Self {
        Self::new(ProcessingStage::Cleaning, "Cleaning data...")
    }

    pub fn saving() -> Self {
        Self::new(ProcessingStage::Saving, "Saving cleaned data...")
    }

    pub fn complete() -> Self {
        Self::new(ProcessingStage::Complete, "Processing complete!")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ProcessingStage::Failed, message)
    }
}

/// Trait for receiving progress updates during processing.
///
/// Implementations must be `Send + Sync` because the processor may be shared
/// between request threads.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
