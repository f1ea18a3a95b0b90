//! Pipeline module.
//!
//! This module provides the upload processor and its progress reporting.

mod processor;
pub mod progress;

pub use processor::{DatasetProcessor, DatasetProcessorBuilder, UploadRequest};
pub use progress::{ClosureProgressReporter, ProcessingStage, ProgressReporter, ProgressUpdate};
