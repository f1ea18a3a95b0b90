//! Upload orchestration.
//!
//! [`DatasetProcessor`] takes an upload from raw bytes to a cleaned file on
//! disk plus a dataset record, and serves profiles and previews of stored
//! datasets afterwards.

use crate::cleaner::DataCleaner;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ResultExt};
use crate::formats;
use crate::pipeline::progress::{ClosureProgressReporter, ProgressReporter, ProgressUpdate};
use crate::profiler::DataProfiler;
use crate::store::{DatasetStore, InMemoryDatasetStore};
use crate::types::{DatasetProfile, DatasetRecord, FileFormat, NewDataset, TablePreview};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Who uploaded a file and what it should be called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub original_filename: String,
    /// Format tag sent with the upload, e.g. `"csv"`.
    pub declared_type: String,
    pub owner_id: u64,
    pub is_public: bool,
}

impl UploadRequest {
    pub fn new(original_filename: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            original_filename: original_filename.into(),
            declared_type: declared_type.into(),
            owner_id: 0,
            is_public: false,
        }
    }

    pub fn owner(mut self, owner_id: u64) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

/// The ingestion pipeline.
///
/// Use [`DatasetProcessor::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use dyna_ingest::{DatasetProcessor, UploadRequest};
///
/// let processor = DatasetProcessor::builder()
///     .config(PipelineConfig::from_env()?)
///     .on_progress(|update| println!("[{}%] {}", update.percent, update.message))
///     .build()?;
///
/// let file = std::fs::File::open("sales.csv")?;
/// let record = processor.process(file, &UploadRequest::new("sales.csv", "csv").owner(7))?;
/// let profile = processor.build_profile(record.id)?;
/// ```
pub struct DatasetProcessor {
    config: PipelineConfig,
    store: Arc<dyn DatasetStore>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    profiler: DataProfiler,
}

// Shared between request handlers.
static_assertions::assert_impl_all!(DatasetProcessor: Send, Sync);

impl DatasetProcessor {
    /// Create a new processor builder.
    pub fn builder() -> DatasetProcessorBuilder {
        DatasetProcessorBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        &self.store
    }

    /// Store an uploaded byte stream and run it through the pipeline.
    ///
    /// The declared type is checked before anything is written. The stream is
    /// saved as `<upload_dir>/<uuid>.<ext>` and then handled like
    /// [`process_file`](Self::process_file).
    pub fn process<R: Read>(&self, mut reader: R, request: &UploadRequest) -> Result<DatasetRecord> {
        let format: FileFormat = request.declared_type.parse()?;

        fs::create_dir_all(&self.config.upload_dir).context(format!(
            "Creating upload directory {}",
            self.config.upload_dir.display()
        ))?;

        let filename = format!("{}.{}", Uuid::new_v4(), format.as_str());
        let path = self.config.upload_dir.join(&filename);

        if let Err(e) = save_stream(&mut reader, &path) {
            self.report_progress(ProgressUpdate::failed(e.to_string()));
            remove_upload(&path);
            return Err(e.with_context("Failed to store upload"));
        }
        debug!("Stored upload '{}' as {}", request.original_filename, path.display());

        self.run(&path, filename, format, request)
    }

    /// Run an upload already saved at `path` through the pipeline.
    ///
    /// The cleaned table replaces the file in the same format. On any failure
    /// after the format check the file is removed.
    pub fn process_file(&self, path: &Path, request: &UploadRequest) -> Result<DatasetRecord> {
        let format: FileFormat = request.declared_type.parse()?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.original_filename.clone());

        self.run(path, filename, format, request)
    }

    /// Profile a stored dataset.
    pub fn build_profile(&self, dataset_id: u64) -> Result<DatasetProfile> {
        let record = self.find(dataset_id)?;
        let df = formats::read_table(&record.file_path, record.file_type)?;

        Ok(self
            .profiler
            .build_profile(&df, &record.original_filename, record.file_type))
    }

    /// First rows of a stored dataset. `None` uses the configured default.
    pub fn preview(&self, dataset_id: u64, max_rows: Option<usize>) -> Result<TablePreview> {
        let record = self.find(dataset_id)?;
        let max_rows = max_rows.unwrap_or(self.config.preview_rows);

        formats::read_preview(&record.file_path, record.file_type, max_rows)
    }

    fn find(&self, dataset_id: u64) -> Result<DatasetRecord> {
        self.store
            .get(dataset_id)?
            .ok_or(PipelineError::DatasetNotFound(dataset_id))
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run(
        &self,
        path: &Path,
        filename: String,
        format: FileFormat,
        request: &UploadRequest,
    ) -> Result<DatasetRecord> {
        match self.run_internal(path, filename, format, request) {
            Ok(record) => {
                self.report_progress(ProgressUpdate::complete());
                Ok(record)
            }
            Err(e) => {
                error!("Processing '{}' failed: {}", request.original_filename, e);
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                remove_upload(path);
                Err(e.with_context(format!(
                    "Failed to process '{}'",
                    request.original_filename
                )))
            }
        }
    }

    fn run_internal(
        &self,
        path: &Path,
        filename: String,
        format: FileFormat,
        request: &UploadRequest,
    ) -> Result<DatasetRecord> {
        let start_time = Instant::now();

        // Step 1: Read
        self.report_progress(ProgressUpdate::reading(format));
        info!("Step 1: Reading {} ({})", request.original_filename, format);
        let df = formats::read_table(path, format)?;

        // Step 2: Clean
        self.report_progress(ProgressUpdate::cleaning());
        info!("Step 2: Cleaning {} rows x {} columns", df.height(), df.width());
        let mut outcome = self.cleaner.clean(df)?;
        for step in &outcome.processing_steps {
            debug!("  {}", step);
        }

        // Step 3: Save
        self.report_progress(ProgressUpdate::saving());
        info!("Step 3: Saving cleaned data to {}", path.display());
        formats::write_table(&mut outcome.data, path, format)?;

        let record = self.store.create(NewDataset {
            owner_id: request.owner_id,
            filename,
            original_filename: request.original_filename.clone(),
            file_path: path.to_path_buf(),
            file_type: format,
            n_rows: outcome.data.height(),
            n_columns: outcome.data.width(),
            is_public: request.is_public,
        })?;

        info!(
            "Dataset {} created: {} rows x {} columns in {:.2?}",
            record.id,
            record.n_rows,
            record.n_columns,
            start_time.elapsed()
        );
        Ok(record)
    }
}

fn save_stream<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    let file = File::create(path).context(format!("Creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    io::copy(reader, &mut writer).context("Writing upload")?;
    writer.flush().context("Flushing upload")?;
    Ok(())
}

fn remove_upload(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed upload {}", path.display()),
        Err(e) => warn!("Could not remove upload {}: {}", path.display(), e),
    }
}

/// Builder for [`DatasetProcessor`].
#[derive(Default)]
pub struct DatasetProcessorBuilder {
    config: Option<PipelineConfig>,
    store: Option<Arc<dyn DatasetStore>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl DatasetProcessorBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Shortcut for overriding only the upload directory.
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let mut config = self.config.take().unwrap_or_default();
        config.upload_dir = dir.into();
        self.config = Some(config);
        self
    }

    /// Set the record store. Defaults to an [`InMemoryDatasetStore`].
    pub fn store(mut self, store: Arc<dyn DatasetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the processor.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<DatasetProcessor> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;

        Ok(DatasetProcessor {
            cleaner: DataCleaner::new(&config),
            profiler: DataProfiler::new(&config),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryDatasetStore::new())),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}
