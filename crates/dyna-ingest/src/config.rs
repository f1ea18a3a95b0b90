//! Configuration types for the ingestion pipeline.
//!
//! This module provides configuration options using the builder pattern.
//! The thresholds here are the heuristics the cleaning and profiling stages
//! rely on; defaults reproduce the behaviour uploads have always had.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding [`PipelineConfig::upload_dir`].
pub const UPLOAD_DIR_ENV: &str = "DYNA_UPLOAD_DIR";

/// Environment variable overriding [`PipelineConfig::profile_max_rows`].
/// A value of `0` disables sampling.
pub const PROFILE_MAX_ROWS_ENV: &str = "DYNA_PROFILE_MAX_ROWS";

/// Configuration for the ingestion pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use dyna_ingest::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .upload_dir("/var/lib/dyna/uploads")
///     .profile_max_rows(Some(10_000))
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory where uploaded files are stored (and replaced by their
    /// cleaned version).
    /// Default: "uploads"
    pub upload_dir: PathBuf,

    /// Minimum share of rows (exclusive) that must parse as dates for a
    /// `<col>_date` column to be kept.
    /// Default: 0.5
    pub date_success_threshold: f64,

    /// Multiplier applied to the IQR when computing outlier fences.
    /// Default: 1.5
    pub outlier_iqr_multiplier: f64,

    /// Value written into categorical columns that have no values at all.
    /// Default: "Unknown"
    pub missing_placeholder: String,

    /// Categorical columns with fewer distinct values than this get a
    /// `top_values` map in the profile; others get `example_values`.
    /// Default: 10
    pub top_values_cardinality_limit: usize,

    /// Number of value/count pairs reported in `top_values` and `grouped_info`.
    /// Default: 5
    pub top_values_count: usize,

    /// Number of distinct example values reported for high-cardinality columns.
    /// Default: 3
    pub example_values_count: usize,

    /// Upper bound on the rows fed to the profiler. `None` profiles everything.
    /// Default: Some(50_000)
    pub profile_max_rows: Option<usize>,

    /// Rows returned by a dataset preview when the caller gives no limit.
    /// Default: 10
    pub preview_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            date_success_threshold: 0.5,
            outlier_iqr_multiplier: 1.5,
            missing_placeholder: "Unknown".to_string(),
            top_values_cardinality_limit: 10,
            top_values_count: 5,
            example_values_count: 3,
            profile_max_rows: Some(50_000),
            preview_rows: 10,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Build a configuration from defaults overridden by environment variables.
    ///
    /// Unparsable values are rejected instead of silently ignored.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        let mut builder = Self::builder();

        if let Ok(dir) = std::env::var(UPLOAD_DIR_ENV) {
            builder = builder.upload_dir(dir);
        }

        if let Ok(raw) = std::env::var(PROFILE_MAX_ROWS_ENV) {
            let rows: usize = raw.trim().parse().map_err(|_| {
                ConfigValidationError::InvalidEnvValue {
                    var: PROFILE_MAX_ROWS_ENV.to_string(),
                    value: raw.clone(),
                }
            })?;
            builder = builder.profile_max_rows(if rows == 0 { None } else { Some(rows) });
        }

        builder.build()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.date_success_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "date_success_threshold".to_string(),
                value: self.date_success_threshold,
            });
        }

        if !self.outlier_iqr_multiplier.is_finite() || self.outlier_iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(
                self.outlier_iqr_multiplier,
            ));
        }

        if self.top_values_count == 0 {
            return Err(ConfigValidationError::ZeroCount("top_values_count".to_string()));
        }

        if self.preview_rows == 0 {
            return Err(ConfigValidationError::ZeroCount("preview_rows".to_string()));
        }

        if self.profile_max_rows == Some(0) {
            return Err(ConfigValidationError::ZeroCount("profile_max_rows".to_string()));
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyUploadDir);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid IQR multiplier: {0} (must be a finite, non-negative number)")]
    InvalidMultiplier(f64),

    #[error("'{0}' must be at least 1")]
    ZeroCount(String),

    #[error("Upload directory must not be empty")]
    EmptyUploadDir,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnvValue { var: String, value: String },
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    upload_dir: Option<PathBuf>,
    date_success_threshold: Option<f64>,
    outlier_iqr_multiplier: Option<f64>,
    missing_placeholder: Option<String>,
    top_values_cardinality_limit: Option<usize>,
    top_values_count: Option<usize>,
    example_values_count: Option<usize>,
    profile_max_rows: Option<Option<usize>>,
    preview_rows: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Set the directory uploads are stored in.
    pub fn upload_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(path.into());
        self
    }

    /// Set the parse-success share required to keep a derived date column.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn date_success_threshold(mut self, threshold: f64) -> Self {
        self.date_success_threshold = Some(threshold);
        self
    }

    /// Set the IQR multiplier used for outlier fences.
    pub fn outlier_iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.outlier_iqr_multiplier = Some(multiplier);
        self
    }

    /// Set the placeholder for entirely-missing categorical columns.
    pub fn missing_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.missing_placeholder = Some(placeholder.into());
        self
    }

    /// Set the cardinality below which categorical columns report top values.
    pub fn top_values_cardinality_limit(mut self, limit: usize) -> Self {
        self.top_values_cardinality_limit = Some(limit);
        self
    }

    /// Set how many value/count pairs are reported.
    pub fn top_values_count(mut self, count: usize) -> Self {
        self.top_values_count = Some(count);
        self
    }

    /// Set how many example values are reported for high-cardinality columns.
    pub fn example_values_count(mut self, count: usize) -> Self {
        self.example_values_count = Some(count);
        self
    }

    /// Bound the number of rows the profiler looks at (`None` = all rows).
    pub fn profile_max_rows(mut self, rows: Option<usize>) -> Self {
        self.profile_max_rows = Some(rows);
        self
    }

    /// Set the default preview size.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            upload_dir: self.upload_dir.unwrap_or(defaults.upload_dir),
            date_success_threshold: self
                .date_success_threshold
                .unwrap_or(defaults.date_success_threshold),
            outlier_iqr_multiplier: self
                .outlier_iqr_multiplier
                .unwrap_or(defaults.outlier_iqr_multiplier),
            missing_placeholder: self
                .missing_placeholder
                .unwrap_or(defaults.missing_placeholder),
            top_values_cardinality_limit: self
                .top_values_cardinality_limit
                .unwrap_or(defaults.top_values_cardinality_limit),
            top_values_count: self.top_values_count.unwrap_or(defaults.top_values_count),
            example_values_count: self
                .example_values_count
                .unwrap_or(defaults.example_values_count),
            profile_max_rows: self.profile_max_rows.unwrap_or(defaults.profile_max_rows),
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
        };

        config.validate()?;
        Ok(config)
    }
}
