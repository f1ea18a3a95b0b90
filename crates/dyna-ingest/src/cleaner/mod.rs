//! Data cleaning module for uploaded tables.
//!
//! This module provides functionality for:
//! - Classifying columns as numeric or categorical
//! - Filling missing values (see [`crate::imputers`])
//! - Tagging IQR outliers in sibling columns
//! - Normalizing date-like text columns to ISO dates

mod classifier;
pub mod dates;
pub mod outliers;

pub use classifier::{classify_column, classify_columns};
pub use dates::{DATE_FORMATS, DateFormat, normalize_dates};
pub use outliers::{Fences, outlier_flags, tag_outliers};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::types::ColumnKind;
use polars::prelude::*;
use tracing::info;

/// A cleaned table plus what was done to it.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub data: DataFrame,
    /// Classification of the original columns. Text columns that gained a
    /// date sibling are reported as [`ColumnKind::DateLike`].
    pub column_kinds: Vec<(String, ColumnKind)>,
    /// Human-readable log of every change made.
    pub processing_steps: Vec<String>,
}

/// Runs the cleaning stages in order: classify, impute, tag outliers,
/// normalize dates.
#[derive(Debug, Clone)]
pub struct DataCleaner {
    imputer: StatisticalImputer,
    outlier_iqr_multiplier: f64,
    date_success_threshold: f64,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl DataCleaner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            imputer: StatisticalImputer::new(config.missing_placeholder.clone()),
            outlier_iqr_multiplier: config.outlier_iqr_multiplier,
            date_success_threshold: config.date_success_threshold,
        }
    }

    /// Clean a table. Original columns keep their position; derived columns
    /// are appended.
    pub fn clean(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let mut df = df;
        let mut processing_steps = Vec::new();

        info!("Cleaning {} rows x {} columns", df.height(), df.width());

        // 1. Classify
        let mut column_kinds = classify_columns(&df);

        // 2. Impute
        self.imputer
            .impute(&mut df, &column_kinds, &mut processing_steps)?;

        // 3. Outliers
        let numeric: Vec<String> = column_kinds
            .iter()
            .filter(|(_, kind)| *kind == ColumnKind::Numeric)
            .map(|(name, _)| name.clone())
            .collect();
        let outlier_steps = tag_outliers(&mut df, &numeric, self.outlier_iqr_multiplier)?;
        processing_steps.extend(outlier_steps);

        // 4. Dates
        let (converted, date_steps) = normalize_dates(&mut df, self.date_success_threshold)?;
        processing_steps.extend(date_steps);
        for (name, kind) in column_kinds.iter_mut() {
            if converted.contains(name) {
                *kind = ColumnKind::DateLike;
            }
        }

        info!(
            "Cleaning finished: {} columns ({} numeric, {} date-like)",
            df.width(),
            numeric.len(),
            converted.len()
        );

        Ok(CleaningOutcome {
            data: df,
            column_kinds,
            processing_steps,
        })
    }
}
