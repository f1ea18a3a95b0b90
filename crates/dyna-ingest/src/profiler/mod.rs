//! Data profiling module for dataset analysis.
//!
//! This module builds the statistical summary consumed by the visualization
//! service:
//! - Dataset-level shape and sampling information
//! - Per-column statistics (numeric, date-like, categorical)
//! - Grouping signals for columns whose values repeat
//!
//! Profiling is best-effort per column: a column whose statistics cannot be
//! computed is reported with its type and name only.

mod statistics;

pub use statistics::ProfileLimits;

use crate::config::PipelineConfig;
use crate::types::{ColumnStats, DatasetProfile, FileFormat, GroupInfo};
use indexmap::IndexMap;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Data profiler for summarizing a table.
#[derive(Debug, Clone)]
pub struct DataProfiler {
    limits: ProfileLimits,
    max_rows: Option<usize>,
}

impl Default for DataProfiler {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl DataProfiler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            limits: ProfileLimits {
                cardinality_limit: config.top_values_cardinality_limit,
                top_values_count: config.top_values_count,
                example_values_count: config.example_values_count,
            },
            max_rows: config.profile_max_rows,
        }
    }

    /// Profile a table.
    ///
    /// `n_rows`/`n_columns` describe the whole table. When the table is taller
    /// than the configured row bound, statistics come from its first rows and
    /// the sample size is reported alongside.
    pub fn build_profile(
        &self,
        df: &DataFrame,
        original_filename: &str,
        file_type: FileFormat,
    ) -> DatasetProfile {
        let (sample, sampled_rows) = match self.max_rows {
            Some(max) if df.height() > max => (df.head(Some(max)), Some(max)),
            _ => (df.clone(), None),
        };
        let sampled_cells = sampled_rows.map(|rows| rows * df.width());

        info!(
            "Profiling '{}': {} rows x {} columns{}",
            original_filename,
            df.height(),
            df.width(),
            sampled_rows.map_or(String::new(), |r| format!(" (first {} rows)", r))
        );

        let column_info = self.column_info(&sample);
        let grouped_info = self.grouped_info(&sample);

        DatasetProfile {
            original_filename: original_filename.to_string(),
            file_type,
            n_rows: df.height(),
            n_columns: df.width(),
            sampled_rows,
            sampled_cells,
            column_info,
            grouped_info,
        }
    }

    /// Statistics for every column; failures degrade to a minimal record.
    fn column_info(&self, df: &DataFrame) -> IndexMap<String, ColumnStats> {
        let mut info = IndexMap::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let stats = match statistics::column_stats(series, &self.limits) {
                Ok(stats) => stats,
                Err(e) => {
                    warn!("Could not compute statistics: {}", e);
                    statistics::minimal_stats(series)
                }
            };
            info.insert(series.name().to_string(), stats);
        }
        info
    }

    fn grouped_info(&self, df: &DataFrame) -> IndexMap<String, GroupInfo> {
        let mut grouped = IndexMap::new();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            match statistics::group_info(series, self.limits.top_values_count) {
                Ok(Some(info)) => {
                    debug!(
                        "Column '{}' groups into {} values",
                        series.name(),
                        info.unique_values
                    );
                    grouped.insert(series.name().to_string(), info);
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping grouping for column: {}", e),
            }
        }
        grouped
    }
}
