//! Statistical imputation methods.
//!
//! Median for numeric columns, mode for categorical ones, and a placeholder
//! when a categorical column has nothing to take a mode of.

use crate::error::{PipelineError, Result, ResultExt};
use crate::types::{ColumnKind, ColumnValues};
use crate::utils::{median, mode};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
#[derive(Debug, Clone)]
pub struct StatisticalImputer {
    placeholder: String,
}

impl Default for StatisticalImputer {
    fn default() -> Self {
        Self::new("Unknown")
    }
}

impl StatisticalImputer {
    /// Create an imputer that writes `placeholder` into categorical columns
    /// with no values at all.
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    /// Fill the gaps of every classified column.
    ///
    /// Columns without missing cells are left untouched, so running this
    /// twice changes nothing the second time.
    pub fn impute(
        &self,
        df: &mut DataFrame,
        kinds: &[(String, ColumnKind)],
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        for (name, kind) in kinds {
            let series = df
                .column(name)
                .map_err(|_| PipelineError::ColumnNotFound(name.clone()))?
                .as_materialized_series();
            let values = ColumnValues::from_series(series)
                .context(format!("Reading column '{}'", name))?;

            let missing = values.missing_count();
            if missing == 0 {
                continue;
            }

            let (filled, step) = match kind {
                ColumnKind::Numeric => Self::fill_numeric(values, name),
                ColumnKind::Categorical | ColumnKind::DateLike => self.fill_categorical(values, name),
            };

            df.replace(name, filled.into_series(name))?;
            debug!("{}", step);
            processing_steps.push(format!("{} ({} missing)", step, missing));
        }

        Ok(())
    }

    fn fill_numeric(values: ColumnValues, name: &str) -> (ColumnValues, String) {
        match values {
            ColumnValues::Numeric(cells) => match median(&cells) {
                Some(fill) => (
                    ColumnValues::Numeric(cells.into_iter().map(|v| Some(v.unwrap_or(fill))).collect()),
                    format!("Filled '{}' with median {}", name, fill),
                ),
                // the classifier never marks an empty column numeric
                None => (
                    ColumnValues::Numeric(cells),
                    format!("Left '{}' unfilled: no values to take a median of", name),
                ),
            },
            other => (other, format!("Left '{}' unfilled: not numeric", name)),
        }
    }

    fn fill_categorical(&self, values: ColumnValues, name: &str) -> (ColumnValues, String) {
        match values {
            ColumnValues::Text(cells) => match mode(&cells) {
                Some(fill) => {
                    let step = format!("Filled '{}' with mode '{}'", name, fill);
                    let filled = cells
                        .into_iter()
                        .map(|v| Some(v.unwrap_or_else(|| fill.clone())))
                        .collect();
                    (ColumnValues::Text(filled), step)
                }
                None => self.placeholder_column(cells.len(), name),
            },
            ColumnValues::Bool(cells) => match mode(&cells) {
                Some(fill) => (
                    ColumnValues::Bool(cells.into_iter().map(|v| Some(v.unwrap_or(fill))).collect()),
                    format!("Filled '{}' with mode {}", name, fill),
                ),
                None => self.placeholder_column(cells.len(), name),
            },
            // only an entirely missing numeric column is classified categorical
            ColumnValues::Numeric(cells) => self.placeholder_column(cells.len(), name),
        }
    }

    fn placeholder_column(&self, len: usize, name: &str) -> (ColumnValues, String) {
        (
            ColumnValues::Text(vec![Some(self.placeholder.clone()); len]),
            format!("Filled empty column '{}' with '{}'", name, self.placeholder),
        )
    }
}
