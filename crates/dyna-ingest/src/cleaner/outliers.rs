//! IQR outlier tagging.
//!
//! Values are never altered. Each numeric column gets a boolean sibling named
//! `<column>_outlier` that is true where the value falls outside
//! `[Q1 - k*IQR, Q3 + k*IQR]`.

use crate::error::{PipelineError, Result, ResultExt};
use crate::types::ColumnValues;
use crate::utils::{quantile_sorted, sorted_values};
use polars::prelude::*;
use tracing::debug;

/// Suffix of the marker column added for each numeric column.
pub const OUTLIER_SUFFIX: &str = "_outlier";

/// Lower and upper fences of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fences {
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    /// Fences from the quartiles of the present values. `None` when there are
    /// no values.
    pub fn from_values(values: &[Option<f64>], multiplier: f64) -> Option<Self> {
        let sorted = sorted_values(values);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Outlier flags for one column. Missing cells are never outliers; a column
/// without values is all false.
pub fn outlier_flags(values: &[Option<f64>], multiplier: f64) -> Vec<bool> {
    match Fences::from_values(values, multiplier) {
        Some(fences) => values
            .iter()
            .map(|v| v.is_some_and(|x| !x.is_nan() && !fences.contains(x)))
            .collect(),
        None => vec![false; values.len()],
    }
}

/// Append a marker column for each of `columns`. Returns one processing step
/// per column.
pub fn tag_outliers(df: &mut DataFrame, columns: &[String], multiplier: f64) -> Result<Vec<String>> {
    let mut steps = Vec::new();

    for name in columns {
        let series = df
            .column(name)
            .map_err(|_| PipelineError::ColumnNotFound(name.clone()))?
            .as_materialized_series()
            .clone();

        let values = match ColumnValues::from_series(&series).context("Reading numeric column")? {
            ColumnValues::Numeric(values) => values,
            _ => continue,
        };

        let flags = outlier_flags(&values, multiplier);
        let flagged = flags.iter().filter(|f| **f).count();
        let marker = format!("{}{}", name, OUTLIER_SUFFIX);

        df.with_column(Series::new(marker.as_str().into(), flags))?;
        debug!("Column '{}': {} outliers flagged", name, flagged);
        steps.push(format!("Tagged {} outliers in '{}' as '{}'", flagged, name, marker));
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fences() {
        let values = [Some(10.0), Some(9999.0), Some(11.0), Some(12.0)];
        let fences = Fences::from_values(&values, 1.5).unwrap();
        // Q1 = 10.75, Q3 = 2508.75, IQR = 2498
        assert_eq!(fences.lower, 10.75 - 1.5 * 2498.0);
        assert_eq!(fences.upper, 2508.75 + 1.5 * 2498.0);
    }

    #[test]
    fn test_flags_extreme_value() {
        let values = vec![Some(10.0), Some(11.0), Some(12.0), Some(13.0), Some(9999.0)];
        let flags = outlier_flags(&values, 1.5);
        assert_eq!(flags, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_zero_iqr_flags_every_differing_value() {
        let values = vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0), Some(6.0)];
        let flags = outlier_flags(&values, 1.5);
        assert_eq!(flags, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_missing_cells_not_flagged() {
        let flags = outlier_flags(&[Some(1.0), None, Some(2.0)], 1.5);
        assert_eq!(flags, vec![false, false, false]);
    }

    #[test]
    fn test_empty_column_all_false() {
        assert_eq!(outlier_flags(&[None, None], 1.5), vec![false, false]);
    }

    #[test]
    fn test_tag_outliers_appends_marker() {
        let mut df = df! {
            "amount" => &[10i64, 9999, 11, 12],
        }
        .unwrap();

        let steps = tag_outliers(&mut df, &["amount".to_string()], 1.5).unwrap();

        assert_eq!(steps.len(), 1);
        assert_eq!(df.width(), 2);
        // original values untouched
        assert_eq!(df.column("amount").unwrap().dtype(), &DataType::Int64);
        let marker: Vec<Option<bool>> = df
            .column("amount_outlier")
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        // upper fence is 2508.75 + 1.5 * 2498 = 6255.75
        assert_eq!(marker, vec![Some(false), Some(true), Some(false), Some(false)]);
    }
}
