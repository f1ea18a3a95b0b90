//! Shared utilities for the ingestion pipeline.
//!
//! Dtype helpers plus the small order-statistics toolkit the imputer, the
//! outlier tagger and the profiler all share.

use indexmap::IndexMap;
use polars::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for pipeline purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

/// Lowercase dtype name used in profiles (`int64`, `float64`, `string`...).
pub fn dtype_name(dtype: &DataType) -> String {
    match dtype {
        DataType::Datetime(_, _) => "datetime".to_string(),
        DataType::Categorical(_, _) => "categorical".to_string(),
        DataType::List(_) => "list".to_string(),
        DataType::Struct(_) => "struct".to_string(),
        other => format!("{:?}", other).to_lowercase(),
    }
}

// =============================================================================
// Order Statistics
// =============================================================================

/// Non-missing values sorted ascending. NaNs are dropped.
pub fn sorted_values(values: &[Option<f64>]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Quantile of an ascending slice using linear interpolation between the
/// two nearest order statistics. `None` for an empty slice.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(values[lower]);
    }
    let weight = pos - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

/// Median of the non-missing values.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    quantile_sorted(&sorted_values(values), 0.5)
}

/// Arithmetic mean of an ascending slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). Needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

// =============================================================================
// Frequency Utilities
// =============================================================================

/// Most frequent non-missing value. Ties go to the smallest value.
pub fn mode<T>(values: &[Option<T>]) -> Option<T>
where
    T: Ord + Hash + Clone,
{
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(value, _)| value.clone())
}

/// Counts of the non-missing values, most frequent first. Equal counts keep
/// the order in which the values first appear.
pub fn value_counts(values: &[Option<String>]) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for value in values.iter().flatten() {
        match counts.get_mut(value.as_str()) {
            Some(count) => *count += 1,
            None => {
                counts.insert(value.clone(), 1);
            }
        }
    }

    // stable sort keeps first-appearance order among ties
    counts.sort_by(|_, a, _, b| b.cmp(a));
    counts
}

/// Cells of any column as display strings, missing cells kept as `None`.
///
/// Whole floats are written without a fractional part so `1.0` and `1`
/// group together.
pub fn display_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    if is_numeric_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect());
    }

    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Format a float the way a person would type it.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Tests
// =============================================================================
