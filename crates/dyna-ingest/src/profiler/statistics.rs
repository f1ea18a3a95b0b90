//! Statistical analysis functions for column profiling.

use crate::cleaner::dates::{DATE_SUFFIX, ISO_DATE_FORMAT, parse_any};
use crate::error::ColumnStatsError;
use crate::types::{
    CategoricalStats, ColumnKind, ColumnStats, DateStats, GroupInfo, MinimalStats, NumericStats,
};
use crate::utils::{
    DtypeCategory, display_values, dtype_name, get_dtype_category, mean, quantile_sorted,
    sample_std, sorted_values, value_counts,
};
use chrono::NaiveDate;
use indexmap::IndexMap;
use polars::prelude::*;
use std::collections::HashSet;

/// Reporting limits for categorical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileLimits {
    /// Columns with fewer distinct values get `top_values`.
    pub cardinality_limit: usize,
    pub top_values_count: usize,
    pub example_values_count: usize,
}

impl Default for ProfileLimits {
    fn default() -> Self {
        Self {
            cardinality_limit: 10,
            top_values_count: 5,
            example_values_count: 3,
        }
    }
}

/// Decide which statistics branch a column takes.
pub(crate) fn profile_kind(series: &Series) -> Result<ColumnKind, ColumnStatsError> {
    let category = get_dtype_category(series.dtype());
    if series.name().ends_with(DATE_SUFFIX) || category == DtypeCategory::Datetime {
        return Ok(ColumnKind::DateLike);
    }

    match category {
        DtypeCategory::Numeric => Ok(ColumnKind::Numeric),
        DtypeCategory::String | DtypeCategory::Boolean => Ok(ColumnKind::Categorical),
        _ => Err(ColumnStatsError::UnsupportedType {
            column: series.name().to_string(),
            dtype: format!("{:?}", series.dtype()),
        }),
    }
}

/// Compute the statistics record of one column.
pub(crate) fn column_stats(
    series: &Series,
    limits: &ProfileLimits,
) -> Result<ColumnStats, ColumnStatsError> {
    match profile_kind(series)? {
        ColumnKind::Numeric => numeric_stats(series).map(ColumnStats::Numeric),
        ColumnKind::DateLike => date_stats(series).map(ColumnStats::DateTime),
        ColumnKind::Categorical => categorical_stats(series, limits).map(ColumnStats::Categorical),
    }
}

/// The `{type, name}` record left when statistics fail.
pub(crate) fn minimal_stats(series: &Series) -> ColumnStats {
    ColumnStats::Minimal(MinimalStats {
        dtype: dtype_name(series.dtype()),
        name: series.name().to_string(),
    })
}

fn extraction(series: &Series) -> impl FnOnce(PolarsError) -> ColumnStatsError + '_ {
    move |source| ColumnStatsError::Extraction {
        column: series.name().to_string(),
        source,
    }
}

fn numeric_stats(series: &Series) -> Result<NumericStats, ColumnStatsError> {
    let floats = series
        .cast(&DataType::Float64)
        .map_err(extraction(series))?;
    let values: Vec<Option<f64>> = floats.f64().map_err(extraction(series))?.into_iter().collect();
    let sorted = sorted_values(&values);

    Ok(NumericStats {
        dtype: dtype_name(series.dtype()),
        name: series.name().to_string(),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        mean: mean(&sorted),
        median: quantile_sorted(&sorted, 0.5),
        std: sample_std(&sorted),
    })
}

fn date_stats(series: &Series) -> Result<DateStats, ColumnStatsError> {
    let cells = display_values(series).map_err(extraction(series))?;
    let dates: Vec<NaiveDate> = cells.iter().flatten().filter_map(|s| parse_any(s)).collect();

    let iso = |d: &NaiveDate| d.format(ISO_DATE_FORMAT).to_string();
    Ok(DateStats {
        dtype: "datetime".to_string(),
        name: series.name().to_string(),
        min: dates.iter().min().map(iso),
        max: dates.iter().max().map(iso),
    })
}

fn categorical_stats(
    series: &Series,
    limits: &ProfileLimits,
) -> Result<CategoricalStats, ColumnStatsError> {
    let cells = display_values(series).map_err(extraction(series))?;
    let counts = value_counts(&cells);
    let unique_values = counts.len();

    let (top_values, example_values) = if unique_values > 0 && unique_values < limits.cardinality_limit {
        (Some(top_values(counts, limits.top_values_count)), None)
    } else {
        (None, Some(first_distinct(&cells, limits.example_values_count)))
    };

    Ok(CategoricalStats {
        dtype: dtype_name(series.dtype()),
        name: series.name().to_string(),
        unique_values,
        top_values,
        example_values,
    })
}

/// Grouping signal for a column, or `None` when every row holds a distinct
/// value.
pub(crate) fn group_info(
    series: &Series,
    top_n: usize,
) -> Result<Option<GroupInfo>, ColumnStatsError> {
    let cells = display_values(series).map_err(extraction(series))?;
    let counts = value_counts(&cells);
    if counts.len() >= series.len() {
        return Ok(None);
    }

    Ok(Some(GroupInfo {
        unique_values: counts.len(),
        top_values: top_values(counts, top_n),
    }))
}

fn top_values(counts: IndexMap<String, usize>, n: usize) -> IndexMap<String, usize> {
    counts.into_iter().take(n).collect()
}

fn first_distinct(cells: &[Option<String>], n: usize) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut examples = Vec::new();
    for value in cells.iter().flatten() {
        if examples.len() == n {
            break;
        }
        if seen.insert(value.as_str()) {
            examples.push(value.clone());
        }
    }
    examples
}
