use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// File formats
// ============================================================================

/// Declared format of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// The tag used in dataset records and as the stored file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(PipelineError::UnsupportedFormat(s.to_string())),
        }
    }
}

// ============================================================================
// Column model
// ============================================================================

/// Per-column classification made once per cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    DateLike,
}

/// Typed cells of one column, with explicit missing values.
///
/// Extracted from a polars column once per stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
}

impl ColumnValues {
    /// Extract the cells of a series.
    ///
    /// Integer and float columns become `Numeric`, booleans stay `Bool`, and
    /// every other dtype is read through its string representation.
    pub fn from_series(series: &Series) -> PolarsResult<Self> {
        let dtype = series.dtype();
        if crate::utils::is_numeric_dtype(dtype) {
            let floats = series.cast(&DataType::Float64)?;
            Ok(Self::Numeric(floats.f64()?.into_iter().collect()))
        } else if dtype == &DataType::Boolean {
            Ok(Self::Bool(series.bool()?.into_iter().collect()))
        } else {
            let strings = series.cast(&DataType::String)?;
            Ok(Self::Text(
                strings
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect(),
            ))
        }
    }

    /// Build a series named `name` from these cells.
    pub fn into_series(self, name: &str) -> Series {
        match self {
            Self::Numeric(values) => Series::new(name.into(), values),
            Self::Text(values) => Series::new(name.into(), values),
            Self::Bool(values) => Series::new(name.into(), values),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Text(values) => values.len(),
            Self::Bool(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing_count(&self) -> usize {
        match self {
            Self::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            Self::Text(values) => values.iter().filter(|v| v.is_none()).count(),
            Self::Bool(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }
}

// ============================================================================
// Dataset records
// ============================================================================

/// Fields the pipeline hands to the store when a run succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDataset {
    pub owner_id: u64,
    /// Generated name of the stored file.
    pub filename: String,
    /// Name the file was uploaded under.
    pub original_filename: String,
    pub file_path: PathBuf,
    pub file_type: FileFormat,
    pub n_rows: usize,
    pub n_columns: usize,
    pub is_public: bool,
}

/// A persisted dataset, as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: u64,
    pub owner_id: u64,
    pub filename: String,
    pub original_filename: String,
    pub file_path: PathBuf,
    pub file_type: FileFormat,
    pub n_rows: usize,
    pub n_columns: usize,
    pub is_public: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl DatasetRecord {
    /// Materialize a record from its creation request.
    pub fn from_new(id: u64, new: NewDataset, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            filename: new.filename,
            original_filename: new.original_filename,
            file_path: new.file_path,
            file_type: new.file_type,
            n_rows: new.n_rows,
            n_columns: new.n_columns,
            is_public: new.is_public,
            uploaded_at,
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Statistics for a numeric column. Every figure is `None` when the column
/// has no values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    #[serde(rename = "type")]
    pub dtype: String,
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
}

/// Range of a date-like column as ISO dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateStats {
    #[serde(rename = "type")]
    pub dtype: String,
    pub name: String,
    pub min: Option<String>,
    pub max: Option<String>,
}

/// Cardinality plus either the most frequent values or a few examples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalStats {
    #[serde(rename = "type")]
    pub dtype: String,
    pub name: String,
    pub unique_values: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_values: Option<IndexMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_values: Option<Vec<String>>,
}

/// Record left for a column whose statistics could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimalStats {
    #[serde(rename = "type")]
    pub dtype: String,
    pub name: String,
}

/// Per-column entry of [`DatasetProfile::column_info`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnStats {
    Numeric(NumericStats),
    DateTime(DateStats),
    Categorical(CategoricalStats),
    Minimal(MinimalStats),
}

impl ColumnStats {
    pub fn name(&self) -> &str {
        match self {
            Self::Numeric(s) => &s.name,
            Self::DateTime(s) => &s.name,
            Self::Categorical(s) => &s.name,
            Self::Minimal(s) => &s.name,
        }
    }

    pub fn dtype(&self) -> &str {
        match self {
            Self::Numeric(s) => &s.dtype,
            Self::DateTime(s) => &s.dtype,
            Self::Categorical(s) => &s.dtype,
            Self::Minimal(s) => &s.dtype,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Minimal(_))
    }
}

/// Grouping signal for a column whose values repeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupInfo {
    pub unique_values: usize,
    pub top_values: IndexMap<String, usize>,
}

/// Statistical summary handed to the visualization service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub original_filename: String,
    pub file_type: FileFormat,
    pub n_rows: usize,
    pub n_columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled_cells: Option<usize>,
    pub column_info: IndexMap<String, ColumnStats>,
    pub grouped_info: IndexMap<String, GroupInfo>,
}

// ============================================================================
// Preview
// ============================================================================

/// First rows of a stored dataset, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_str() {
        assert_eq!("csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!("JSON".parse::<FileFormat>().unwrap(), FileFormat::Json);
        assert_eq!(".csv".parse::<FileFormat>().unwrap(), FileFormat::Csv);

        let err = "xlsx".parse::<FileFormat>().unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(tag) if tag == "xlsx"));
    }

    #[test]
    fn test_column_values_from_numeric_series() {
        let series = Series::new("n".into(), &[Some(1i64), None, Some(3)]);
        let values = ColumnValues::from_series(&series).unwrap();
        assert_eq!(values, ColumnValues::Numeric(vec![Some(1.0), None, Some(3.0)]));
        assert_eq!(values.missing_count(), 1);
    }

    #[test]
    fn test_column_values_from_text_series() {
        let series = Series::new("s".into(), &[Some("a"), None]);
        let values = ColumnValues::from_series(&series).unwrap();
        assert_eq!(
            values,
            ColumnValues::Text(vec![Some("a".to_string()), None])
        );
    }

    #[test]
    fn test_column_values_into_series_keeps_nulls() {
        let series = ColumnValues::Bool(vec![Some(true), None]).into_series("flag");
        assert_eq!(series.name().as_str(), "flag");
        assert_eq!(series.dtype(), &DataType::Boolean);
        assert_eq!(series.null_count(), 1);
    }

    #[test]
    fn test_numeric_stats_serialize_nulls() {
        let stats = ColumnStats::Numeric(NumericStats {
            dtype: "float64".to_string(),
            name: "amount".to_string(),
            min: None,
            max: None,
            mean: None,
            median: None,
            std: None,
        });

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["type"], "float64");
        assert!(value["min"].is_null());
        assert!(value["std"].is_null());
    }

    #[test]
    fn test_categorical_stats_omit_absent_branch() {
        let stats = ColumnStats::Categorical(CategoricalStats {
            dtype: "string".to_string(),
            name: "city".to_string(),
            unique_values: 12,
            top_values: None,
            example_values: Some(vec!["Perth".to_string()]),
        });

        let value = serde_json::to_value(&stats).unwrap();
        assert!(value.get("top_values").is_none());
        assert_eq!(value["example_values"][0], "Perth");
    }
}
