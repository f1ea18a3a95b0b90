//! Reading and writing uploaded tables.
//!
//! CSV files are read as-is through polars. JSON files are normalized on read:
//! a list of records becomes one row per record, and an object of groups is
//! flattened with a synthetic [`GROUP_KEY_COLUMN`] column naming the group each
//! row came from.

mod csv;
mod json;

pub use json::{GROUP_KEY_COLUMN, column_json_values};

use crate::error::{PipelineError, Result};
use crate::types::{FileFormat, TablePreview};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Read a whole file into a table.
///
/// # Errors
///
/// * [`PipelineError::DatasetFileMissing`] if `path` does not exist.
/// * [`PipelineError::MalformedInput`] if the content cannot be parsed as `format`.
pub fn read_table(path: &Path, format: FileFormat) -> Result<DataFrame> {
    ensure_exists(path)?;

    let df = match format {
        FileFormat::Csv => csv::read(path, None)?,
        FileFormat::Json => json::read(path)?,
    };

    debug!(
        "Read {} table from {}: {} rows x {} columns",
        format,
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Read at most `max_rows` rows of a file for display.
pub fn read_preview(path: &Path, format: FileFormat, max_rows: usize) -> Result<TablePreview> {
    ensure_exists(path)?;

    let df = match format {
        FileFormat::Csv => csv::read(path, Some(max_rows))?,
        FileFormat::Json => json::read(path)?.head(Some(max_rows)),
    };

    table_preview(&df)
}

/// Write a table to `path` in the given format, replacing any existing file.
///
/// CSV output carries a header row; JSON output is an array of records with
/// missing cells written as `null`.
pub fn write_table(df: &mut DataFrame, path: &Path, format: FileFormat) -> Result<()> {
    match format {
        FileFormat::Csv => csv::write(df, path)?,
        FileFormat::Json => json::write(df, path)?,
    }

    debug!("Wrote {} table to {}", format, path.display());
    Ok(())
}

/// Column names plus JSON-valued rows for every row of `df`.
pub fn table_preview(df: &DataFrame) -> Result<TablePreview> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut values = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        values.push(column_json_values(column.as_materialized_series())?);
    }

    let rows = (0..df.height())
        .map(|row| values.iter().map(|col| col[row].clone()).collect())
        .collect();

    Ok(TablePreview { columns, rows })
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(PipelineError::DatasetFileMissing(path.to_path_buf()));
    }
    Ok(())
}
