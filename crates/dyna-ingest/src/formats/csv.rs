use crate::error::{PipelineError, Result, ResultExt};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Rows scanned to infer column types.
const INFER_SCHEMA_ROWS: usize = 1000;

/// Field values read as missing cells, in addition to empty fields.
pub const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn missing_values() -> NullValues {
    NullValues::AllColumns(MISSING_TOKENS.iter().map(|t| PlSmallStr::from(*t)).collect())
}

/// Read a CSV file with a header row. Empty fields and [`MISSING_TOKENS`]
/// become missing cells.
pub(super) fn read(path: &Path, max_rows: Option<usize>) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_n_rows(max_rows)
        .map_parse_options(|opts| opts.with_null_values(Some(missing_values())))
        .try_into_reader_with_file_path(Some(path.into()))
        .and_then(|reader| reader.finish())
        .map_err(|e| PipelineError::MalformedInput(format!("invalid CSV: {}", e)))
}

pub(super) fn write(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).context(format!("Creating {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .context("Writing CSV")
}
