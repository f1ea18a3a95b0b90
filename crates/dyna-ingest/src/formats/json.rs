use crate::error::{PipelineError, Result, ResultExt};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Column added when a grouped JSON document is flattened. Holds the
/// top-level key each row was taken from.
pub const GROUP_KEY_COLUMN: &str = "_key";

/// Column holding the elements of a top-level list of plain values.
const VALUE_COLUMN: &str = "0";

type Record = Map<String, Value>;

pub(super) fn read(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).context(format!("Opening {}", path.display()))?;
    let root: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::MalformedInput(format!("invalid JSON: {}", e)))?;

    let records = flatten(root)?;
    records_to_frame(&records)
}

pub(super) fn write(df: &DataFrame, path: &Path) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        columns.push(column_json_values(column.as_materialized_series())?);
    }

    let records: Vec<Record> = (0..df.height())
        .map(|row| {
            names
                .iter()
                .zip(&columns)
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect()
        })
        .collect();

    let file = File::create(path).context(format!("Creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &records)?;
    writer.flush().context("Flushing JSON output")?;
    Ok(())
}

/// Turn a parsed document into flat records.
///
/// * A list yields one record per element. Objects keep their keys, nested
///   lists become positional columns `0`, `1`, ... and plain values land in
///   column `0`.
/// * An object holding lists or objects yields one record per object found
///   under each top-level key, tagged with that key. Scalars beside them are
///   dropped.
/// * Any other object is a single record.
fn flatten(root: Value) -> Result<Vec<Record>> {
    match root {
        Value::Array(items) => Ok(items.into_iter().map(list_item_record).collect()),
        Value::Object(map) => {
            let grouped = map
                .values()
                .any(|v| matches!(v, Value::Array(_) | Value::Object(_)));
            if !grouped {
                return Ok(vec![map]);
            }

            let mut records = Vec::new();
            for (key, value) in map {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            // non-object list items carry no columns
                            if let Value::Object(record) = item {
                                records.push(tag_group(record, &key));
                            }
                        }
                    }
                    Value::Object(record) => records.push(tag_group(record, &key)),
                    _ => {}
                }
            }
            Ok(records)
        }
        other => Err(PipelineError::MalformedInput(format!(
            "top-level JSON value is a {}, expected a list or an object",
            kind_name(&other)
        ))),
    }
}

fn list_item_record(item: Value) -> Record {
    match item {
        Value::Object(record) => record,
        Value::Array(cells) => cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| (i.to_string(), cell))
            .collect(),
        scalar => {
            let mut record = Record::new();
            record.insert(VALUE_COLUMN.to_string(), scalar);
            record
        }
    }
}

fn tag_group(mut record: Record, key: &str) -> Record {
    record.insert(GROUP_KEY_COLUMN.to_string(), Value::String(key.to_string()));
    record
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Build a table whose columns are the union of record keys in order of first
/// appearance.
fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            let cells: Vec<Option<&Value>> = records
                .iter()
                .map(|r| r.get(*name).filter(|v| !v.is_null()))
                .collect();
            build_series(name, &cells).into()
        })
        .collect();

    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }
    Ok(DataFrame::new(columns)?)
}

/// Pick the narrowest dtype that holds every present cell: Int64, Float64,
/// Boolean, else String.
fn build_series(name: &str, cells: &[Option<&Value>]) -> Series {
    let present = || cells.iter().flatten();

    if present().all(|v| v.is_i64()) {
        let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(Value::as_i64)).collect();
        if values.iter().any(Option::is_some) {
            return Series::new(name.into(), values);
        }
    }

    if present().all(|v| v.is_number()) && present().next().is_some() {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(Value::as_f64)).collect();
        return Series::new(name.into(), values);
    }

    if present().all(|v| v.is_boolean()) && present().next().is_some() {
        let values: Vec<Option<bool>> = cells.iter().map(|c| c.and_then(Value::as_bool)).collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| {
            c.map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .collect();
    Series::new(name.into(), values)
}

/// Cells of a column as JSON values, missing cells as `null`.
pub fn column_json_values(series: &Series) -> PolarsResult<Vec<Value>> {
    let dtype = series.dtype();

    if dtype.is_integer() {
        let ints = series.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect());
    }

    if is_numeric_dtype(dtype) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| {
                v.and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            })
            .collect());
    }

    if dtype == &DataType::Boolean {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect());
    }

    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
        .collect())
}
