//! Numeric vs categorical classification of raw columns.

use crate::types::ColumnKind;
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use tracing::debug;

/// Classify one column from its runtime dtype.
///
/// Integer and float columns are [`ColumnKind::Numeric`] as long as they hold
/// at least one value; everything else, including columns with no values at
/// all, is [`ColumnKind::Categorical`]. Date detection happens later.
pub fn classify_column(series: &Series) -> ColumnKind {
    let has_values = series.null_count() < series.len();
    if is_numeric_dtype(series.dtype()) && has_values {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Classify every column of a table, in column order.
pub fn classify_columns(df: &DataFrame) -> Vec<(String, ColumnKind)> {
    df.get_columns()
        .iter()
        .map(|column| {
            let series = column.as_materialized_series();
            let kind = classify_column(series);
            debug!("Column '{}' ({:?}) classified as {:?}", series.name(), series.dtype(), kind);
            (series.name().to_string(), kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_columns() {
        let ints = Series::new("i".into(), &[Some(1i64), None]);
        let floats = Series::new("f".into(), &[0.5f64, 1.5]);
        assert_eq!(classify_column(&ints), ColumnKind::Numeric);
        assert_eq!(classify_column(&floats), ColumnKind::Numeric);
    }

    #[test]
    fn test_text_and_bool_are_categorical() {
        let text = Series::new("s".into(), &["a", "b"]);
        let flags = Series::new("b".into(), &[true, false]);
        assert_eq!(classify_column(&text), ColumnKind::Categorical);
        assert_eq!(classify_column(&flags), ColumnKind::Categorical);
    }

    #[test]
    fn test_empty_numeric_is_categorical() {
        let empty = Series::new("n".into(), &[None::<f64>, None]);
        assert_eq!(classify_column(&empty), ColumnKind::Categorical);
    }

    #[test]
    fn test_classify_columns_keeps_order() {
        let df = df! {
            "name" => &["a", "b"],
            "score" => &[1.0f64, 2.0],
        }
        .unwrap();

        let kinds = classify_columns(&df);
        assert_eq!(
            kinds,
            vec![
                ("name".to_string(), ColumnKind::Categorical),
                ("score".to_string(), ColumnKind::Numeric),
            ]
        );
    }
}
