//! Date detection and normalization for text columns.
//!
//! A text column is probed with its first non-blank value against an ordered
//! list of formats. The winning format (or a best-guess parser when none
//! matches) is applied to every cell, and a `<column>_date` sibling holding
//! ISO dates is kept when enough rows parsed.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

/// Suffix of the derived ISO date column.
pub const DATE_SUFFIX: &str = "_date";

/// Output format of derived date cells.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// One accepted input date format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    /// Human-readable shape, e.g. `MM/DD/YYYY`.
    pub label: &'static str,
    /// chrono format string.
    pub pattern: &'static str,
}

impl DateFormat {
    const fn new(label: &'static str, pattern: &'static str) -> Self {
        Self { label, pattern }
    }

    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value, self.pattern).ok()
    }
}

/// Formats tried against the sample value, in priority order. Ambiguous
/// day/month inputs resolve month-first.
pub static DATE_FORMATS: &[DateFormat] = &[
    DateFormat::new("YYYY-MM-DD", "%Y-%m-%d"),
    DateFormat::new("MM/DD/YYYY", "%m/%d/%Y"),
    DateFormat::new("DD/MM/YYYY", "%d/%m/%Y"),
    DateFormat::new("YYYY/MM/DD", "%Y/%m/%d"),
    DateFormat::new("Mon DD, YYYY", "%b %d, %Y"),
    DateFormat::new("DD Mon YYYY", "%d %b %Y"),
    DateFormat::new("Month DD, YYYY", "%B %d, %Y"),
    DateFormat::new("DD Month YYYY", "%d %B %Y"),
    DateFormat::new("MM-DD-YYYY", "%m-%d-%Y"),
    DateFormat::new("DD-MM-YYYY", "%d-%m-%Y"),
    DateFormat::new("YYYY.MM.DD", "%Y.%m.%d"),
    DateFormat::new("DD.MM.YYYY", "%d.%m.%Y"),
];

const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// First format under which `sample` parses.
pub fn detect_format(sample: &str) -> Option<&'static DateFormat> {
    DATE_FORMATS.iter().find(|format| format.parse(sample).is_some())
}

/// Best-effort parse of a single value when no format was detected.
///
/// Tries every listed date format, then common date-time shapes (RFC 3339,
/// RFC 2822, ISO-like timestamps) and finally compact `YYYYMMDD`.
pub fn parse_any(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS.iter().find_map(|format| format.parse(value)) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = DATETIME_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
    {
        return Some(dt.date());
    }
    parse_compact(value)
}

fn parse_compact(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Outcome of parsing one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDates {
    /// Format chosen from the sample; `None` when the best-guess parser ran.
    pub format: Option<&'static DateFormat>,
    pub dates: Vec<Option<NaiveDate>>,
}

impl ParsedDates {
    /// Share of all rows (missing ones included) that parsed.
    pub fn success_rate(&self) -> f64 {
        if self.dates.is_empty() {
            return 0.0;
        }
        self.dates.iter().filter(|d| d.is_some()).count() as f64 / self.dates.len() as f64
    }

    pub fn to_iso_strings(&self) -> Vec<Option<String>> {
        self.dates
            .iter()
            .map(|d| d.map(|d| d.format(ISO_DATE_FORMAT).to_string()))
            .collect()
    }
}

/// Parse every cell of a text column.
///
/// The format is detected on the first non-missing cell, taken as-is. Cells
/// must then match that format exactly.
pub fn parse_column(cells: &[Option<&str>]) -> ParsedDates {
    let format = cells.iter().flatten().next().and_then(|s| detect_format(s));

    let dates = cells
        .iter()
        .map(|cell| {
            let cell = (*cell)?;
            match format {
                Some(format) => format.parse(cell),
                None => parse_any(cell),
            }
        })
        .collect();

    ParsedDates { format, dates }
}

/// Add `<column>_date` siblings for text columns that read as dates.
///
/// Only columns that are text when the stage starts are examined. Returns the
/// names of the columns that received a sibling together with one processing
/// step per column examined.
pub fn normalize_dates(df: &mut DataFrame, threshold: f64) -> Result<(Vec<String>, Vec<String>)> {
    let candidates: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect();

    let mut converted = Vec::new();
    let mut steps = Vec::new();

    for name in candidates {
        let parsed = {
            let column = df
                .column(&name)
                .map_err(|_| PipelineError::ColumnNotFound(name.clone()))?;
            let cells: Vec<Option<&str>> = column.str()?.into_iter().collect();
            parse_column(&cells)
        };

        let rate = parsed.success_rate();
        let label = parsed.format.map_or("best guess", |f| f.label);
        debug!(
            "Column '{}': {:.1}% parsed as dates ({})",
            name,
            rate * 100.0,
            label
        );

        if rate > threshold {
            let derived = format!("{}{}", name, DATE_SUFFIX);
            df.with_column(Series::new(derived.as_str().into(), parsed.to_iso_strings()))?;
            steps.push(format!(
                "Normalized '{}' to ISO dates in '{}' ({:.0}% parsed, {})",
                name,
                derived,
                rate * 100.0,
                label
            ));
            converted.push(name);
        }
    }

    Ok((converted, steps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    // ==================== format detection tests ====================

    #[test]
    fn test_detect_iso() {
        assert_eq!(detect_format("2023-01-15").unwrap().label, "YYYY-MM-DD");
    }

    #[test]
    fn test_detect_prefers_month_first() {
        assert_eq!(detect_format("03/04/2023").unwrap().label, "MM/DD/YYYY");
        assert_eq!(detect_format("25/04/2023").unwrap().label, "DD/MM/YYYY");
    }

    #[test]
    fn test_detect_month_names() {
        assert_eq!(detect_format("Jan 05, 2023").unwrap().label, "Mon DD, YYYY");
        assert_eq!(detect_format("5 Jan 2023").unwrap().label, "DD Mon YYYY");
        assert_eq!(detect_format("14.02.2023").unwrap().label, "DD.MM.YYYY");
    }

    #[test]
    fn test_detect_none_for_text() {
        assert!(detect_format("hello").is_none());
    }

    // ==================== best guess tests ====================

    #[test]
    fn test_parse_any_timestamps() {
        assert_eq!(parse_any("2023-05-06T10:30:00Z"), ymd(2023, 5, 6));
        assert_eq!(parse_any("2023-05-06 10:30:00"), ymd(2023, 5, 6));
        assert_eq!(parse_any("20230506"), ymd(2023, 5, 6));
        assert_eq!(parse_any("not a date"), None);
        assert_eq!(parse_any("   "), None);
    }

    // ==================== column tests ====================

    #[test]
    fn test_parse_column_uses_sample_format() {
        let cells = [Some("01/02/2023"), None, Some("13/02/2023"), Some("03/02/2023")];
        let parsed = parse_column(&cells);

        assert_eq!(parsed.format.unwrap().label, "MM/DD/YYYY");
        // 13/02/2023 does not fit month-first and becomes missing
        assert_eq!(parsed.dates, vec![ymd(2023, 1, 2), None, None, ymd(2023, 3, 2)]);
        assert_eq!(parsed.success_rate(), 0.5);
    }

    #[test]
    fn test_parse_column_does_not_strip_cells() {
        let cells = [Some("2023-01-02"), Some(" 2023-01-03 "), Some("2023-01-04")];
        let parsed = parse_column(&cells);

        assert_eq!(parsed.format.unwrap().label, "YYYY-MM-DD");
        assert_eq!(parsed.dates, vec![ymd(2023, 1, 2), None, ymd(2023, 1, 4)]);
    }

    #[test]
    fn test_parse_column_samples_first_present_cell_even_if_blank() {
        let cells = [None, Some(""), Some("2023-05-06")];
        let parsed = parse_column(&cells);

        assert!(parsed.format.is_none());
        assert_eq!(parsed.dates, vec![None, None, ymd(2023, 5, 6)]);
    }

    #[test]
    fn test_parse_column_falls_back_to_best_guess() {
        let cells = [Some("2023-05-06T10:30:00Z"), Some("2023-05-07 08:00:00")];
        let parsed = parse_column(&cells);

        assert!(parsed.format.is_none());
        assert_eq!(parsed.dates, vec![ymd(2023, 5, 6), ymd(2023, 5, 7)]);
    }

    #[test]
    fn test_normalize_dates_keeps_majority_column() {
        let mut df = df! {
            "when" => &[Some("2023-01-01"), Some("2023-02-01"), Some("bogus")],
            "label" => &["a", "b", "c"],
        }
        .unwrap();

        let (converted, steps) = normalize_dates(&mut df, 0.5).unwrap();

        assert_eq!(converted, vec!["when".to_string()]);
        assert_eq!(steps.len(), 1);
        assert!(df.column("label_date").is_err());
        let derived: Vec<Option<&str>> = df.column("when_date").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(derived, vec![Some("2023-01-01"), Some("2023-02-01"), None]);
    }

    #[test]
    fn test_normalize_dates_drops_minority_column() {
        let mut df = df! {
            "notes" => &[Some("2023-01-01"), Some("later"), Some("soon"), None],
        }
        .unwrap();

        let (converted, _) = normalize_dates(&mut df, 0.5).unwrap();

        assert!(converted.is_empty());
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_exactly_half_is_not_enough() {
        let mut df = df! {
            "d" => &[Some("2023-01-01"), Some("x")],
        }
        .unwrap();

        let (converted, _) = normalize_dates(&mut df, 0.5).unwrap();
        assert!(converted.is_empty());
    }
}
