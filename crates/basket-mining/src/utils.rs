//! Shared utilities for the cleaning and mining stages.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use crate::error::{MiningError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Values treated as missing when reading raw CSV cells.
pub const NULL_MARKERS: [&str; 10] = [
    "", "nan", "na", "n/a", "null", "none", "#n/a", "#na", "-nan", "<na>",
];

/// Timestamp layouts seen in retail exports, paired with their chrono format.
///
/// Date-only layouts carry an empty format and are parsed as midnight.
static DATE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{2}:\d{2}$")
                .expect("Invalid regex: YYYY-MM-DD HH:MM:SS"),
            "%Y-%m-%d %H:%M:%S",
        ),
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2} \d{1,2}:\d{2}$")
                .expect("Invalid regex: YYYY-MM-DD HH:MM"),
            "%Y-%m-%d %H:%M",
        ),
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}T\d{1,2}:\d{2}:\d{2}$").expect("Invalid regex: ISO"),
            "%Y-%m-%dT%H:%M:%S",
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}:\d{2}$")
                .expect("Invalid regex: MM/DD/YYYY HH:MM:SS"),
            "%m/%d/%Y %H:%M:%S",
        ),
        (
            Regex::new(r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}$")
                .expect("Invalid regex: MM/DD/YYYY HH:MM"),
            "%m/%d/%Y %H:%M",
        ),
        (
            Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").expect("Invalid regex: YYYY-MM-DD"),
            "",
        ),
    ]
});

/// Format used whenever a timestamp is written back out.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Clean a string for numeric parsing by removing formatting characters.
///
/// # Example
///
/// ```rust,ignore
/// use basket_mining::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string("£1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a raw cell should be read as missing.
pub fn is_null_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    NULL_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles common formatting like currency symbols and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an invoice timestamp in any of the supported layouts.
pub fn parse_invoice_date(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    DATE_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(trimmed))
        .and_then(|(_, format)| {
            if format.is_empty() {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            } else {
                NaiveDateTime::parse_from_str(trimmed, format).ok()
            }
        })
}

/// Render a timestamp in the layout used by the cleaned dataset.
pub fn format_invoice_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format(OUTPUT_DATE_FORMAT).to_string()
}

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Check whether the DataFrame has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Fail with [`MiningError::ColumnNotFound`] on the first missing column.
pub fn require_columns(df: &DataFrame, names: &[&str]) -> Result<()> {
    match names.iter().find(|name| !has_column(df, name)) {
        Some(missing) => Err(MiningError::ColumnNotFound(missing.to_string())),
        None => Ok(()),
    }
}

/// Read a column as owned optional strings, whatever its dtype.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| MiningError::ColumnNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Read a column as optional floats, parsing string cells leniently.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(string_values(df, name)?
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_numeric_string))
        .collect())
}

/// Read a column as optional timestamps.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    Ok(string_values(df, name)?
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_invoice_date))
        .collect())
}

/// Keep only the rows whose mask entry is `true`.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    df.filter(&mask)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let values: Vec<String> = series
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value).to_string())
        .collect();

    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Median of a set of values; the mean of the two middle values for even
/// counts. Returns `None` for an empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Quantile of already sorted values using linear interpolation between
/// the closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

// =============================================================================
// Tests
// =============================================================================
