//! Cell-level sanitization applied before any parsing.

use crate::utils::{is_null_marker, parse_numeric_string};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Trim every string cell and turn missing-value markers into nulls.
///
/// Returns the cleaned frame and the number of cells that became null.
pub(crate) fn normalize_null_markers(df: DataFrame) -> Result<(DataFrame, usize)> {
    let mut df = df;
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    debug!("Converting missing-value markers to null...");

    let mut total_replacements = 0;

    for col_name in &column_names {
        let series = df.column(col_name)?.as_materialized_series().clone();
        if series.dtype() != &DataType::String {
            continue;
        }

        let (cleaned, count) = replace_markers_with_null(&series)?;
        total_replacements += count;
        df.replace(col_name, cleaned)?;
    }

    if total_replacements > 0 {
        debug!("Converted {} marker values to null", total_replacements);
    }

    Ok((df, total_replacements))
}

fn replace_markers_with_null(series: &Series) -> Result<(Series, usize)> {
    let mut count = 0;
    let values: Vec<Option<String>> = series
        .str()?
        .into_iter()
        .map(|opt| match opt {
            Some(val) if is_null_marker(val) => {
                count += 1;
                None
            }
            Some(val) => Some(val.trim().to_string()),
            None => None,
        })
        .collect();

    Ok((Series::new(series.name().clone(), values), count))
}

/// Render a customer identifier without the float suffix some exports add.
///
/// `"13085.0"` becomes `"13085"`; anything that is not a whole number is
/// returned unchanged.
pub(crate) fn normalize_customer_id(raw: &str) -> String {
    match parse_numeric_string(raw) {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        _ => raw.to_string(),
    }
}
