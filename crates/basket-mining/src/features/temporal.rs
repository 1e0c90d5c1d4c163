//! Time-of-day and day-of-week derivation.

use crate::error::MiningError;
use crate::types::{DAY_OF_WEEK, DayOfWeek, INVOICE_DATE, TIME_CATEGORY, TimeCategory};
use crate::utils::{date_values, format_invoice_date};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Add `TimeCategory` and `DayOfWeek` columns and rewrite `InvoiceDate` in
/// the output layout.
///
/// Cleaning guarantees every date parses; a row that does not is reported
/// as an invalid value rather than guessed.
pub fn derive_temporal_columns(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let dates = date_values(&df, INVOICE_DATE)?;

    let mut formatted = Vec::with_capacity(dates.len());
    let mut times = Vec::with_capacity(dates.len());
    let mut days = Vec::with_capacity(dates.len());

    for (idx, date) in dates.iter().enumerate() {
        let Some(timestamp) = date else {
            return Err(MiningError::InvalidValue {
                column: INVOICE_DATE.to_string(),
                value: format!("<unparseable at row {}>", idx),
            }
            .into());
        };
        formatted.push(format_invoice_date(timestamp));
        times.push(TimeCategory::from_datetime(timestamp).as_str());
        days.push(DayOfWeek::from_datetime(timestamp).as_str());
    }

    df.replace(INVOICE_DATE, Series::new(INVOICE_DATE.into(), formatted))?;
    df.with_column(Series::new(TIME_CATEGORY.into(), times))?;
    df.with_column(Series::new(DAY_OF_WEEK.into(), days))?;

    debug!("Derived {} and {} for {} rows", TIME_CATEGORY, DAY_OF_WEEK, df.height());
    Ok(df)
}
