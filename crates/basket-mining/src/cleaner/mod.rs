//! Row cleaning for raw retail transactions.
//!
//! This module provides functionality for:
//! - Normalizing missing-value markers to nulls
//! - Dropping returns and negative price adjustments
//! - Filling placeholder defaults
//! - Dropping rows without an invoice or product key

mod sanitizers;

use crate::config::PreprocessConfig;
use crate::error::MiningError;
use crate::types::{
    COUNTRY, CUSTOMER_ID, DESCRIPTION, DroppedRows, INVOICE, INVOICE_DATE, PRICE, QUANTITY,
    STOCK_CODE,
};
use crate::utils::{
    date_values, filter_rows, fill_string_nulls, format_invoice_date, numeric_values,
    string_values,
};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Cleaner for raw retail rows.
///
/// After [`DataCleaner::clean`], every row has an invoice and a stock code,
/// a non-negative integer quantity, a parseable invoice date and a
/// non-negative (possibly missing) price.
pub struct DataCleaner {
    description_placeholder: String,
    country_placeholder: String,
}

impl DataCleaner {
    pub fn new(config: &PreprocessConfig) -> Self {
        Self {
            description_placeholder: config.description_placeholder.clone(),
            country_placeholder: config.country_placeholder.clone(),
        }
    }

    /// Run every cleaning step in order, recording dropped rows per reason.
    ///
    /// Returns the cleaned frame and a description of each action taken.
    pub fn clean(&self, df: DataFrame, dropped: &mut DroppedRows) -> Result<(DataFrame, Vec<String>)> {
        let mut actions = Vec::new();

        info!("Performing data cleaning...");

        // 1. Missing-value markers
        let (df, replaced) = sanitizers::normalize_null_markers(df)?;
        if replaced > 0 {
            actions.push(format!("Converted {} missing-value markers to null", replaced));
        }

        // 2. Returns
        let (df, removed) = drop_negative(df, QUANTITY)?;
        dropped.negative_quantity = removed;
        actions.push(describe_drop(removed, "with negative quantity (returns)"));

        // 3. Adjustments
        let (df, removed) = drop_negative(df, PRICE)?;
        dropped.negative_price = removed;
        actions.push(describe_drop(removed, "with negative price"));

        // 4. Defaults
        let df = self.fill_defaults(df, &mut actions)?;

        // 5. Keys
        let (df, removed) = drop_missing_keys(df)?;
        dropped.missing_keys = removed;
        actions.push(describe_drop(removed, "missing Invoice or StockCode"));

        debug!("Cleaning finished with {} rows", df.height());
        Ok((df, actions))
    }

    /// Fill placeholders and convert Quantity, Price and InvoiceDate to
    /// their cleaned representations.
    fn fill_defaults(&self, df: DataFrame, actions: &mut Vec<String>) -> Result<DataFrame> {
        let mut df = df;

        for (column, placeholder) in [
            (DESCRIPTION, self.description_placeholder.as_str()),
            (COUNTRY, self.country_placeholder.as_str()),
        ] {
            let series = df.column(column)?.as_materialized_series().clone();
            let nulls = series.null_count();
            if nulls > 0 {
                df.replace(column, fill_string_nulls(&series, placeholder)?)?;
                actions.push(format!("Filled {} missing {} with '{}'", nulls, column, placeholder));
            }
        }

        let customers: Vec<String> = string_values(&df, CUSTOMER_ID)?
            .into_iter()
            .map(|id| {
                id.as_deref()
                    .map(sanitizers::normalize_customer_id)
                    .unwrap_or_else(|| "0".to_string())
            })
            .collect();
        df.replace(CUSTOMER_ID, Series::new(CUSTOMER_ID.into(), customers))?;

        let quantities: Vec<i64> = numeric_values(&df, QUANTITY)?
            .into_iter()
            .map(|q| q.map_or(0, |v| v.round() as i64))
            .collect();
        df.replace(QUANTITY, Series::new(QUANTITY.into(), quantities))?;

        let prices = numeric_values(&df, PRICE)?;
        df.replace(PRICE, Series::new(PRICE.into(), prices))?;

        let dates = date_values(&df, INVOICE_DATE)?;
        let missing_dates = dates.iter().filter(|d| d.is_none()).count();
        if df.height() > 0 {
            let Some(earliest) = dates.iter().flatten().min().copied() else {
                return Err(MiningError::NoValidValues(INVOICE_DATE.to_string()).into());
            };
            let filled: Vec<String> = dates
                .iter()
                .map(|d| format_invoice_date(&d.unwrap_or(earliest)))
                .collect();
            df.replace(INVOICE_DATE, Series::new(INVOICE_DATE.into(), filled))?;
            if missing_dates > 0 {
                actions.push(format!(
                    "Filled {} missing InvoiceDate values with {}",
                    missing_dates,
                    format_invoice_date(&earliest)
                ));
            }
        }

        Ok(df)
    }
}

/// Drop rows whose numeric value is below zero. Unparseable cells are kept.
fn drop_negative(df: DataFrame, column: &str) -> Result<(DataFrame, usize)> {
    let keep: Vec<bool> = numeric_values(&df, column)?
        .into_iter()
        .map(|v| v.is_none_or(|v| v >= 0.0))
        .collect();
    let before = df.height();
    let df = filter_rows(&df, &keep)?;
    let removed = before - df.height();
    Ok((df, removed))
}

fn drop_missing_keys(df: DataFrame) -> Result<(DataFrame, usize)> {
    let invoices = string_values(&df, INVOICE)?;
    let codes = string_values(&df, STOCK_CODE)?;
    let keep: Vec<bool> = invoices
        .iter()
        .zip(&codes)
        .map(|(invoice, code)| invoice.is_some() && code.is_some())
        .collect();
    let before = df.height();
    let df = filter_rows(&df, &keep)?;
    let removed = before - df.height();
    Ok((df, removed))
}

fn describe_drop(removed: usize, reason: &str) -> String {
    if removed > 0 {
        format!("Removed {} rows {}", removed, reason)
    } else {
        format!("No rows {}", reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_frame() -> DataFrame {
        df![
            "Invoice" => [Some("489434"), Some("489434"), Some("C489449"), None, Some("489436"), Some("489437")],
            "StockCode" => [Some("85048"), Some("79323P"), Some("22087"), Some("21232"), Some("NaN"), Some("22041")],
            "Description" => [Some("LANTERN"), None, Some("PAPER BUNTING"), Some("MUG"), Some("CARD"), Some("BAG")],
            "Quantity" => [Some("12"), Some(""), Some("-12"), Some("6"), Some("1"), Some("3")],
            "InvoiceDate" => [Some("2009-12-01 07:45:00"), Some("bad"), Some("2009-12-01 10:33:00"), Some("2009-12-02 09:00:00"), Some("2009-12-02 10:00:00"), Some("2009-12-03 11:00:00")],
            "Price" => [Some("6.95"), Some("6.75"), Some("2.95"), Some("1.25"), Some("0.42"), Some("-11062.06")],
            "Customer ID" => [Some("13085.0"), None, Some("16321.0"), Some("12682.0"), Some("12682.0"), None],
            "Country" => [Some("United Kingdom"), Some("United Kingdom"), None, Some("France"), None, Some("United Kingdom")],
        ]
        .unwrap()
    }

    #[test]
    fn test_clean_drops_and_counts_each_reason() {
        let cleaner = DataCleaner::new(&PreprocessConfig::default());
        let mut dropped = DroppedRows::default();

        let (df, actions) = cleaner.clean(raw_frame(), &mut dropped).unwrap();

        assert_eq!(dropped.negative_quantity, 1);
        assert_eq!(dropped.negative_price, 1);
        assert_eq!(dropped.missing_keys, 2);
        assert_eq!(df.height(), 2);
        assert!(actions.iter().any(|a| a.contains("negative quantity")));
    }

    #[test]
    fn test_clean_fills_defaults() {
        let cleaner = DataCleaner::new(&PreprocessConfig::default());
        let mut dropped = DroppedRows::default();

        let (df, _) = cleaner.clean(raw_frame(), &mut dropped).unwrap();

        let quantity = df.column(QUANTITY).unwrap().i64().unwrap();
        assert_eq!(quantity.get(1), Some(0));

        let description = string_values(&df, DESCRIPTION).unwrap();
        assert_eq!(
            description,
            vec![
                Some("LANTERN".to_string()),
                Some("No description available".to_string())
            ]
        );

        let customers = string_values(&df, CUSTOMER_ID).unwrap();
        assert_eq!(customers, vec![Some("13085".to_string()), Some("0".to_string())]);

        // Unparseable date becomes the earliest valid date
        let dates = string_values(&df, INVOICE_DATE).unwrap();
        assert_eq!(dates[1].as_deref(), Some("2009-12-01 07:45:00"));
    }

    #[test]
    fn test_clean_without_any_valid_date_fails() {
        let df = df![
            "Invoice" => ["1"],
            "StockCode" => ["A"],
            "Description" => ["x"],
            "Quantity" => ["1"],
            "InvoiceDate" => ["not a date"],
            "Price" => ["1.0"],
            "Customer ID" => ["1"],
            "Country" => ["UK"],
        ]
        .unwrap();
        let cleaner = DataCleaner::new(&PreprocessConfig::default());

        let err = cleaner.clean(df, &mut DroppedRows::default()).unwrap_err();
        let mining = err.downcast_ref::<MiningError>().unwrap();
        assert!(matches!(mining, MiningError::NoValidValues(c) if c == "InvoiceDate"));
    }

    #[test]
    fn test_cleaned_rows_hold_invariants() {
        let cleaner = DataCleaner::new(&PreprocessConfig::default());
        let (df, _) = cleaner
            .clean(raw_frame(), &mut DroppedRows::default())
            .unwrap();

        assert_eq!(df.column(INVOICE).unwrap().null_count(), 0);
        assert_eq!(df.column(STOCK_CODE).unwrap().null_count(), 0);
        let quantity = df.column(QUANTITY).unwrap().i64().unwrap();
        assert!(quantity.into_iter().flatten().all(|q| q >= 0));
        let price = df.column(PRICE).unwrap().f64().unwrap();
        assert!(price.into_iter().flatten().all(|p| p >= 0.0));
    }
}
