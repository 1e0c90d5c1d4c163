//! Per-product median imputation for missing unit prices.

use crate::config::PriceFallback;
use crate::types::{PRICE, STOCK_CODE};
use crate::utils::{filter_rows, median, numeric_values, string_values};
use anyhow::Result;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Counts of what happened to missing prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImputationStats {
    /// Filled from the same product's median.
    pub imputed: usize,
    /// Filled from the global median.
    pub defaulted: usize,
    /// Left empty under the `Unbinned` policy.
    pub unresolved: usize,
    /// Rows removed because no price could be found.
    pub dropped: usize,
}

/// Lookup table of median prices per stock code.
///
/// The table is computed once from the rows that carry a price, so filling
/// is a single pass over the frame.
#[derive(Debug, Clone, Default)]
pub struct PriceImputer {
    medians: HashMap<String, f64>,
    global_median: Option<f64>,
}

impl PriceImputer {
    /// Build the lookup table from a cleaned frame.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        let codes = string_values(df, STOCK_CODE)?;
        let prices = numeric_values(df, PRICE)?;

        let mut by_code: HashMap<String, Vec<f64>> = HashMap::new();
        let mut all_prices = Vec::new();
        for (code, price) in codes.iter().zip(&prices) {
            if let (Some(code), Some(price)) = (code, price) {
                by_code.entry(code.clone()).or_default().push(*price);
                all_prices.push(*price);
            }
        }

        let medians: HashMap<String, f64> = by_code
            .into_iter()
            .filter_map(|(code, values)| median(&values).map(|m| (code, m)))
            .collect();

        debug!("Price lookup table covers {} products", medians.len());

        Ok(Self {
            medians,
            global_median: median(&all_prices),
        })
    }

    /// Median price recorded for a product, if any row of it has a price.
    pub fn lookup(&self, stock_code: &str) -> Option<f64> {
        self.medians.get(stock_code).copied()
    }

    pub fn global_median(&self) -> Option<f64> {
        self.global_median
    }

    /// Fill missing prices, resolving the rest with `fallback`.
    pub fn apply(
        &self,
        df: DataFrame,
        fallback: PriceFallback,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, ImputationStats)> {
        let mut df = df;
        let codes = string_values(&df, STOCK_CODE)?;
        let prices = numeric_values(&df, PRICE)?;
        let mut stats = ImputationStats::default();

        let global = match fallback {
            PriceFallback::GlobalMedian => {
                if self.global_median.is_none() && prices.iter().any(Option::is_none) {
                    warn!("No known prices to compute a global median; unresolved rows will be dropped");
                }
                self.global_median
            }
            _ => None,
        };

        let mut filled = Vec::with_capacity(prices.len());
        let mut keep = Vec::with_capacity(prices.len());
        for (code, price) in codes.iter().zip(prices) {
            if price.is_some() {
                filled.push(price);
                keep.push(true);
                continue;
            }

            if let Some(value) = code.as_deref().and_then(|c| self.lookup(c)) {
                stats.imputed += 1;
                filled.push(Some(value));
                keep.push(true);
            } else if let Some(value) = global {
                stats.defaulted += 1;
                filled.push(Some(value));
                keep.push(true);
            } else if fallback == PriceFallback::Unbinned {
                stats.unresolved += 1;
                filled.push(None);
                keep.push(true);
            } else {
                stats.dropped += 1;
                filled.push(None);
                keep.push(false);
            }
        }

        df.replace(PRICE, Series::new(PRICE.into(), filled))?;
        if stats.dropped > 0 {
            df = filter_rows(&df, &keep)?;
            info!("Dropped {} rows with no resolvable price", stats.dropped);
        }

        processing_steps.push(format!(
            "Imputed {} prices from product medians",
            stats.imputed
        ));
        if stats.defaulted > 0 {
            processing_steps.push(format!(
                "Filled {} prices with the global median",
                stats.defaulted
            ));
        }
        if stats.unresolved > 0 {
            processing_steps.push(format!(
                "Left {} prices unresolved (Unbinned)",
                stats.unresolved
            ));
        }
        if stats.dropped > 0 {
            processing_steps.push(format!(
                "Removed {} rows with no resolvable price",
                stats.dropped
            ));
        }

        Ok((df, stats))
    }
}
