//! Equal-frequency (tertile) binning of numeric columns.

use crate::types::UNBINNED;
use crate::utils::{numeric_values, quantile_sorted};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Quantiles used as bin edges.
const TERTILE_QUANTILES: [f64; 4] = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];

/// Bin edges fitted on the non-null values of a column.
///
/// Edges that coincide are collapsed, so a skewed column can end up with
/// fewer than three bins. Intervals are right-closed and the lowest edge
/// belongs to the first bin.
#[derive(Debug, Clone, PartialEq)]
pub struct TertileBinner {
    edges: Vec<f64>,
}

impl TertileBinner {
    /// Fit edges on `values`. Returns `None` when there is nothing to bin.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let mut edges: Vec<f64> = TERTILE_QUANTILES
            .iter()
            .filter_map(|&q| quantile_sorted(&sorted, q))
            .collect();
        edges.dedup();

        Some(Self { edges })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Number of bins; a single distinct value still forms one bin.
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1).max(1)
    }

    /// Index of the bin holding `value`.
    pub fn assign(&self, value: f64) -> usize {
        self.edges
            .iter()
            .skip(1)
            .position(|&edge| value <= edge)
            .unwrap_or(self.bin_count() - 1)
            .min(self.bin_count() - 1)
    }
}

/// Add a categorical column `target` holding the tertile label of `source`.
///
/// Null values are labelled [`UNBINNED`]. Returns the frame and the edges
/// actually used.
pub fn bin_column(
    df: DataFrame,
    source: &str,
    target: &str,
    labels: &[&str; 3],
) -> Result<(DataFrame, Vec<f64>)> {
    let mut df = df;
    let values = numeric_values(&df, source)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let binner = TertileBinner::fit(&present);
    let categories: Vec<&str> = values
        .iter()
        .map(|value| match (value, &binner) {
            (Some(v), Some(binner)) => labels[binner.assign(*v)],
            _ => UNBINNED,
        })
        .collect();

    df.with_column(Series::new(target.into(), categories))?;

    let edges = binner.map(|b| b.edges).unwrap_or_default();
    debug!("Binned {} into {} with edges {:?}", source, target, edges);
    Ok((df, edges))
}
