//! Reduction of the dataset to a bounded window before feature derivation.

use crate::config::{PruneMode, PruneStrategy};
use crate::types::{CUSTOMER_ID, INVOICE, INVOICE_DATE};
use crate::utils::{date_values, filter_rows, string_values};
use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use rand::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Keeps one window of the dataset along a single dimension.
#[derive(Debug, Clone)]
pub struct Pruner {
    strategy: PruneStrategy,
    mode: PruneMode,
    seed: Option<u64>,
}

impl Pruner {
    pub fn new(strategy: PruneStrategy, mode: PruneMode, seed: Option<u64>) -> Self {
        Self {
            strategy,
            mode,
            seed,
        }
    }

    /// Apply the window. Returns the pruned frame and a description of it.
    pub fn prune(&self, df: DataFrame) -> Result<(DataFrame, String)> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let before = df.height();
        let (keep, description) = match self.strategy {
            PruneStrategy::DateWindow { days } => {
                let dates = date_values(&df, INVOICE_DATE)?;
                self.date_window(&dates, days, &mut rng)
            }
            PruneStrategy::Customers { count } => {
                let customers = string_values(&df, CUSTOMER_ID)?;
                let keep = self.select_entities(&customers, count, &mut rng);
                (keep, format!("{} {} customers", self.mode_name(), count))
            }
            PruneStrategy::Invoices { count } => {
                let invoices = string_values(&df, INVOICE)?;
                let keep = self.select_entities(&invoices, count, &mut rng);
                (keep, format!("{} {} invoices", self.mode_name(), count))
            }
        };

        let df = filter_rows(&df, &keep)?;
        info!(
            "Pruned to {}: {} -> {} rows",
            description,
            before,
            df.height()
        );
        Ok((df, description))
    }

    fn mode_name(&self) -> &'static str {
        match self.mode {
            PruneMode::Top => "top",
            PruneMode::Random => "random",
        }
    }

    /// Mask of rows inside a window of `days` days.
    fn date_window(
        &self,
        dates: &[Option<NaiveDateTime>],
        days: u32,
        rng: &mut StdRng,
    ) -> (Vec<bool>, String) {
        let span = Duration::days(i64::from(days));
        let (Some(min), Some(max)) = (
            dates.iter().flatten().min().copied(),
            dates.iter().flatten().max().copied(),
        ) else {
            return (vec![true; dates.len()], "empty date range".to_string());
        };

        // A window reaching past the earliest representable timestamp has no cutoff
        let cutoff = match max.checked_sub_signed(span) {
            Some(cutoff) if cutoff > min => cutoff,
            _ => {
                debug!("Window of {} days covers the whole dataset", days);
                return (
                    vec![true; dates.len()],
                    format!("{} days (whole dataset)", days),
                );
            }
        };

        match self.mode {
            PruneMode::Top => {
                let keep = dates.iter().map(|d| d.is_some_and(|d| d >= cutoff)).collect();
                (keep, format!("most recent {} days from {}", days, cutoff))
            }
            PruneMode::Random => {
                let steps = (cutoff - min).num_days();
                let start = min + Duration::days(rng.gen_range(0..=steps));
                let end = start.checked_add_signed(span);
                let keep = dates
                    .iter()
                    .map(|d| d.is_some_and(|d| d >= start && end.is_none_or(|end| d < end)))
                    .collect();
                (keep, format!("random {} days from {}", days, start))
            }
        }
    }

    /// Mask of rows belonging to the selected entities.
    ///
    /// Top mode ranks entities by row count, ties broken by first
    /// appearance. Random mode samples distinct entities.
    fn select_entities(
        &self,
        values: &[Option<String>],
        count: usize,
        rng: &mut StdRng,
    ) -> Vec<bool> {
        let mut first_seen: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in values.iter().flatten() {
            let entry = counts.entry(value.as_str()).or_insert_with(|| {
                first_seen.push(value.as_str());
                0
            });
            *entry += 1;
        }

        let selected: HashSet<&str> = match self.mode {
            PruneMode::Top => {
                let mut ranked = first_seen.clone();
                ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));
                ranked.into_iter().take(count).collect()
            }
            PruneMode::Random => first_seen
                .choose_multiple(rng, count.min(first_seen.len()))
                .copied()
                .collect(),
        };

        values
            .iter()
            .map(|v| v.as_deref().is_some_and(|v| selected.contains(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn customer_frame() -> DataFrame {
        df![
            "Invoice" => ["1", "1", "2", "3", "3", "3", "4", "5", "5", "6"],
            "Customer ID" => ["c1", "c1", "c2", "c3", "c3", "c3", "c4", "c5", "c5", "c2"],
            "InvoiceDate" => [
                "2010-12-01 08:00:00", "2010-12-01 08:00:00", "2010-12-02 09:00:00",
                "2010-12-03 10:00:00", "2010-12-03 10:00:00", "2010-12-03 10:00:00",
                "2010-12-05 11:00:00", "2010-12-08 12:00:00", "2010-12-08 12:00:00",
                "2010-12-10 13:00:00",
            ],
        ]
        .unwrap()
    }

    fn distinct(df: &DataFrame, column: &str) -> HashSet<String> {
        string_values(df, column)
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_top_customers_by_row_count() {
        let pruner = Pruner::new(PruneStrategy::Customers { count: 2 }, PruneMode::Top, None);
        let (df, _) = pruner.prune(customer_frame()).unwrap();

        // c3 has 3 rows; c1, c2 and c5 tie at 2 and c1 appears first
        let kept = distinct(&df, CUSTOMER_ID);
        assert_eq!(kept, HashSet::from(["c3".to_string(), "c1".to_string()]));
        assert_eq!(df.height(), 5);
    }

    #[test]
    fn test_random_customers_are_seeded() {
        let pruner = Pruner::new(PruneStrategy::Customers { count: 3 }, PruneMode::Random, Some(7));
        let (first, _) = pruner.prune(customer_frame()).unwrap();
        let (second, _) = pruner.prune(customer_frame()).unwrap();

        assert_eq!(distinct(&first, CUSTOMER_ID).len(), 3);
        assert!(first.equals(&second));
    }

    #[test]
    fn test_top_invoices() {
        let pruner = Pruner::new(PruneStrategy::Invoices { count: 1 }, PruneMode::Top, None);
        let (df, _) = pruner.prune(customer_frame()).unwrap();
        assert_eq!(distinct(&df, INVOICE), HashSet::from(["3".to_string()]));
    }

    #[test]
    fn test_most_recent_date_window() {
        let pruner = Pruner::new(PruneStrategy::DateWindow { days: 5 }, PruneMode::Top, None);
        let (df, _) = pruner.prune(customer_frame()).unwrap();
        // cutoff is 2010-12-05 13:00:00
        assert_eq!(distinct(&df, INVOICE), HashSet::from(["5".to_string(), "6".to_string()]));
    }

    #[test]
    fn test_random_date_window_stays_within_span() {
        let pruner = Pruner::new(PruneStrategy::DateWindow { days: 3 }, PruneMode::Random, Some(1));
        let (df, description) = pruner.prune(customer_frame()).unwrap();

        let dates: Vec<NaiveDateTime> = date_values(&df, INVOICE_DATE)
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let min = dates.iter().min().copied();
        let max = dates.iter().max().copied();
        if let (Some(min), Some(max)) = (min, max) {
            assert!(max - min < Duration::days(3));
        }
        assert!(description.starts_with("random 3 days"));
    }

    #[test]
    fn test_window_larger_than_span_keeps_everything() {
        let pruner = Pruner::new(PruneStrategy::DateWindow { days: 365 }, PruneMode::Random, Some(3));
        let (df, _) = pruner.prune(customer_frame()).unwrap();
        assert_eq!(df.height(), 10);
    }

    #[test]
    fn test_huge_window_keeps_everything() {
        for mode in [PruneMode::Top, PruneMode::Random] {
            let pruner = Pruner::new(
                PruneStrategy::DateWindow { days: u32::MAX },
                mode,
                Some(11),
            );
            let (df, description) = pruner.prune(customer_frame()).unwrap();
            assert_eq!(df.height(), 10);
            assert!(description.ends_with("(whole dataset)"));
        }
    }
}
