//! Association rule mining over invoice transactions.
//!
//! The flow mirrors the preprocessing pipeline: build transactions from the
//! cleaned dataset, run a [`RuleMiner`], drop rules that mix temporal
//! labels, then order and truncate what is left.
//!
//! # Example
//!
//! ```rust,ignore
//! use basket_mining::{MiningConfig, mining};
//!
//! let config = MiningConfig::builder().min_support(0.05).build()?;
//! let outcome = mining::mine_file("datasets/cleaned_retail.csv", &config)?;
//! for rule in &outcome.rules {
//!     println!("{:?} {:.4}", rule.items, rule.support);
//! }
//! ```

pub mod apriori;
pub mod filter;
pub mod transactions;

pub use apriori::Apriori;
pub use filter::{has_temporal_collision, rank_rules, retain_single_temporal};
pub use transactions::{Transaction, build_transactions};

use crate::config::{MiningConfig, MiningParams};
use crate::error::Result;
use crate::io::load_csv;
use crate::types::TemporalLabel;
use polars::prelude::DataFrame;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// An element of a transaction.
///
/// Products sort before temporal labels, so a sorted itemset lists its
/// products first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Item {
    Product(String),
    Temporal(TemporalLabel),
}

impl Item {
    pub fn is_temporal(&self) -> bool {
        matches!(self, Item::Temporal(_))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Product(code) => f.write_str(code),
            Item::Temporal(label) => fmt::Display::fmt(label, f),
        }
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<TemporalLabel> for Item {
    fn from(label: TemporalLabel) -> Self {
        Item::Temporal(label)
    }
}

/// One directed reading of a frequent itemset: `items_base -> items_add`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderedStatistic<T = Item> {
    pub items_base: Vec<T>,
    pub items_add: Vec<T>,
    pub confidence: f64,
    pub lift: f64,
}

/// A frequent itemset with the ordered statistics that met the thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationRecord<T = Item> {
    /// Items in ascending order.
    pub items: Vec<T>,
    pub support: f64,
    pub ordered_statistics: Vec<OrderedStatistic<T>>,
}

impl<T> RelationRecord<T> {
    /// Highest confidence among the ordered statistics.
    pub fn best_confidence(&self) -> f64 {
        self.ordered_statistics
            .iter()
            .map(|s| s.confidence)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Highest lift among the ordered statistics.
    pub fn best_lift(&self) -> f64 {
        self.ordered_statistics
            .iter()
            .map(|s| s.lift)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Frequent itemset miner producing relation records.
pub trait RuleMiner {
    /// Mine every itemset meeting `params`, in discovery order.
    fn mine(&self, transactions: &[Transaction], params: &MiningParams)
    -> Result<Vec<RelationRecord>>;
}

/// Result of a mining run.
#[derive(Debug, Clone, Serialize)]
pub struct MiningOutcome {
    /// Number of invoice transactions mined.
    pub transactions: usize,
    /// Records produced by the miner.
    pub rules_mined: usize,
    /// Records left after the temporal filter.
    pub rules_retained: usize,
    /// Reported rules, ordered and truncated.
    pub rules: Vec<RelationRecord>,
    pub duration_ms: u64,
}

/// Mine rules from a cleaned dataset with the bundled [`Apriori`] miner.
pub fn mine_rules(df: &DataFrame, config: &MiningConfig) -> Result<MiningOutcome> {
    mine_rules_with(&Apriori, df, config)
}

/// Mine rules from a cleaned dataset with any [`RuleMiner`].
pub fn mine_rules_with(
    miner: &dyn RuleMiner,
    df: &DataFrame,
    config: &MiningConfig,
) -> Result<MiningOutcome> {
    let start_time = Instant::now();

    let transactions = build_transactions(df, config.label)?;
    info!("Built {} transactions", transactions.len());

    let mined = miner.mine(&transactions, &config.params)?;
    let rules_mined = mined.len();

    let retained = retain_single_temporal(mined);
    let rules_retained = retained.len();
    info!(
        "Mined {} rules, {} without temporal collisions",
        rules_mined, rules_retained
    );

    let rules = rank_rules(retained, config.order, config.top_n);

    Ok(MiningOutcome {
        transactions: transactions.len(),
        rules_mined,
        rules_retained,
        rules,
        duration_ms: start_time.elapsed().as_millis() as u64,
    })
}

/// Load a cleaned CSV and mine it.
pub fn mine_file(path: impl AsRef<Path>, config: &MiningConfig) -> Result<MiningOutcome> {
    let df = load_csv(path)?;
    mine_rules(&df, config)
}
