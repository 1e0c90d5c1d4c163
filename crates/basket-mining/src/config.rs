//! Configuration types for the preprocessing and mining stages.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic setup of both stages.

use crate::types::LabelKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the cleaned dataset shared by both stages.
pub const DEFAULT_CLEANED_PATH: &str = "datasets/cleaned_retail.csv";

/// Placeholder written into empty descriptions.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Placeholder written into empty countries.
pub const DEFAULT_COUNTRY: &str = "Unknown";

/// Dimension along which the dataset is pruned to a bounded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneStrategy {
    /// Keep a window of `days` days of invoices.
    DateWindow { days: u32 },
    /// Keep the rows of `count` customers.
    Customers { count: usize },
    /// Keep the rows of `count` invoices.
    Invoices { count: usize },
}

impl PruneStrategy {
    /// The size parameter, whatever the dimension.
    pub fn size(&self) -> usize {
        match self {
            PruneStrategy::DateWindow { days } => *days as usize,
            PruneStrategy::Customers { count } | PruneStrategy::Invoices { count } => *count,
        }
    }
}

/// How the pruning window is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PruneMode {
    /// Most recent window, or the entities with the most rows.
    #[default]
    Top,
    /// Random window start, or randomly sampled entities.
    Random,
}

/// Policy for rows whose price cannot be imputed from the same product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PriceFallback {
    /// Remove the row
    #[default]
    DropRow,
    /// Use the median of every known price
    GlobalMedian,
    /// Keep the row with an empty price and an `Unbinned` price category
    Unbinned,
}

/// Configuration for the preprocessing stage.
///
/// Use [`PreprocessConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use basket_mining::config::{PreprocessConfig, PruneStrategy};
///
/// let config = PreprocessConfig::builder()
///     .prune(PruneStrategy::DateWindow { days: 5 })
///     .output_path("datasets/cleaned_retail.csv")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Where the cleaned dataset is written.
    /// Default: "datasets/cleaned_retail.csv"
    pub output_path: PathBuf,

    /// Optional pruning window. At most one dimension per run.
    /// Default: None
    pub prune: Option<PruneStrategy>,

    /// Window selection mode for pruning.
    /// Default: Top
    pub prune_mode: PruneMode,

    /// Seed for the random pruning modes. `None` draws from entropy.
    /// Default: None
    pub seed: Option<u64>,

    /// What to do with prices that cannot be imputed.
    /// Default: DropRow
    pub price_fallback: PriceFallback,

    /// Fill value for missing descriptions.
    pub description_placeholder: String,

    /// Fill value for missing countries.
    pub country_placeholder: String,

    /// Whether to write a JSON run report next to the cleaned dataset.
    /// Default: false
    pub emit_report: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_CLEANED_PATH),
            prune: None,
            prune_mode: PruneMode::default(),
            seed: None,
            price_fallback: PriceFallback::default(),
            description_placeholder: DEFAULT_DESCRIPTION.to_string(),
            country_placeholder: DEFAULT_COUNTRY.to_string(),
            emit_report: false,
        }
    }
}

impl PreprocessConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreprocessConfigBuilder {
        PreprocessConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(strategy) = self.prune
            && strategy.size() == 0
        {
            return Err(ConfigValidationError::InvalidPruneSize(strategy));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyOutputPath);
        }

        Ok(())
    }
}

/// Builder for [`PreprocessConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessConfigBuilder {
    output_path: Option<PathBuf>,
    prune: Option<PruneStrategy>,
    prune_mode: Option<PruneMode>,
    seed: Option<u64>,
    price_fallback: Option<PriceFallback>,
    description_placeholder: Option<String>,
    country_placeholder: Option<String>,
    emit_report: Option<bool>,
}

impl PreprocessConfigBuilder {
    /// Set the path of the cleaned CSV.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Prune the dataset along one dimension before deriving features.
    pub fn prune(mut self, strategy: PruneStrategy) -> Self {
        self.prune = Some(strategy);
        self
    }

    /// Choose between the top-N and random-N variants of pruning.
    pub fn prune_mode(mut self, mode: PruneMode) -> Self {
        self.prune_mode = Some(mode);
        self
    }

    /// Fix the seed used by random pruning.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the policy for prices with no same-product history.
    pub fn price_fallback(mut self, fallback: PriceFallback) -> Self {
        self.price_fallback = Some(fallback);
        self
    }

    pub fn description_placeholder(mut self, value: impl Into<String>) -> Self {
        self.description_placeholder = Some(value.into());
        self
    }

    pub fn country_placeholder(mut self, value: impl Into<String>) -> Self {
        self.country_placeholder = Some(value.into());
        self
    }

    /// Enable or disable the JSON run report.
    pub fn emit_report(mut self, emit: bool) -> Self {
        self.emit_report = Some(emit);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PreprocessConfig` or an error if validation fails.
    pub fn build(self) -> Result<PreprocessConfig, ConfigValidationError> {
        let config = PreprocessConfig {
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLEANED_PATH)),
            prune: self.prune,
            prune_mode: self.prune_mode.unwrap_or_default(),
            seed: self.seed,
            price_fallback: self.price_fallback.unwrap_or_default(),
            description_placeholder: self
                .description_placeholder
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            country_placeholder: self
                .country_placeholder
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            emit_report: self.emit_report.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Thresholds handed to the frequent itemset miner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MiningParams {
    /// Minimum fraction of transactions containing an itemset.
    pub min_support: f64,
    /// Minimum confidence of an ordered statistic.
    pub min_confidence: f64,
    /// Minimum lift of an ordered statistic.
    pub min_lift: f64,
    /// Smallest itemset reported.
    pub min_length: usize,
    /// Largest itemset explored. `None` means unbounded.
    pub max_length: Option<usize>,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_support: 0.02,
            min_confidence: 0.2,
            min_lift: 1.0,
            min_length: 2,
            max_length: None,
        }
    }
}

impl MiningParams {
    /// Validate the thresholds and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "min_support".to_string(),
                value: self.min_support,
            });
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "min_confidence".to_string(),
                value: self.min_confidence,
            });
        }

        if !(self.min_lift >= 0.0 && self.min_lift.is_finite()) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "min_lift".to_string(),
                value: self.min_lift,
            });
        }

        if self.min_length == 0 {
            return Err(ConfigValidationError::InvalidLength {
                min_length: self.min_length,
                max_length: self.max_length,
            });
        }

        if let Some(max_length) = self.max_length
            && max_length < self.min_length
        {
            return Err(ConfigValidationError::InvalidLength {
                min_length: self.min_length,
                max_length: self.max_length,
            });
        }

        Ok(())
    }
}

/// Order in which surviving rules are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RuleOrder {
    /// The order the miner discovered them in
    #[default]
    Discovery,
    /// Highest support first
    Support,
    /// Highest best-statistic confidence first
    Confidence,
    /// Highest best-statistic lift first
    Lift,
}

/// Configuration for the mining stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Thresholds for the itemset miner.
    pub params: MiningParams,

    /// How many surviving rules are reported.
    /// Default: 15
    pub top_n: usize,

    /// Ordering applied before truncation.
    /// Default: Discovery
    pub order: RuleOrder,

    /// Temporal label appended to every transaction.
    /// Default: DayOfWeek
    pub label: LabelKind,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            params: MiningParams::default(),
            top_n: 15,
            order: RuleOrder::default(),
            label: LabelKind::default(),
        }
    }
}

impl MiningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> MiningConfigBuilder {
        MiningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.params.validate()?;
        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidTopN(self.top_n));
        }
        Ok(())
    }
}

/// Builder for [`MiningConfig`] with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// let config = MiningConfig::builder()
///     .min_support(0.05)
///     .order(RuleOrder::Lift)
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct MiningConfigBuilder {
    min_support: Option<f64>,
    min_confidence: Option<f64>,
    min_lift: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    top_n: Option<usize>,
    order: Option<RuleOrder>,
    label: Option<LabelKind>,
}

impl MiningConfigBuilder {
    /// Set the minimum support (0.0 exclusive - 1.0).
    pub fn min_support(mut self, value: f64) -> Self {
        self.min_support = Some(value);
        self
    }

    /// Set the minimum confidence (0.0 - 1.0).
    pub fn min_confidence(mut self, value: f64) -> Self {
        self.min_confidence = Some(value);
        self
    }

    /// Set the minimum lift.
    pub fn min_lift(mut self, value: f64) -> Self {
        self.min_lift = Some(value);
        self
    }

    /// Set the smallest itemset length reported.
    pub fn min_length(mut self, value: usize) -> Self {
        self.min_length = Some(value);
        self
    }

    /// Cap the itemset length explored.
    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    /// Set how many rules are reported.
    pub fn top_n(mut self, value: usize) -> Self {
        self.top_n = Some(value);
        self
    }

    pub fn order(mut self, order: RuleOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn label(mut self, label: LabelKind) -> Self {
        self.label = Some(label);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `MiningConfig` or an error if validation fails.
    pub fn build(self) -> Result<MiningConfig, ConfigValidationError> {
        let defaults = MiningParams::default();
        let config = MiningConfig {
            params: MiningParams {
                min_support: self.min_support.unwrap_or(defaults.min_support),
                min_confidence: self.min_confidence.unwrap_or(defaults.min_confidence),
                min_lift: self.min_lift.unwrap_or(defaults.min_lift),
                min_length: self.min_length.unwrap_or(defaults.min_length),
                max_length: self.max_length,
            },
            top_n: self.top_n.unwrap_or(15),
            order: self.order.unwrap_or_default(),
            label: self.label.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value}")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid itemset length bounds: min {min_length}, max {max_length:?}")]
    InvalidLength {
        min_length: usize,
        max_length: Option<usize>,
    },

    #[error("Invalid number of reported rules: {0} (must be at least 1)")]
    InvalidTopN(usize),

    #[error("Invalid prune size for {0:?} (must be at least 1)")]
    InvalidPruneSize(PruneStrategy),

    #[error("Output path must not be empty")]
    EmptyOutputPath,
}
