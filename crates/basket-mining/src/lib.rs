//! Retail Basket Mining Library
//!
//! Cleans an online-retail transaction export and mines association rules
//! between products and the time at which they were bought.
//!
//! # Overview
//!
//! The library has two stages that communicate through a cleaned CSV file:
//!
//! - **Preprocessing**: null-marker normalization, removal of returns and
//!   negative prices, placeholder defaults, per-product price imputation,
//!   optional pruning to a date/customer/invoice window, and derived
//!   `TimeCategory`, `DayOfWeek`, `PriceCategory` and `QuantityCategory`
//!   columns
//! - **Mining**: one transaction per invoice (products plus one temporal
//!   label), Apriori frequent itemsets with confidence and lift, and a
//!   filter that drops rules mixing two temporal labels
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use basket_mining::{MiningConfig, PreprocessConfig, Preprocessor, mine_file, render_rules};
//!
//! // Stage 1: clean the raw export
//! let config = PreprocessConfig::builder()
//!     .output_path("datasets/cleaned_retail.csv")
//!     .build()?;
//! let outcome = Preprocessor::builder()
//!     .config(config)
//!     .build()?
//!     .run("datasets/retail.csv")?;
//! println!("Kept {} rows", outcome.summary.rows_after);
//!
//! // Stage 2: mine the cleaned file
//! let config = MiningConfig::builder()
//!     .min_support(0.02)
//!     .min_confidence(0.2)
//!     .build()?;
//! let mined = mine_file("datasets/cleaned_retail.csv", &config)?;
//! print!("{}", render_rules(&mined.rules));
//! ```
//!
//! # Progress Reporting
//!
//! ```rust,ignore
//! let outcome = Preprocessor::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod io;
pub mod mining;
pub mod pipeline;
pub mod pruning;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use config::{
    ConfigValidationError, MiningConfig, MiningConfigBuilder, MiningParams, PreprocessConfig,
    PreprocessConfigBuilder, PriceFallback, PruneMode, PruneStrategy, RuleOrder,
};
pub use error::{MiningError, Result as MiningResult, ResultExt};
pub use imputers::{ImputationStats, PriceImputer};
pub use io::{load_csv, write_csv};
pub use mining::{
    Apriori, Item, MiningOutcome, OrderedStatistic, RelationRecord, RuleMiner, Transaction,
    build_transactions, mine_file, mine_rules, mine_rules_with,
};
pub use pipeline::{
    ClosureProgressReporter, PreprocessOutcome, PreprocessingStage, Preprocessor,
    PreprocessorBuilder, ProgressReporter, ProgressUpdate,
};
pub use pruning::Pruner;
pub use reporting::{NO_RULES_MESSAGE, PreprocessReport, ReportGenerator, RuleReport, render_rules};
pub use types::{
    DayOfWeek, DroppedRows, LabelKind, PreprocessSummary, TemporalLabel, TimeCategory,
};
