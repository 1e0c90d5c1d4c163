//! The preprocessor and its builder.

use crate::cleaner::DataCleaner;
use crate::config::PreprocessConfig;
use crate::error::{MiningError, Result};
use crate::features::{bin_column, derive_temporal_columns};
use crate::imputers::PriceImputer;
use crate::io::{load_csv, write_csv};
use crate::pipeline::progress::{
    ClosureProgressReporter, PreprocessingStage, ProgressReporter, ProgressUpdate,
};
use crate::pruning::Pruner;
use crate::reporting::ReportGenerator;
use crate::types::{
    PRICE, PRICE_CATEGORY, PRICE_LABELS, PreprocessSummary, QUANTITY, QUANTITY_CATEGORY,
    QUANTITY_LABELS, REQUIRED_COLUMNS,
};
use crate::utils::require_columns;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Everything a preprocessing run produced.
#[derive(Debug, Clone)]
pub struct PreprocessOutcome {
    /// The cleaned dataset with derived columns.
    pub cleaned: DataFrame,
    pub summary: PreprocessSummary,
    /// Actions taken by the cleaner.
    pub cleaning_actions: Vec<String>,
    /// Imputation, pruning, derivation and binning steps.
    pub processing_steps: Vec<String>,
    /// Where the cleaned CSV was written, when it was.
    pub output_path: Option<PathBuf>,
    /// Where the JSON report was written, when it was.
    pub report_path: Option<PathBuf>,
}

/// Cleans a raw retail dataset for mining.
///
/// Use [`Preprocessor::builder()`] to create one with a custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use basket_mining::{Preprocessor, PreprocessConfig, PruneStrategy};
///
/// let config = PreprocessConfig::builder()
///     .prune(PruneStrategy::Customers { count: 100 })
///     .build()?;
///
/// let outcome = Preprocessor::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run("datasets/retail.csv")?;
/// ```
pub struct Preprocessor {
    config: PreprocessConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
}

static_assertions::assert_impl_all!(Preprocessor: Send, Sync);

impl Preprocessor {
    /// Create a new preprocessor builder.
    pub fn builder() -> PreprocessorBuilder {
        PreprocessorBuilder::default()
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Load `input`, clean it, and write the cleaned CSV (and report, when
    /// enabled) to the configured output path.
    pub fn run(&self, input: impl AsRef<Path>) -> Result<PreprocessOutcome> {
        let input = input.as_ref();
        let result = self.run_internal(input);
        self.finish(result)
    }

    /// Clean an in-memory raw dataset without touching the filesystem.
    pub fn process(&self, df: DataFrame) -> Result<PreprocessOutcome> {
        let result = self.process_internal(df);
        self.finish(result)
    }

    fn finish(&self, result: Result<PreprocessOutcome>) -> Result<PreprocessOutcome> {
        match result {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Preprocessing completed: {} rows",
                    outcome.summary.rows_after
                )));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Preprocessing error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, input: &Path) -> Result<PreprocessOutcome> {
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Loading,
            0.0,
            format!("Loading {}", input.display()),
        ));
        let df = load_csv(input)?;

        let mut outcome = self.process_internal(df)?;

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Writing,
            0.0,
            "Writing cleaned dataset...",
        ));
        let output_path = self.config.output_path.clone();
        write_csv(&mut outcome.cleaned, &output_path)?;
        outcome.output_path = Some(output_path.clone());

        if self.config.emit_report {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let report = ReportGenerator::build_report(
                &input.to_string_lossy(),
                Some(&output_path.to_string_lossy()),
                &outcome,
            );
            let path = ReportGenerator::for_output(&output_path)
                .write_report_to_file(&report, stem)
                .map_err(|e| MiningError::ReportGenerationFailed(e.to_string()))?;
            outcome.report_path = Some(path);
        }

        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Writing,
            1.0,
            "Output written",
        ));
        Ok(outcome)
    }

    fn process_internal(&self, df: DataFrame) -> Result<PreprocessOutcome> {
        let start_time = Instant::now();

        info!("Starting preprocessing...");
        require_columns(&df, &REQUIRED_COLUMNS)?;

        let mut summary = PreprocessSummary::new();
        summary.rows_before = df.height();
        let mut processing_steps: Vec<String> = Vec::new();

        // Step 1: Cleaning
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Cleaning,
            0.0,
            "Cleaning rows...",
        ));
        info!("Step 1: Cleaning rows...");
        let (df, cleaning_actions) = self
            .cleaner
            .clean(df, &mut summary.dropped)
            .map_err(|e| MiningError::from_anyhow(e, MiningError::CleaningFailed))?;

        // Step 2: Price imputation
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Imputation,
            0.0,
            "Imputing missing prices...",
        ));
        info!("Step 2: Imputing missing prices...");
        let (df, stats) = PriceImputer::fit(&df)
            .and_then(|imputer| {
                imputer.apply(df, self.config.price_fallback, &mut processing_steps)
            })
            .map_err(|e| MiningError::from_anyhow(e, MiningError::CleaningFailed))?;
        summary.prices_imputed = stats.imputed;
        summary.prices_defaulted = stats.defaulted;
        summary.prices_unresolved = stats.unresolved;
        summary.dropped.unresolved_price = stats.dropped;
        if stats.dropped > 0 {
            summary.add_warning(format!(
                "{} rows dropped because their price could not be imputed",
                stats.dropped
            ));
        }

        // Step 3: Pruning
        let df = match self.config.prune {
            Some(strategy) => {
                self.report_progress(ProgressUpdate::new(
                    PreprocessingStage::Pruning,
                    0.0,
                    "Pruning dataset...",
                ));
                info!("Step 3: Pruning dataset...");
                let before = df.height();
                let (pruned, description) =
                    Pruner::new(strategy, self.config.prune_mode, self.config.seed)
                        .prune(df)
                        .map_err(|e| MiningError::from_anyhow(e, MiningError::CleaningFailed))?;
                summary.dropped.pruned = before - pruned.height();
                processing_steps.push(format!("Pruned to {}", description));
                summary.pruning = Some(description);
                pruned
            }
            None => {
                info!("Step 3: Skipping pruning (not configured)");
                df
            }
        };

        // Step 4: Temporal features
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::FeatureDerivation,
            0.0,
            "Deriving temporal columns...",
        ));
        info!("Step 4: Deriving temporal columns...");
        let df = derive_temporal_columns(df)
            .map_err(|e| MiningError::from_anyhow(e, MiningError::CleaningFailed))?;
        processing_steps.push("Derived TimeCategory and DayOfWeek from InvoiceDate".to_string());

        // Step 5: Binning
        self.report_progress(ProgressUpdate::new(
            PreprocessingStage::Binning,
            0.0,
            "Binning price and quantity...",
        ));
        info!("Step 5: Binning price and quantity...");
        let (df, price_edges) = bin_column(df, PRICE, PRICE_CATEGORY, &PRICE_LABELS)
            .map_err(|e| MiningError::from_anyhow(e, MiningError::CleaningFailed))?;
        let (df, quantity_edges) = bin_column(df, QUANTITY, QUANTITY_CATEGORY, &QUANTITY_LABELS)
            .map_err(|e| MiningError::from_anyhow(e, MiningError::CleaningFailed))?;
        processing_steps.push(format!(
            "Binned Price into {} categories and Quantity into {} categories",
            price_edges.len().saturating_sub(1).max(1),
            quantity_edges.len().saturating_sub(1).max(1)
        ));
        summary.price_edges = price_edges;
        summary.quantity_edges = quantity_edges;

        summary.rows_after = df.height();
        if df.height() == 0 {
            warn!("No rows survived preprocessing");
            summary.add_warning("No rows survived preprocessing");
        }
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Preprocessing finished: {} -> {} rows in {}ms",
            summary.rows_before, summary.rows_after, summary.duration_ms
        );

        Ok(PreprocessOutcome {
            cleaned: df,
            summary,
            cleaning_actions,
            processing_steps,
            output_path: None,
            report_path: None,
        })
    }
}

/// Builder for [`Preprocessor`].
#[derive(Default)]
pub struct PreprocessorBuilder {
    config: Option<PreprocessConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl PreprocessorBuilder {
    /// Set the preprocessing configuration.
    pub fn config(mut self, config: PreprocessConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// ```rust,ignore
    /// let preprocessor = Preprocessor::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}",
    ///             update.progress * 100.0,
    ///             update.stage,
    ///             update.message
    ///         );
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the preprocessor.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Preprocessor, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cleaner = DataCleaner::new(&config);
        Ok(Preprocessor {
            config,
            progress_reporter: self.progress_reporter,
            cleaner,
        })
    }
}
