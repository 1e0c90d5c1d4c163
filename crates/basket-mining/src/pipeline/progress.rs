//! Progress reporting for the preprocessor.
//!
//! # Example
//!
//! ```rust,ignore
//! use basket_mining::Preprocessor;
//!
//! let outcome = Preprocessor::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(df);
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the preprocessing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingStage {
    /// Reading and validating the raw file
    Loading,
    /// Dropping invalid rows and filling defaults
    Cleaning,
    /// Filling missing prices
    Imputation,
    /// Reducing the dataset to a window
    Pruning,
    /// Deriving time-of-day and day-of-week columns
    FeatureDerivation,
    /// Tertile binning of price and quantity
    Binning,
    /// Writing the cleaned dataset and report
    Writing,
    /// Run completed successfully
    Complete,
    /// Run failed with an error
    Failed,
}

impl PreprocessingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Dataset",
            Self::Cleaning => "Cleaning Data",
            Self::Imputation => "Imputing Prices",
            Self::Pruning => "Pruning Dataset",
            Self::FeatureDerivation => "Deriving Features",
            Self::Binning => "Binning Values",
            Self::Writing => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the share of the overall run taken by this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.05,
            Self::Cleaning => 0.20,
            Self::Imputation => 0.15,
            Self::Pruning => 0.10,
            Self::FeatureDerivation => 0.15,
            Self::Binning => 0.15,
            Self::Writing => 0.20,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Cleaning => 0.05,
            Self::Imputation => 0.25,
            Self::Pruning => 0.40,
            Self::FeatureDerivation => 0.50,
            Self::Binning => 0.65,
            Self::Writing => 0.80,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current stage
    pub stage: PreprocessingStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PreprocessingStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PreprocessingStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PreprocessingStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receiver of progress updates.
///
/// Updates are delivered synchronously on the thread running the
/// preprocessor, so implementations should return quickly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const STAGES: [PreprocessingStage; 7] = [
        PreprocessingStage::Loading,
        PreprocessingStage::Cleaning,
        PreprocessingStage::Imputation,
        PreprocessingStage::Pruning,
        PreprocessingStage::FeatureDerivation,
        PreprocessingStage::Binning,
        PreprocessingStage::Writing,
    ];

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = STAGES.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = 0.0;
        for stage in STAGES {
            assert!((stage.base_progress() - expected).abs() < 1e-5, "{:?}", stage);
            expected += stage.weight();
        }
    }

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PreprocessingStage::Imputation, 0.5, "half way");
        assert!((update.progress - 0.325).abs() < 1e-5);
        assert_eq!(update.stage_progress, 0.5);
    }

    #[test]
    fn test_closure_reporter_receives_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ClosureProgressReporter::new(move |update: ProgressUpdate| {
            sink.lock().unwrap().push(update.stage);
        });

        reporter.report(ProgressUpdate::new(PreprocessingStage::Loading, 0.0, "start"));
        reporter.report(ProgressUpdate::complete("done"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PreprocessingStage::Loading, PreprocessingStage::Complete]
        );
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&PreprocessingStage::FeatureDerivation).unwrap();
        assert_eq!(json, "\"feature_derivation\"");
    }
}
