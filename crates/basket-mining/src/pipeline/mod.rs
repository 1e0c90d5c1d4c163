//! Pipeline module.
//!
//! This module provides the preprocessor that turns a raw retail export
//! into the cleaned dataset the miner reads, plus its progress types.

mod builder;
pub mod progress;

pub use builder::{PreprocessOutcome, Preprocessor, PreprocessorBuilder};
pub use progress::{
    ClosureProgressReporter, PreprocessingStage, ProgressReporter, ProgressUpdate,
};
