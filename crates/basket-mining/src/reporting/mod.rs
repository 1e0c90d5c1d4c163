//! Report generation module.
//!
//! - [`PreprocessReport`]: JSON summary of a preprocessing run, written as
//!   `<input_stem>_report.json` with `--emit-report`
//! - [`render_rules`] and [`RuleReport`]: text and JSON output of the miner
//!
//! # Example
//!
//! ```rust,ignore
//! use basket_mining::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("datasets/retail.csv", None, &outcome);
//! let generator = ReportGenerator::new("datasets");
//! generator.write_report_to_file(&report, "retail")?;
//! ```

mod generator;
mod rules;

pub use generator::{PreprocessReport, ReportGenerator};
pub use rules::{NO_RULES_MESSAGE, RuleReport, render_rules};
