use crate::error::Result;
use crate::pipeline::PreprocessOutcome;
use crate::types::{DAY_OF_WEEK, PRICE_CATEGORY, PreprocessSummary, QUANTITY_CATEGORY, TIME_CATEGORY};
use crate::utils::{has_column, string_values};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Report Types
// ============================================================================

/// JSON report of one preprocessing run.
///
/// Used both for `--emit-report` files and for library callers that want
/// a serializable view of a [`PreprocessOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessReport {
    // Metadata
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the cleaned file (if written)
    pub output_file: Option<String>,

    /// Row counts, imputation counts and bin edges
    pub summary: PreprocessSummary,
    /// Percentage of loaded rows removed
    pub rows_removed_percent: f64,

    /// Cleaning actions performed
    pub cleaning_actions: Vec<String>,
    /// Later processing steps (imputation, pruning, derivation, binning)
    pub processing_steps: Vec<String>,

    /// Row count per label of every derived categorical column
    pub category_counts: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Builds and writes [`PreprocessReport`]s.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Assemble the report for a finished run.
    pub fn build_report(
        input_file: &str,
        output_file: Option<&str>,
        outcome: &PreprocessOutcome,
    ) -> PreprocessReport {
        PreprocessReport {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.to_string(),
            output_file: output_file.map(String::from),
            summary: outcome.summary.clone(),
            rows_removed_percent: outcome.summary.rows_removed_percentage(),
            cleaning_actions: outcome.cleaning_actions.clone(),
            processing_steps: outcome.processing_steps.clone(),
            category_counts: category_counts(&outcome.cleaned),
        }
    }

    /// Write a report to `<output_dir>/<base_name>_report.json`.
    pub fn write_report_to_file(
        &self,
        report: &PreprocessReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }

    /// Directory reports are written to for a given cleaned file.
    pub fn for_output(output_path: &Path) -> Self {
        let dir = output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(dir)
    }
}

fn category_counts(df: &DataFrame) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for column in [TIME_CATEGORY, DAY_OF_WEEK, PRICE_CATEGORY, QUANTITY_CATEGORY] {
        if !has_column(df, column) {
            continue;
        }
        match string_values(df, column) {
            Ok(values) => {
                let mut per_label: BTreeMap<String, usize> = BTreeMap::new();
                for value in values.into_iter().flatten() {
                    *per_label.entry(value).or_default() += 1;
                }
                counts.insert(column.to_string(), per_label);
            }
            Err(e) => warn!("Could not count categories of {}: {}", column, e),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DroppedRows;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn outcome() -> PreprocessOutcome {
        let cleaned = df![
            "TimeCategory" => ["Morning", "Morning", "Evening"],
            "PriceCategory" => ["Cheap", "Expensive", "Unbinned"],
        ]
        .unwrap();
        let summary = PreprocessSummary {
            rows_before: 4,
            rows_after: 3,
            dropped: DroppedRows {
                negative_quantity: 1,
                ..DroppedRows::default()
            },
            ..PreprocessSummary::default()
        };
        PreprocessOutcome {
            cleaned,
            summary,
            cleaning_actions: vec!["Removed 1 rows with negative quantity (returns)".to_string()],
            processing_steps: Vec::new(),
            output_path: None,
            report_path: None,
        }
    }

    #[test]
    fn test_build_report_counts_categories() {
        let report = ReportGenerator::build_report("retail.csv", Some("clean.csv"), &outcome());

        assert_eq!(report.rows_removed_percent, 25.0);
        assert_eq!(report.category_counts["TimeCategory"]["Morning"], 2);
        assert_eq!(report.category_counts["PriceCategory"]["Unbinned"], 1);
        assert!(!report.category_counts.contains_key("DayOfWeek"));
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path());
        let report = ReportGenerator::build_report("retail.csv", None, &outcome());

        let path = generator.write_report_to_file(&report, "retail").unwrap();

        assert_eq!(path.file_name().unwrap(), "retail_report.json");
        let parsed: PreprocessReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.summary.rows_after, 3);
    }

    #[test]
    fn test_for_output_uses_parent_directory() {
        let generator = ReportGenerator::for_output(Path::new("datasets/cleaned_retail.csv"));
        assert_eq!(generator.output_dir, PathBuf::from("datasets"));
        let bare = ReportGenerator::for_output(Path::new("cleaned.csv"));
        assert_eq!(bare.output_dir, PathBuf::from("."));
    }
}
