//! Integration tests for preprocessing and rule mining.
//!
//! These tests run both stages end to end through CSV files, the way the
//! CLI chains them.

use basket_mining::mining::retain_single_temporal;
use basket_mining::types::{
    CUSTOMER_ID, DAY_OF_WEEK, INVOICE, PRICE, PRICE_CATEGORY, PRICE_LABELS, QUANTITY,
    QUANTITY_CATEGORY, QUANTITY_LABELS, STOCK_CODE, UNBINNED,
};
use basket_mining::utils::{numeric_values, string_values};
use basket_mining::{
    DayOfWeek, Item, LabelKind, MiningConfig, MiningError, NO_RULES_MESSAGE, OrderedStatistic,
    PreprocessConfig, PreprocessOutcome, Preprocessor, PriceFallback, PruneMode, PruneStrategy,
    RelationRecord, TemporalLabel, build_transactions, load_csv, mine_file, render_rules,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn retail_sample() -> PathBuf {
    fixtures_path().join("retail_sample.csv")
}

fn preprocess(input: &Path, config: PreprocessConfig) -> PreprocessOutcome {
    Preprocessor::builder()
        .config(config)
        .build()
        .expect("valid config")
        .run(input)
        .expect("preprocessing should succeed")
}

fn config_writing_to(dir: &TempDir) -> basket_mining::PreprocessConfigBuilder {
    PreprocessConfig::builder().output_path(dir.path().join("cleaned_retail.csv"))
}

fn distinct(values: Vec<Option<String>>) -> BTreeSet<String> {
    values.into_iter().flatten().collect()
}

fn product(code: &str) -> Item {
    Item::Product(code.to_string())
}

fn day(day: DayOfWeek) -> Item {
    Item::Temporal(TemporalLabel::Day(day))
}

/// Invoices I1 = {A, B} on Monday, I2 = {A, C} on Tuesday and
/// I3 = {A, B} on Monday.
const THREE_INVOICES: &str = "\
Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country
I1,A,Alpha,1,2024-01-01 09:00:00,1.00,1,United Kingdom
I1,B,Beta,1,2024-01-01 09:00:00,2.00,1,United Kingdom
I2,A,Alpha,1,2024-01-02 09:00:00,1.00,2,United Kingdom
I2,C,Gamma,1,2024-01-02 09:00:00,3.00,2,United Kingdom
I3,A,Alpha,1,2024-01-08 09:00:00,1.00,1,United Kingdom
I3,B,Beta,1,2024-01-08 09:00:00,2.00,1,United Kingdom
";

// ============================================================================
// Preprocessing
// ============================================================================

#[test]
fn test_preprocess_fixture_default_policy() {
    let dir = TempDir::new().unwrap();
    let outcome = preprocess(&retail_sample(), config_writing_to(&dir).build().unwrap());

    let summary = &outcome.summary;
    assert_eq!(summary.rows_before, 19);
    assert_eq!(summary.rows_after, 15);
    assert_eq!(summary.dropped.negative_quantity, 1);
    assert_eq!(summary.dropped.negative_price, 1);
    assert_eq!(summary.dropped.missing_keys, 1);
    assert_eq!(summary.dropped.unresolved_price, 1);
    assert_eq!(summary.prices_imputed, 2);
    assert_eq!(summary.dropped.total(), 4);

    let output = outcome.output_path.expect("output written");
    assert!(output.exists());
    assert!(outcome.report_path.is_none());
}

#[test]
fn test_cleaned_rows_hold_invariants() {
    let dir = TempDir::new().unwrap();
    let outcome = preprocess(&retail_sample(), config_writing_to(&dir).build().unwrap());

    // Read back what the miner would read
    let df = load_csv(outcome.output_path.unwrap()).unwrap();

    let quantities = numeric_values(&df, QUANTITY).unwrap();
    assert!(quantities.iter().all(|q| matches!(q, Some(q) if *q >= 0.0)));

    let prices = numeric_values(&df, PRICE).unwrap();
    assert!(prices.iter().all(|p| matches!(p, Some(p) if *p >= 0.0)));

    for column in [INVOICE, STOCK_CODE] {
        assert!(string_values(&df, column).unwrap().iter().all(Option::is_some));
    }

    let descriptions = distinct(string_values(&df, "Description").unwrap());
    assert!(descriptions.contains("No description available"));
    let countries = distinct(string_values(&df, "Country").unwrap());
    assert!(countries.contains("Unknown"));
}

#[test]
fn test_binning_partitions_rows() {
    let dir = TempDir::new().unwrap();
    let outcome = preprocess(&retail_sample(), config_writing_to(&dir).build().unwrap());
    let df = &outcome.cleaned;

    for (column, labels) in [(PRICE_CATEGORY, PRICE_LABELS), (QUANTITY_CATEGORY, QUANTITY_LABELS)] {
        let values = string_values(df, column).unwrap();
        assert_eq!(values.len(), df.height());
        assert!(values.iter().all(|v| matches!(v, Some(v) if labels.contains(&v.as_str()))));
        assert!(distinct(values).len() <= 3);
    }
}

#[test]
fn test_unbinned_policy_keeps_unresolved_rows() {
    let dir = TempDir::new().unwrap();
    let config = config_writing_to(&dir)
        .price_fallback(PriceFallback::Unbinned)
        .build()
        .unwrap();
    let outcome = preprocess(&retail_sample(), config);

    assert_eq!(outcome.summary.rows_after, 16);
    assert_eq!(outcome.summary.prices_unresolved, 1);

    let codes = string_values(&outcome.cleaned, STOCK_CODE).unwrap();
    let categories = string_values(&outcome.cleaned, PRICE_CATEGORY).unwrap();
    let mystery = codes
        .iter()
        .position(|c| c.as_deref() == Some("90210X"))
        .expect("unresolved row kept");
    assert_eq!(categories[mystery].as_deref(), Some(UNBINNED));
}

#[test]
fn test_global_median_policy_fills_every_price() {
    let dir = TempDir::new().unwrap();
    let config = config_writing_to(&dir)
        .price_fallback(PriceFallback::GlobalMedian)
        .build()
        .unwrap();
    let outcome = preprocess(&retail_sample(), config);

    assert_eq!(outcome.summary.rows_after, 16);
    assert_eq!(outcome.summary.prices_defaulted, 1);
    assert_eq!(outcome.cleaned.column(PRICE).unwrap().null_count(), 0);
}

#[test]
fn test_prune_top_customers() {
    let dir = TempDir::new().unwrap();
    let config = config_writing_to(&dir)
        .prune(PruneStrategy::Customers { count: 2 })
        .build()
        .unwrap();
    let outcome = preprocess(&retail_sample(), config);

    // Five customers survive cleaning; 13085 and 13078 have four rows each
    let customers = distinct(string_values(&outcome.cleaned, CUSTOMER_ID).unwrap());
    assert_eq!(
        customers,
        BTreeSet::from(["13078".to_string(), "13085".to_string()])
    );
    assert_eq!(outcome.summary.rows_after, 8);
    assert_eq!(outcome.summary.dropped.pruned, 7);
    assert!(outcome.summary.pruning.is_some());
}

#[test]
fn test_prune_random_customers_is_seeded() {
    let run = || {
        let dir = TempDir::new().unwrap();
        let config = config_writing_to(&dir)
            .prune(PruneStrategy::Customers { count: 2 })
            .prune_mode(PruneMode::Random)
            .seed(42)
            .build()
            .unwrap();
        distinct(string_values(&preprocess(&retail_sample(), config).cleaned, CUSTOMER_ID).unwrap())
    };

    let first = run();
    assert_eq!(first.len(), 2);
    assert_eq!(first, run());
}

#[test]
fn test_prune_date_window_keeps_recent_days() {
    let dir = TempDir::new().unwrap();
    let config = config_writing_to(&dir)
        .prune(PruneStrategy::DateWindow { days: 1 })
        .build()
        .unwrap();
    let outcome = preprocess(&retail_sample(), config);

    // Latest surviving invoice is 2009-12-08 20:15, so the window starts
    // on 2009-12-07 20:15 and only the Tuesday invoices remain
    let days = distinct(string_values(&outcome.cleaned, DAY_OF_WEEK).unwrap());
    assert_eq!(days, BTreeSet::from(["Tuesday".to_string()]));
    assert_eq!(outcome.summary.rows_after, 2);
}

#[test]
fn test_emit_report_writes_next_to_output() {
    let dir = TempDir::new().unwrap();
    let config = config_writing_to(&dir).emit_report(true).build().unwrap();
    let outcome = preprocess(&retail_sample(), config);

    let report_path = outcome.report_path.expect("report written");
    assert_eq!(report_path, dir.path().join("retail_sample_report.json"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["rows_after"], 15);
    assert!(report["category_counts"]["DayOfWeek"]["Tuesday"].is_number());
}

#[test]
fn test_missing_column_is_fatal_and_named() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("no_country.csv");
    fs::write(
        &input,
        "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID\n\
         489434,85048,LIGHTS,12,2009-12-01 07:45:00,6.95,13085.0\n",
    )
    .unwrap();

    let err = Preprocessor::builder()
        .config(config_writing_to(&dir).build().unwrap())
        .build()
        .unwrap()
        .run(&input)
        .unwrap_err();

    assert!(matches!(err, MiningError::ColumnNotFound(ref column) if column == "Country"));
    assert!(!dir.path().join("cleaned_retail.csv").exists());
}

// ============================================================================
// Mining
// ============================================================================

#[test]
fn test_three_invoice_scenario_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("retail.csv");
    fs::write(&input, THREE_INVOICES).unwrap();

    let outcome = preprocess(&input, config_writing_to(&dir).build().unwrap());
    let cleaned = outcome.output_path.unwrap();

    let config = MiningConfig::builder().min_support(0.5).build().unwrap();
    let mined = mine_file(&cleaned, &config).unwrap();

    assert_eq!(mined.transactions, 3);
    let expected = vec![product("A"), product("B"), day(DayOfWeek::Monday)];
    let rule = mined
        .rules
        .iter()
        .find(|rule| rule.items == expected)
        .expect("rule with A, B and Monday");
    assert!((rule.support - 2.0 / 3.0).abs() < 1e-9);

    let text = render_rules(&mined.rules);
    assert!(text.contains("Rule: ['A', 'B', 'Monday'] | Support: 0.6667"));
}

#[test]
fn test_rule_with_two_days_is_excluded() {
    let kept = RelationRecord {
        items: vec![product("A"), day(DayOfWeek::Monday)],
        support: 0.5,
        ordered_statistics: vec![OrderedStatistic {
            items_base: vec![],
            items_add: vec![product("A"), day(DayOfWeek::Monday)],
            confidence: 0.5,
            lift: 1.0,
        }],
    };
    let colliding = RelationRecord {
        items: vec![product("A"), day(DayOfWeek::Monday), day(DayOfWeek::Tuesday)],
        ..kept.clone()
    };
    let no_label = RelationRecord {
        items: vec![product("A"), product("B")],
        ..kept.clone()
    };

    let retained = retain_single_temporal(vec![kept.clone(), colliding, no_label.clone()]);
    assert_eq!(retained, vec![kept, no_label]);
}

#[test]
fn test_transactions_deduplicate_products() {
    let dir = TempDir::new().unwrap();
    let outcome = preprocess(&retail_sample(), config_writing_to(&dir).build().unwrap());

    let transactions = build_transactions(&outcome.cleaned, LabelKind::DayOfWeek).unwrap();
    let invoice = transactions
        .iter()
        .find(|t| t.invoice == "489436")
        .expect("invoice 489436");
    assert_eq!(
        invoice.items,
        vec![product("22064"), product("21871"), day(DayOfWeek::Tuesday)]
    );
    for transaction in &transactions {
        assert_eq!(transaction.temporal_count(), 1);
    }
}

#[test]
fn test_mined_rules_carry_at_most_one_label() {
    let dir = TempDir::new().unwrap();
    let outcome = preprocess(&retail_sample(), config_writing_to(&dir).build().unwrap());

    let config = MiningConfig::builder()
        .min_support(0.1)
        .min_confidence(0.1)
        .label(LabelKind::TimeOfDay)
        .build()
        .unwrap();
    let mined = mine_file(outcome.output_path.unwrap(), &config).unwrap();

    assert_eq!(mined.transactions, 9);
    assert!(!mined.rules.is_empty());
    assert!(mined.rules.len() <= 15);
    for rule in &mined.rules {
        assert!(rule.items.iter().filter(|item| item.is_temporal()).count() <= 1);
    }
}

#[test]
fn test_no_rules_prints_diagnostic() {
    let dir = TempDir::new().unwrap();
    let outcome = preprocess(&retail_sample(), config_writing_to(&dir).build().unwrap());

    let config = MiningConfig::builder().min_support(0.9).build().unwrap();
    let mined = mine_file(outcome.output_path.unwrap(), &config).unwrap();

    assert!(mined.rules.is_empty());
    assert_eq!(render_rules(&mined.rules).trim_end(), NO_RULES_MESSAGE);
}

#[test]
fn test_mining_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = mine_file(dir.path().join("absent.csv"), &MiningConfig::default()).unwrap_err();
    assert_eq!(err.error_code(), "IO_ERROR");
}
