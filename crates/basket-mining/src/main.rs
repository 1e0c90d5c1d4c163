//! CLI entry point for retail preprocessing and rule mining.

use anyhow::{Result, anyhow};
use basket_mining::{
    LabelKind, MiningConfig, PreprocessConfig, PreprocessOutcome, Preprocessor, PriceFallback,
    PruneMode, PruneStrategy, RuleOrder, RuleReport, mine_file, render_rules,
};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::Path;
use tracing::{error, info};

/// CLI-compatible pruning dimension enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPrune {
    /// Keep a window of N days
    Date,
    /// Keep the rows of N customers
    Customers,
    /// Keep the rows of N invoices
    Invoices,
}

impl CliPrune {
    fn with_size(self, size: usize) -> PruneStrategy {
        match self {
            CliPrune::Date => PruneStrategy::DateWindow {
                days: u32::try_from(size).unwrap_or(u32::MAX),
            },
            CliPrune::Customers => PruneStrategy::Customers { count: size },
            CliPrune::Invoices => PruneStrategy::Invoices { count: size },
        }
    }
}

/// CLI-compatible price fallback enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPriceFallback {
    /// Drop rows whose price cannot be imputed
    Drop,
    /// Fill with the median of every known price
    GlobalMedian,
    /// Keep the row and label its price category "Unbinned"
    Unbinned,
}

impl From<CliPriceFallback> for PriceFallback {
    fn from(cli: CliPriceFallback) -> Self {
        match cli {
            CliPriceFallback::Drop => PriceFallback::DropRow,
            CliPriceFallback::GlobalMedian => PriceFallback::GlobalMedian,
            CliPriceFallback::Unbinned => PriceFallback::Unbinned,
        }
    }
}

/// CLI-compatible rule ordering enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSortBy {
    /// Keep the order in which rules were discovered
    Discovery,
    Support,
    Confidence,
    Lift,
}

impl From<CliSortBy> for RuleOrder {
    fn from(cli: CliSortBy) -> Self {
        match cli {
            CliSortBy::Discovery => RuleOrder::Discovery,
            CliSortBy::Support => RuleOrder::Support,
            CliSortBy::Confidence => RuleOrder::Confidence,
            CliSortBy::Lift => RuleOrder::Lift,
        }
    }
}

/// CLI-compatible temporal label enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLabel {
    /// Monday .. Sunday
    DayOfWeek,
    /// Morning, Afternoon, Evening or Night
    TimeOfDay,
}

impl From<CliLabel> for LabelKind {
    fn from(cli: CliLabel) -> Self {
        match cli {
            CliLabel::DayOfWeek => LabelKind::DayOfWeek,
            CliLabel::TimeOfDay => LabelKind::TimeOfDay,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Retail basket preprocessing and association rule mining",
    long_about = "Cleans an online retail export and mines association rules between\n\
                  products and the day or time they were bought.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RUST_LOG    Overrides the log filter (may be set in .env)\n\n\
                  EXAMPLES:\n  \
                  # Clean the raw export, keeping the 100 busiest customers\n  \
                  basket-mining preprocess -i datasets/retail.csv --prune customers --prune-size 100\n\n  \
                  # Mine the cleaned file, strongest lift first\n  \
                  basket-mining mine --min-support 0.03 --sort-by lift\n\n  \
                  # Mine against time-of-day labels and print JSON\n  \
                  basket-mining mine --label time-of-day --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean a raw retail export into the dataset the miner reads
    Preprocess(PreprocessArgs),
    /// Mine association rules from a cleaned dataset
    Mine(MineArgs),
}

#[derive(clap::Args, Debug)]
struct LogArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and results)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args, Debug)]
struct PreprocessArgs {
    /// Path to the raw CSV export
    #[arg(short, long, default_value = "datasets/retail.csv")]
    input: String,

    /// Path of the cleaned CSV to write
    #[arg(short, long, default_value = basket_mining::config::DEFAULT_CLEANED_PATH)]
    output: String,

    /// Prune the dataset along one dimension before deriving features
    #[arg(long, value_enum, requires = "prune_size")]
    prune: Option<CliPrune>,

    /// Window size for --prune (days, customers or invoices)
    #[arg(long, requires = "prune")]
    prune_size: Option<usize>,

    /// Pick the pruning window at random instead of the top one
    #[arg(long, requires = "prune")]
    random: bool,

    /// Seed for --random
    #[arg(long, requires = "random")]
    seed: Option<u64>,

    /// What to do with prices that cannot be imputed from the same product
    #[arg(long, value_enum, default_value = "drop")]
    price_fallback: CliPriceFallback,

    /// Write a JSON report next to the cleaned file
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(clap::Args, Debug)]
struct MineArgs {
    /// Path to the cleaned CSV
    #[arg(short, long, default_value = basket_mining::config::DEFAULT_CLEANED_PATH)]
    input: String,

    /// Minimum itemset support (0.0 exclusive - 1.0)
    #[arg(long, default_value = "0.02")]
    min_support: f64,

    /// Minimum rule confidence (0.0 - 1.0)
    #[arg(long, default_value = "0.2")]
    min_confidence: f64,

    /// Minimum rule lift
    #[arg(long, default_value = "1.0")]
    min_lift: f64,

    /// Smallest itemset length reported
    #[arg(long, default_value = "2")]
    min_length: usize,

    /// Largest itemset length explored
    #[arg(long)]
    max_length: Option<usize>,

    /// Number of rules reported
    #[arg(long, default_value = "15")]
    top: usize,

    /// Ordering applied before taking the top rules
    #[arg(long, value_enum, default_value = "discovery")]
    sort_by: CliSortBy,

    /// Temporal label appended to each invoice
    #[arg(long, value_enum, default_value = "day-of-week")]
    label: CliLabel,

    /// Output JSON to stdout instead of the text rule list
    ///
    /// Disables all logs; only the final JSON report is printed.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    log: LogArgs,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load environment variables from .env file so RUST_LOG can live there
    dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Preprocess(args) => {
            init_logging(&args.log.log_level, args.log.quiet, false);
            run_preprocess(&args)
        }
        Command::Mine(args) => {
            init_logging(&args.log.log_level, args.log.quiet, args.json);
            run_mine(&args)
        }
    }
}

fn run_preprocess(args: &PreprocessArgs) -> Result<()> {
    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let mut builder = PreprocessConfig::builder()
        .output_path(&args.output)
        .price_fallback(args.price_fallback.into())
        .emit_report(args.emit_report);

    if let (Some(prune), Some(size)) = (args.prune, args.prune_size) {
        builder = builder.prune(prune.with_size(size));
        if args.random {
            builder = builder.prune_mode(PruneMode::Random);
        }
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    let config = builder.build()?;

    let mut preprocessor = Preprocessor::builder().config(config);
    if !args.log.quiet {
        preprocessor = preprocessor.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    info!("{}", "=".repeat(80));
    info!("Starting preprocessing of {}", args.input);
    info!("{}", "=".repeat(80));

    match preprocessor.build()?.run(&args.input) {
        Ok(outcome) => {
            print_preprocess_summary(&outcome, args);
            Ok(())
        }
        Err(e) => {
            error!("Preprocessing failed: {}", e);
            Err(anyhow!("Preprocessing failed: {}", e))
        }
    }
}

fn run_mine(args: &MineArgs) -> Result<()> {
    if !Path::new(&args.input).exists() {
        return Err(anyhow!(
            "Input file not found: {} (run `basket-mining preprocess` first)",
            args.input
        ));
    }

    let mut builder = MiningConfig::builder()
        .min_support(args.min_support)
        .min_confidence(args.min_confidence)
        .min_lift(args.min_lift)
        .min_length(args.min_length)
        .top_n(args.top)
        .order(args.sort_by.into())
        .label(args.label.into());
    if let Some(max_length) = args.max_length {
        builder = builder.max_length(max_length);
    }
    let config = builder.build()?;

    info!("Mining rules from {}", args.input);
    let outcome = match mine_file(&args.input, &config) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Mining failed: {}", e);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            return Err(anyhow!("Mining failed: {}", e));
        }
    };

    if args.json {
        let report = RuleReport::new(&args.input, &config, &outcome);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    info!(
        "{} transactions, {} rules mined, {} after the temporal filter ({}ms)",
        outcome.transactions, outcome.rules_mined, outcome.rules_retained, outcome.duration_ms
    );
    print!("{}", render_rules(&outcome.rules));
    Ok(())
}

/// Print a human-readable summary of the preprocessing results.
fn print_preprocess_summary(outcome: &PreprocessOutcome, args: &PreprocessArgs) {
    let summary = &outcome.summary;
    let dropped = &summary.dropped;

    println!();
    println!("{}", "=".repeat(80));
    println!("PREPROCESSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows)", args.input, summary.rows_before);
    println!("Output: {} ({} rows)", args.output, summary.rows_after);
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({:.1}% removed)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed_percentage()
    );
    println!("  Returns dropped: {}", dropped.negative_quantity);
    println!("  Negative prices dropped: {}", dropped.negative_price);
    println!("  Missing keys dropped: {}", dropped.missing_keys);
    println!("  Unresolved prices dropped: {}", dropped.unresolved_price);
    println!(
        "  Prices imputed: {} (product median), {} (global median), {} left unbinned",
        summary.prices_imputed, summary.prices_defaulted, summary.prices_unresolved
    );
    if let Some(ref pruning) = summary.pruning {
        println!("  Pruning: {} ({} rows removed)", pruning, dropped.pruned);
    }
    println!("  Price edges: {:?}", summary.price_edges);
    println!("  Quantity edges: {:?}", summary.quantity_edges);

    if !summary.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }

    if let Some(ref report_path) = outcome.report_path {
        println!();
        println!("Report: {}", report_path.display());
    }

    println!();
    println!("{}", "=".repeat(80));
}
