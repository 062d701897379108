//! CLI entry point for the missing-value imputation engine.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lex_impute::{
    ImputationPipeline, ImputationPlan, ImputationType, ImputeConfig, ImputeOutcome,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Missing-value imputation with missingness indicators",
    long_about = "Fills missing cells in a CSV table, appends 0/1 missingness indicators \
                  and records a plan that can be replayed on new data.\n\n\
                  EXAMPLES:\n  \
                  # Median/mode imputation, combined table to stdout summary\n  \
                  lex-impute -i train.csv -o train_imputed.csv --plan-out plan.json\n\n  \
                  # Replay the same plan on held-out data\n  \
                  lex-impute -i test.csv -o test_imputed.csv --plan-in plan.json\n\n  \
                  # KNN imputation, keeping the id column untouched\n  \
                  lex-impute -i data.csv --type knn --skip id"
)]
struct Args {
    /// Path to the CSV file to impute
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the combined (imputed + indicators) table as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Imputation strategy (standard, knn)
    #[arg(long = "type", default_value = "standard")]
    imputation_type: ImputationType,

    /// Prefix for indicator column names
    #[arg(long, default_value = lex_impute::DEFAULT_PREFIX)]
    prefix: String,

    /// Column to leave untouched (repeatable)
    #[arg(long = "skip", value_name = "COLUMN")]
    skip_vars: Vec<String>,

    /// Compute fill values for every column, not only those with missing values
    #[arg(long)]
    all_vars: bool,

    /// Do not build missingness indicators
    #[arg(long)]
    no_indicators: bool,

    /// Keep indicators that are all 0 or all 1
    #[arg(long)]
    keep_constant: bool,

    /// Keep indicators identical to an earlier indicator
    #[arg(long)]
    keep_collinear: bool,

    /// Number of neighbors for KNN imputation
    #[arg(long, default_value_t = lex_impute::DEFAULT_KNN_NEIGHBORS)]
    knn_neighbors: usize,

    /// Replay a plan written by an earlier run instead of fitting a new one
    #[arg(long, value_name = "JSON")]
    plan_in: Option<PathBuf>,

    /// Write the plan of this run as JSON
    #[arg(long, value_name = "JSON")]
    plan_out: Option<PathBuf>,

    /// Log each processing step at info level
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,

    /// Print the outcome summary as JSON to stdout
    ///
    /// Disables all logs so stdout only carries the JSON document.
    #[arg(long)]
    json: bool,
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
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    info!("Loading dataset from: {}", args.input.display());
    let data = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let config = build_config(&args)?;
    let pipeline = ImputationPipeline::builder().config(config).build()?;

    let outcome = match &args.plan_in {
        Some(path) => {
            let plan: ImputationPlan = ImputationPlan::load_json(path)
                .with_context(|| format!("Failed to read plan {}", path.display()))?;
            info!("Replaying {} plan from {}", plan.imputation_type(), path.display());
            pipeline.replay(&plan, data)
        }
        None => pipeline.process(data),
    }
    .map_err(|e| {
        error!("Imputation failed: {}", e);
        anyhow!("Imputation failed: {}", e)
    })?;

    if let Some(path) = &args.plan_out {
        outcome
            .plan
            .save_json(path)
            .with_context(|| format!("Failed to write plan {}", path.display()))?;
        info!("Plan written to: {}", path.display());
    }

    if let Some(path) = &args.output {
        let mut combined = outcome.combined.clone();
        write_csv(&mut combined, path)?;
        info!("Dataset saved: {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary())?);
        return Ok(());
    }

    print_human_readable_summary(&outcome, &args);
    Ok(())
}

fn build_config(args: &Args) -> Result<ImputeConfig> {
    let config = ImputeConfig::builder()
        .imputation_type(args.imputation_type)
        .prefix(&args.prefix)
        .skip_vars(args.skip_vars.iter().cloned())
        .all_vars(args.all_vars)
        .add_indicators(!args.no_indicators)
        .remove_constant(!args.keep_constant)
        .remove_collinear(!args.keep_collinear)
        .knn_neighbors(args.knn_neighbors)
        .verbose(args.verbose)
        .build()?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV {}", path.display()))?;
    Ok(df)
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;
    Ok(())
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` intentionally: this is the primary CLI output and should
/// not depend on the log level.
fn print_human_readable_summary(outcome: &ImputeOutcome, args: &Args) {
    let summary = outcome.summary();

    println!();
    println!("{}", "=".repeat(80));
    println!("IMPUTATION COMPLETE ({})", summary.imputation_type);
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {}", args.input.display());
    match &args.output {
        Some(path) => println!(
            "Output: {} ({} rows x {} columns)",
            path.display(),
            summary.rows,
            summary.columns
        ),
        None => println!(
            "Output: not written ({} rows x {} columns)",
            summary.rows, summary.columns
        ),
    }
    println!();

    if summary.missing_columns.is_empty() {
        println!("No missing values found.");
    } else {
        println!("Columns with missing values: {}", summary.missing_columns.join(", "));
    }
    if !summary.indicator_columns.is_empty() {
        println!("Indicators added: {}", summary.indicator_columns.join(", "));
    }

    if let Some(values) = &summary.fill_values {
        if !values.is_empty() {
            println!();
            println!("Fill values:");
            for (column, value) in values {
                println!("  {:<30} {}", column, value);
            }
        }
    }

    if summary.remaining_missing > 0 {
        warn!(
            "{} missing cell(s) could not be imputed",
            summary.remaining_missing
        );
    }

    if !summary.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }

    if !summary.processing_steps.is_empty() {
        println!();
        println!("Steps:");
        for step in &summary.processing_steps {
            println!("  - {}", step);
        }
    }
    println!();
}
