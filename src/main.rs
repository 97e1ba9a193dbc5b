//! Recurrence Panel - recurring requisitions of basic materials
//!
//! A CLI tool that reads a requisition ledger export and reports which
//! basic materials are requisitioned repeatedly at construction sites.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad input, invalid arguments, unwritable output)

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use recurrence_panel::cli::{Args, OutputFormat};
use recurrence_panel::config::{Config, DEFAULT_CONFIG_FILE};
use recurrence_panel::ledger::{self, LoadOptions, LoadStats};
use recurrence_panel::models::{Ledger, RecurrencePanel, Report, ReportMetadata};
use recurrence_panel::{analysis, report};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can raise verbosity
    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("Recurrence Panel v{}", env!("CARGO_PKG_VERSION"));
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    debug!("Arguments: {:?}", args);
    debug!("Effective config: {:?}", config);

    if let Err(e) = run(args, config).await {
        error!("Panel failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .recurrence.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the year, thresholds and report options.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Spinner shown while loading and computing; hidden in quiet mode.
fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Run the complete workflow: load, compute, render, write.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let input = args
        .input
        .clone()
        .context("No input path given (use --input)")?;
    let year = config.general.year;
    let quiet = args.quiet;

    // Step 1: Load the ledger
    if !quiet {
        println!("📥 Reading ledger: {}", input.display());
    }
    let pb = spinner(quiet);
    pb.set_message("Loading ledger...");

    let (ledger, stats) = load(&input, &config).await?;
    let basic_rows = analysis::basic_rows(&ledger, year).len();
    info!("{} basic rows in scope for {}", basic_rows, year_label(year));
    if basic_rows == 0 {
        warn!("No basic-material rows with a date in scope; every table will be empty");
    }

    // Step 2: Compute the panel
    pb.set_message("Computing indicators...");
    let panel = analysis::recurrence_panel_concurrent(Arc::new(ledger), year, config.thresholds)
        .await
        .context("Indicator computation failed")?;
    pb.finish_and_clear();

    // Step 3: Build the report
    let report_config = &config.report;
    let top_items = analysis::top_monthly_items(&panel.monthly, report_config.top_items);
    let top_subsequent = analysis::top_subsequent_items(&panel.subsequent, report_config.top_items);
    let top_low_quantity =
        analysis::top_low_quantity_items(&panel.low_quantity, report_config.top_items);
    let weekly_heatmap = analysis::weekly_heatmap(
        &panel.weekly,
        report_config.heatmap_items,
        report_config.heatmap_sites,
    );
    let site_detail = match args.site {
        Some(ref site) => {
            let detail = analysis::site_monthly_detail(&panel.monthly, site.trim());
            if detail.is_none() {
                warn!("Site {} has no monthly recurrence rows", site);
            }
            detail
        }
        None => None,
    };

    let report = Report {
        metadata: ReportMetadata {
            input: input.display().to_string(),
            year,
            generated_at: Utc::now(),
            files_read: stats.files,
            rows_loaded: stats.rows,
            rows_rejected: stats.rejected,
            basic_rows,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        panel,
        top_items,
        weekly_heatmap,
        top_subsequent,
        top_low_quantity,
        site_detail,
    };

    // Step 4: Render and save
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, report_config.include_tables)
        }
    };

    let output_path = PathBuf::from(&config.general.output);
    tokio::fs::write(&output_path, &output)
        .await
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if let Some(ref dir) = args.csv_dir {
        let written = report::write_csv_tables(&report.panel, dir)?;
        info!("Wrote {} CSV tables to {}", written.len(), dir.display());
    }

    if !quiet {
        print_summary(&report.panel, &stats, year, &output_path, start_time);
    }

    Ok(())
}

/// Discover the input files and load them into a ledger.
async fn load(input: &Path, config: &Config) -> Result<(Ledger, LoadStats)> {
    let files = ledger::discover_inputs(input)?;
    debug!("Input files: {:?}", files);

    let basic_codes = match config.input.basic_codes {
        Some(ref path) => {
            let codes = ledger::load_basic_codes(path)?;
            info!("Loaded {} basic material codes from {}", codes.len(), path.display());
            Some(codes)
        }
        None => None,
    };

    let options = LoadOptions {
        basic_codes,
        pad_supplier_codes: config.input.pad_supplier_codes,
    };

    let (ledger, stats) = ledger::load_ledger(&files, &options).await?;
    if !ledger.schema.material_kind {
        warn!("No TIPO_MATERIAL column and no basic-codes list; every row is treated as basic");
    }

    Ok((ledger, stats))
}

fn year_label(year: Option<i32>) -> String {
    year.map(|y| y.to_string())
        .unwrap_or_else(|| "all years".to_string())
}

fn print_summary(
    panel: &RecurrencePanel,
    stats: &LoadStats,
    year: Option<i32>,
    output_path: &Path,
    start_time: Instant,
) {
    println!("\n📊 Panel Summary ({}):", year_label(year));
    println!(
        "   Rows: {} loaded from {} file(s), {} rejected",
        stats.rows, stats.files, stats.rejected
    );
    for (indicator, count) in panel.summary.entries() {
        println!("   - {}: {}", indicator, count);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", output_path.display());
}

/// Load configuration from file or use defaults, merged with the CLI flags
/// and validated. Also returns the file it came from, if any.
///
/// Runs before logging is set up, so problems go to stderr directly.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    let (mut config, source) = match args.config {
        // Try explicit config path
        Some(ref config_path) => (Config::load(config_path)?, Some(config_path.clone())),
        // Try default location
        None => match Config::load_default() {
            Ok(Some(config)) => (config, Some(PathBuf::from(DEFAULT_CONFIG_FILE))),
            Ok(None) => (Config::default(), None),
            Err(e) => {
                eprintln!("Warning: failed to load config: {:#}", e);
                (Config::default(), None)
            }
        },
    };

    config.merge_with_args(args);
    config.validate().context("Invalid configuration")?;

    Ok((config, source))
}
