//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Options left unset fall back to the
//! configuration file and then to built-in defaults.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recurrence Panel - recurring requisitions of basic materials
///
/// Reads a requisition ledger export and reports which basic materials are
/// requisitioned repeatedly: several times a month, in back-to-back
/// requisitions, week after week, at short intervals, or in small
/// quantities at high frequency.
///
/// Examples:
///   recurrence-panel --input requisicoes.json --year 2025
///   recurrence-panel --input exports/ --format json --output painel.json
///   recurrence-panel --input requisicoes.jsonl --basic-codes basicos.txt
///   recurrence-panel --input requisicoes.json --site 101 --csv-dir tabelas/
///   recurrence-panel --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Ledger export to analyse
    ///
    /// A .json file (array of rows), a .jsonl/.ndjson file (one row per
    /// line), or a directory of such files.
    #[arg(
        short,
        long,
        value_name = "PATH",
        required_unless_present = "init_config"
    )]
    pub input: Option<PathBuf>,

    /// Year to analyse
    ///
    /// If not specified, uses the config file value or every year.
    #[arg(short, long, value_name = "YYYY", env = "RECURRENCE_YEAR")]
    pub year: Option<i32>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .recurrence.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List of basic material codes
    ///
    /// Used to classify rows when the export has no TIPO_MATERIAL column.
    /// A JSON array or a text file with one code per line.
    #[arg(long, value_name = "FILE")]
    pub basic_codes: Option<PathBuf>,

    /// Add a monthly recurrence detail section for one site
    #[arg(long, value_name = "CODE")]
    pub site: Option<String>,

    /// Also write every indicator table as CSV into this directory
    #[arg(long, value_name = "DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Number of materials in the top-items section
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Minimum distinct requisitions per site and month
    #[arg(long, value_name = "N")]
    pub min_reqs_month: Option<usize>,

    /// Minimum links between consecutive requisitions
    #[arg(long, value_name = "N")]
    pub min_links: Option<usize>,

    /// Minimum distinct ISO weeks per site and material
    #[arg(long, value_name = "N")]
    pub min_weeks: Option<usize>,

    /// Apply --min-weeks to the longest run of consecutive weeks
    #[arg(long)]
    pub consecutive_weeks: bool,

    /// Minimum distinct requisition days for interval statistics
    #[arg(long, value_name = "N")]
    pub min_reqs_interval: Option<usize>,

    /// Minimum order lines for a low-quantity item
    #[arg(long, value_name = "N")]
    pub min_orders: Option<usize>,

    /// Maximum mean ordered quantity for a low-quantity item
    #[arg(long, value_name = "QTY")]
    pub max_mean_qty: Option<f64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .recurrence.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
        }

        if let Some(year) = self.year {
            if !(1900..=2100).contains(&year) {
                return Err("Year must be between 1900 and 2100".to_string());
            }
        }

        if self.top == Some(0) {
            return Err("Top items must be at least 1".to_string());
        }

        if let Some(qty) = self.max_mean_qty {
            if !qty.is_finite() || qty < 0.0 {
                return Err("Maximum mean quantity must be a non-negative number".to_string());
            }
        }

        if let Some(ref site) = self.site {
            if site.trim().is_empty() {
                return Err("Site code cannot be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }
}
