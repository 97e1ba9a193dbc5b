//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.recurrence.toml` files.

use crate::analysis::PanelThresholds;
use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".recurrence.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Indicator thresholds.
    #[serde(default)]
    pub thresholds: PanelThresholds,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Year to analyse; omitted means every year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
            year: None,
        }
    }
}

fn default_output() -> String {
    "recurrence_report.md".to_string()
}

/// Ledger ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// List of basic material codes, used when the export has no
    /// `TIPO_MATERIAL` column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_codes: Option<PathBuf>,

    /// Left-pad supplier codes with zeros.
    #[serde(default = "default_true")]
    pub pad_supplier_codes: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            basic_codes: None,
            pad_supplier_codes: true,
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of materials in the top-items section.
    #[serde(default = "default_top_items")]
    pub top_items: usize,

    /// Include the full indicator tables in Markdown reports.
    #[serde(default = "default_true")]
    pub include_tables: bool,

    /// Materials (columns) in the weekly heatmap.
    #[serde(default = "default_heatmap_size")]
    pub heatmap_items: usize,

    /// Sites (rows) in the weekly heatmap.
    #[serde(default = "default_heatmap_size")]
    pub heatmap_sites: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_items: default_top_items(),
            include_tables: true,
            heatmap_items: default_heatmap_size(),
            heatmap_sites: default_heatmap_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_items() -> usize {
    15
}

fn default_heatmap_size() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject values the indicators cannot work with.
    pub fn validate(&self) -> Result<()> {
        let max_mean = self.thresholds.max_mean_quantity;
        if !max_mean.is_finite() || max_mean < 0.0 {
            bail!(
                "thresholds.max_mean_quantity must be a finite number >= 0, got {}",
                max_mean
            );
        }

        if let Some(year) = self.general.year {
            if !(1900..=2100).contains(&year) {
                bail!("general.year must be between 1900 and 2100, got {}", year);
            }
        }

        let report = &self.report;
        if report.top_items == 0 {
            bail!("report.top_items must be at least 1");
        }
        if report.heatmap_items == 0 || report.heatmap_sites == 0 {
            bail!("report.heatmap_items and report.heatmap_sites must be at least 1");
        }

        Ok(())
    }

    /// Log level for this run: quiet wins, then the merged verbose flag.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if args.year.is_some() {
            self.general.year = args.year;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref path) = args.basic_codes {
            self.input.basic_codes = Some(path.clone());
        }

        let thresholds = &mut self.thresholds;
        if let Some(n) = args.min_reqs_month {
            thresholds.min_reqs_per_month = n;
        }
        if let Some(n) = args.min_links {
            thresholds.min_links = n;
        }
        if let Some(n) = args.min_weeks {
            thresholds.min_weeks = n;
        }
        if args.consecutive_weeks {
            thresholds.require_consecutive_weeks = true;
        }
        if let Some(n) = args.min_reqs_interval {
            thresholds.min_reqs_interval = n;
        }
        if let Some(n) = args.min_orders {
            thresholds.min_orders = n;
        }
        if let Some(x) = args.max_mean_qty {
            thresholds.max_mean_quantity = x;
        }

        if let Some(n) = args.top {
            self.report.top_items = n;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "recurrence_report.md");
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert_eq!(config.general.year, None);
        assert!(config.input.pad_supplier_codes);
        assert_eq!(config.thresholds, PanelThresholds::default());
        assert_eq!(config.report.top_items, 15);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "painel.json"
format = "json"
year = 2024

[input]
basic_codes = "MateriaisBasicos.json"

[thresholds]
min_weeks = 6
max_mean_quantity = 3.5
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "painel.json");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(config.general.year, Some(2024));
        assert_eq!(
            config.input.basic_codes,
            Some(PathBuf::from("MateriaisBasicos.json"))
        );
        assert!(config.input.pad_supplier_codes);
        assert_eq!(config.thresholds.min_weeks, 6);
        assert_eq!(config.thresholds.max_mean_quantity, 3.5);
        assert_eq!(config.thresholds.min_orders, 5);
        assert!(config.report.include_tables);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[thresholds]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.thresholds, PanelThresholds::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str(
            r#"
[general]
year = 2023
output = "from_file.md"

[thresholds]
min_weeks = 8
min_orders = 3
"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "recurrence-panel",
            "--input",
            "ledger.json",
            "--year",
            "2025",
            "--min-weeks",
            "2",
            "--consecutive-weeks",
        ]);
        config.merge_with_args(&args);

        assert_eq!(config.general.year, Some(2025));
        assert_eq!(config.general.output, "from_file.md");
        assert_eq!(config.thresholds.min_weeks, 2);
        assert!(config.thresholds.require_consecutive_weeks);
        assert_eq!(config.thresholds.min_orders, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[report]\ntop_items = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.report.top_items, 5);

        fs::write(&path, "[report\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_thresholds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        for content in [
            "[thresholds]\nmax_mean_quantity = nan\n",
            "[thresholds]\nmax_mean_quantity = inf\n",
            "[thresholds]\nmax_mean_quantity = -1.0\n",
            "[report]\ntop_items = 0\n",
            "[report]\nheatmap_sites = 0\n",
            "[general]\nyear = 25\n",
        ] {
            fs::write(&path, content).unwrap();
            let err = Config::load(&path).unwrap_err();
            assert!(format!("{:#}", err).contains("Invalid config file"), "{}", content);
        }

        fs::write(&path, "[thresholds]\nmax_mean_quantity = 0.0\n").unwrap();
        assert!(Config::load(&path).is_ok());
    }

    #[test]
    fn test_validate_after_merge() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.thresholds.max_mean_quantity = f64::NAN;
        assert!(config.validate().is_err());

        let args = Args::parse_from([
            "recurrence-panel",
            "--input",
            "ledger.json",
            "--max-mean-qty",
            "4",
        ]);
        config.merge_with_args(&args);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_level_from_config_file() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let args = Args::parse_from(["recurrence-panel", "--input", "ledger.json"]);
        config.merge_with_args(&args);

        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);
        assert_eq!(Config::default().log_level(false), tracing::Level::INFO);
    }

    #[test]
    fn test_verbose_flag_raises_level() {
        let mut config = Config::default();
        let args = Args::parse_from(["recurrence-panel", "--input", "ledger.json", "-v"]);
        config.merge_with_args(&args);

        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);
    }
}
