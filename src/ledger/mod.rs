//! Ledger ingestion.
//!
//! Reads requisition exports into a typed [`Ledger`](crate::models::Ledger),
//! coercing cells and rejecting rows that lack a site or material code.

pub mod loader;
pub mod scanner;
pub mod workbook;

use std::path::PathBuf;
use thiserror::Error;

pub use loader::{build_ledger, load_basic_codes, load_ledger, parse_rows, LoadOptions, LoadStats};
pub use scanner::{discover_inputs, InputFormat};
pub use workbook::read_workbook_rows;

/// Errors raised while reading ledger input.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path} at line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON array of row objects in {0}")]
    InvalidShape(PathBuf),

    #[error("Failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Workbook {0} has no sheets")]
    EmptyWorkbook(PathBuf),

    #[error("Unsupported input format: {0} (expected .json, .jsonl, .ndjson, .xlsx, .xlsm or .xls)")]
    UnsupportedFormat(PathBuf),

    #[error("No input files found under {0}")]
    NoInput(PathBuf),

    #[error("Failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Workbook reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
