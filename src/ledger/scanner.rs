//! Input discovery for ledger exports.
//!
//! An input path is either a single export file or a directory of exports
//! (e.g. one file per month), walked recursively.

use super::LedgerError;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// A JSON array of row objects.
    Json,
    /// One JSON row object per line.
    JsonLines,
    /// An Excel workbook with a header row.
    Workbook,
}

impl InputFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::JsonLines),
            "xlsx" | "xlsm" | "xls" => Some(InputFormat::Workbook),
            _ => None,
        }
    }
}

/// Check if a directory entry is hidden or an Excel lock file.
fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name.starts_with("~$"))
        .unwrap_or(false)
}

/// Resolve `root` to the list of export files to load, in path order.
pub fn discover_inputs(root: &Path) -> Result<Vec<PathBuf>, LedgerError> {
    let metadata = std::fs::metadata(root).map_err(|source| LedgerError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    if metadata.is_file() {
        if InputFormat::from_path(root).is_none() {
            return Err(LedgerError::UnsupportedFormat(root.to_path_buf()));
        }
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if InputFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        } else {
            debug!("Skipping non-export file: {}", entry.path().display());
        }
    }

    if files.is_empty() {
        return Err(LedgerError::NoInput(root.to_path_buf()));
    }

    files.sort();
    Ok(files)
}
