//! Basic-material filtering and entity name resolution.

use crate::models::{Ledger, LedgerSchema, Transaction};
use chrono::{Datelike, NaiveDateTime};
use std::collections::HashMap;
use tracing::debug;

/// A basic-material line with a guaranteed requisition date.
#[derive(Debug, Clone, Copy)]
pub struct BasicRow<'a> {
    pub tx: &'a Transaction,
    /// Requisition timestamp.
    pub at: NaiveDateTime,
}

/// Restrict the ledger to basic materials requisitioned in `year`.
///
/// Rows without a parseable requisition date are dropped. When the ledger
/// has no material-kind column every row is treated as basic. `year = None`
/// disables the year filter. The ledger itself is never modified.
pub fn basic_rows(ledger: &Ledger, year: Option<i32>) -> Vec<BasicRow<'_>> {
    let check_kind = ledger.schema.material_kind;

    let rows: Vec<BasicRow<'_>> = ledger
        .records
        .iter()
        .filter(|tx| !check_kind || tx.is_basic())
        .filter_map(|tx| tx.requisition_date.map(|at| BasicRow { tx, at }))
        .filter(|row| year.map_or(true, |y| row.at.year() == y))
        .collect();

    debug!(
        "Basic filter (year {:?}): {} of {} rows kept",
        year,
        rows.len(),
        ledger.len()
    );

    rows
}

/// Map each site code to its first non-missing description.
pub fn site_names(rows: &[BasicRow<'_>], schema: &LedgerSchema) -> HashMap<String, String> {
    first_descriptions(rows, schema.site_desc, |tx| {
        (tx.site.as_str(), tx.site_desc.as_deref())
    })
}

/// Map each material code to its first non-missing description.
pub fn material_names(rows: &[BasicRow<'_>], schema: &LedgerSchema) -> HashMap<String, String> {
    first_descriptions(rows, schema.material_desc, |tx| {
        (tx.material.as_str(), tx.material_desc.as_deref())
    })
}

/// First description per key in row order.
///
/// Keys whose descriptions are all missing map to an empty string; without
/// a description column the code itself is the label.
fn first_descriptions<'a, F>(
    rows: &[BasicRow<'a>],
    has_column: bool,
    key_and_desc: F,
) -> HashMap<String, String>
where
    F: Fn(&'a Transaction) -> (&'a str, Option<&'a str>),
{
    let mut names: HashMap<String, String> = HashMap::new();
    let mut resolved: HashMap<&str, bool> = HashMap::new();

    for row in rows {
        let (key, desc) = key_and_desc(row.tx);

        if !has_column {
            names.entry(key.to_string()).or_insert_with(|| key.to_string());
            continue;
        }

        let done = resolved.entry(key).or_insert(false);
        if *done {
            continue;
        }

        match desc {
            Some(desc) => {
                names.insert(key.to_string(), desc.to_string());
                *done = true;
            }
            None => {
                names.entry(key.to_string()).or_default();
            }
        }
    }

    names
}

/// Look up a resolved label, falling back to an empty string.
pub(crate) fn label(names: &HashMap<String, String>, key: &str) -> String {
    names.get(key).cloned().unwrap_or_default()
}
