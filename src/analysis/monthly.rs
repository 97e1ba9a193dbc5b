//! Basic materials requisitioned repeatedly within a calendar month.

use super::filter::{basic_rows, label, material_names, site_names, BasicRow};
use crate::models::{Ledger, MonthlyRecurrence};
use chrono::Datelike;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Count distinct requisitions per site, calendar month and material.
///
/// Keeps groups with at least `min_reqs_per_month` requisitions, sorted by
/// site, then month, then count (highest first). Returns an empty table when
/// the ledger has no requisition column or nothing matches.
pub fn monthly_recurrence(
    ledger: &Ledger,
    year: Option<i32>,
    min_reqs_per_month: usize,
) -> Vec<MonthlyRecurrence> {
    if !ledger.schema.requisition {
        debug!("Monthly recurrence skipped: no requisition column");
        return Vec::new();
    }

    let rows: Vec<BasicRow<'_>> = basic_rows(ledger, year)
        .into_iter()
        .filter(|row| row.tx.requisition.is_some())
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    let mut groups: BTreeMap<(&str, (i32, u32), &str), HashSet<&str>> = BTreeMap::new();

    for row in &rows {
        let Some(requisition) = row.tx.requisition.as_deref() else {
            continue;
        };
        if !seen.insert((row.tx.site.as_str(), requisition, row.tx.material.as_str())) {
            continue;
        }

        let month = (row.at.year(), row.at.month());
        groups
            .entry((row.tx.site.as_str(), month, row.tx.material.as_str()))
            .or_default()
            .insert(requisition);
    }

    let sites = site_names(&rows, &ledger.schema);
    let materials = material_names(&rows, &ledger.schema);

    let mut out: Vec<MonthlyRecurrence> = groups
        .into_iter()
        .filter(|(_, requisitions)| requisitions.len() >= min_reqs_per_month)
        .map(|((site, (y, m), material), requisitions)| MonthlyRecurrence {
            site: site.to_string(),
            site_desc: label(&sites, site),
            month: format!("{:04}-{:02}", y, m),
            material: material.to_string(),
            material_desc: label(&materials, material),
            requisitions: requisitions.len(),
        })
        .collect();

    // Groups come out ordered by (site, month, material); the stable sort
    // keeps material order among equal counts.
    out.sort_by(|a, b| {
        a.site
            .cmp(&b.site)
            .then_with(|| a.month.cmp(&b.month))
            .then_with(|| b.requisitions.cmp(&a.requisitions))
    });

    debug!("Monthly recurrence: {} groups kept", out.len());
    out
}
