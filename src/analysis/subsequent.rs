//! Basic materials appearing in consecutive requisitions of a site.

use super::filter::{basic_rows, label, material_names, site_names, BasicRow};
use super::runs::consecutive_runs;
use crate::models::{Ledger, SubsequentRequisitions};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Per-site requisition order: requisition code → 0-based position when the
/// site's requisitions are sorted by (date, code).
///
/// A requisition whose lines carry different dates is placed by its
/// earliest one.
fn requisition_order<'a>(rows: &[BasicRow<'a>]) -> HashMap<(&'a str, &'a str), usize> {
    let mut earliest: HashMap<(&'a str, &'a str), NaiveDateTime> = HashMap::new();

    for row in rows {
        let Some(requisition) = row.tx.requisition.as_deref() else {
            continue;
        };
        earliest
            .entry((row.tx.site.as_str(), requisition))
            .and_modify(|at| *at = (*at).min(row.at))
            .or_insert(row.at);
    }

    let mut by_site: BTreeMap<&'a str, Vec<(NaiveDateTime, &'a str)>> = BTreeMap::new();
    for (&(site, requisition), &at) in &earliest {
        by_site.entry(site).or_default().push((at, requisition));
    }

    let mut order = HashMap::with_capacity(earliest.len());
    for (site, mut requisitions) in by_site {
        requisitions.sort();
        for (index, (_, requisition)) in requisitions.into_iter().enumerate() {
            order.insert((site, requisition), index);
        }
    }

    order
}

/// Detect materials requisitioned in back-to-back requisitions of a site.
///
/// For each (site, material) seen in at least two requisitions, counts the
/// links between consecutive requisitions and the longest chain. Keeps
/// pairs with at least `min_links` links, sorted by links, longest chain and
/// total requisitions (all highest first).
pub fn subsequent_requisitions(
    ledger: &Ledger,
    year: Option<i32>,
    min_links: usize,
) -> Vec<SubsequentRequisitions> {
    if !ledger.schema.requisition {
        debug!("Subsequent requisitions skipped: no requisition column");
        return Vec::new();
    }

    let rows: Vec<BasicRow<'_>> = basic_rows(ledger, year)
        .into_iter()
        .filter(|row| row.tx.requisition.is_some())
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let order = requisition_order(&rows);

    let mut positions: BTreeMap<(&str, &str), BTreeSet<i64>> = BTreeMap::new();
    for row in &rows {
        let Some(requisition) = row.tx.requisition.as_deref() else {
            continue;
        };
        if let Some(index) = order.get(&(row.tx.site.as_str(), requisition)) {
            positions
                .entry((row.tx.site.as_str(), row.tx.material.as_str()))
                .or_default()
                .insert(*index as i64);
        }
    }

    let sites = site_names(&rows, &ledger.schema);
    let materials = material_names(&rows, &ledger.schema);

    let mut out: Vec<SubsequentRequisitions> = Vec::new();
    for ((site, material), indices) in positions {
        if indices.len() < 2 {
            continue;
        }

        let indices: Vec<i64> = indices.into_iter().collect();
        let runs = consecutive_runs(&indices);
        if runs.links < min_links {
            continue;
        }

        out.push(SubsequentRequisitions {
            site: site.to_string(),
            site_desc: label(&sites, site),
            material: material.to_string(),
            material_desc: label(&materials, material),
            total_requisitions: indices.len(),
            links: runs.links,
            max_run: runs.longest,
        });
    }

    out.sort_by(|a, b| {
        b.links
            .cmp(&a.links)
            .then_with(|| b.max_run.cmp(&a.max_run))
            .then_with(|| b.total_requisitions.cmp(&a.total_requisitions))
    });

    debug!("Subsequent requisitions: {} pairs kept", out.len());
    out
}
