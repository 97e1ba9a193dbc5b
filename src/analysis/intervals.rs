//! Day gaps between consecutive requisitions of a material at a site.

use super::filter::{basic_rows, label, material_names, site_names, BasicRow};
use super::round_to;
use crate::models::{Ledger, RequisitionInterval};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Mean, minimum and maximum gap (in whole days) between the distinct
/// requisition days of each (site, material).
///
/// Pairs with fewer than `min_reqs` distinct days, or with a single
/// distinct day, are left out. Sorted by mean gap (shortest first), then by
/// requisition count (highest first).
pub fn requisition_intervals(
    ledger: &Ledger,
    year: Option<i32>,
    min_reqs: usize,
) -> Vec<RequisitionInterval> {
    if !ledger.schema.requisition {
        debug!("Requisition intervals skipped: no requisition column");
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
    let mut days: BTreeMap<(&str, &str), BTreeSet<NaiveDate>> = BTreeMap::new();

    for row in &rows {
        let Some(requisition) = row.tx.requisition.as_deref() else {
            continue;
        };
        let key = (row.tx.site.as_str(), row.tx.material.as_str());
        if !seen.insert((key.0, key.1, requisition)) {
            continue;
        }
        days.entry(key).or_default().insert(row.at.date());
    }

    let sites = site_names(&rows, &ledger.schema);
    let materials = material_names(&rows, &ledger.schema);

    let mut out: Vec<RequisitionInterval> = Vec::new();
    for ((site, material), dates) in days {
        if dates.len() < min_reqs {
            continue;
        }

        let dates: Vec<NaiveDate> = dates.into_iter().collect();
        let gaps: Vec<i64> = dates
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days())
            .collect();
        let (Some(&min_days), Some(&max_days)) = (gaps.iter().min(), gaps.iter().max()) else {
            continue;
        };

        let mean = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;

        out.push(RequisitionInterval {
            site: site.to_string(),
            site_desc: label(&sites, site),
            material: material.to_string(),
            material_desc: label(&materials, material),
            requisitions: dates.len(),
            mean_days: round_to(mean, 2),
            min_days,
            max_days,
        });
    }

    out.sort_by(|a, b| {
        a.mean_days
            .total_cmp(&b.mean_days)
            .then_with(|| b.requisitions.cmp(&a.requisitions))
    });

    debug!("Requisition intervals: {} pairs kept", out.len());
    out
}
