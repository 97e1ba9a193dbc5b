//! "Pingado" detection: basic materials ordered often in small quantities.

use super::filter::{basic_rows, label, material_names, BasicRow};
use super::round_to;
use crate::models::{Ledger, LowQuantityItem};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Default)]
struct OrderTally<'a> {
    orders: usize,
    total: f64,
    supplier_orders: HashSet<&'a str>,
}

/// Materials (across all sites) with at least `min_orders` order lines and a
/// mean ordered quantity of at most `max_mean_quantity`.
///
/// Both bounds are inclusive. Lines without a quantity or requisition are
/// ignored, and a repeated (site, requisition, material) line counts once.
/// Sorted by order count (highest first), then mean quantity (lowest first).
pub fn low_quantity_high_frequency(
    ledger: &Ledger,
    year: Option<i32>,
    min_orders: usize,
    max_mean_quantity: f64,
) -> Vec<LowQuantityItem> {
    if !ledger.schema.requisition || !ledger.schema.quantity {
        debug!("Low-quantity detection skipped: missing requisition or quantity column");
        return Vec::new();
    }

    let rows: Vec<BasicRow<'_>> = basic_rows(ledger, year)
        .into_iter()
        .filter(|row| row.tx.requisition.is_some() && row.tx.quantity.is_some())
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    let mut tallies: BTreeMap<&str, OrderTally<'_>> = BTreeMap::new();

    for row in &rows {
        let (Some(requisition), Some(quantity)) = (row.tx.requisition.as_deref(), row.tx.quantity)
        else {
            continue;
        };
        if !seen.insert((row.tx.site.as_str(), requisition, row.tx.material.as_str())) {
            continue;
        }

        let tally = tallies.entry(row.tx.material.as_str()).or_default();
        tally.orders += 1;
        tally.total += quantity;
        if let Some(supplier_order) = row.tx.supplier_order.as_deref() {
            tally.supplier_orders.insert(supplier_order);
        }
    }

    let materials = material_names(&rows, &ledger.schema);

    let mut out: Vec<LowQuantityItem> = tallies
        .into_iter()
        .filter_map(|(material, tally)| {
            let mean = tally.total / tally.orders as f64;
            if tally.orders < min_orders || mean > max_mean_quantity {
                return None;
            }

            Some(LowQuantityItem {
                material: material.to_string(),
                material_desc: label(&materials, material),
                orders: tally.orders,
                mean_quantity: round_to(mean, 3),
                total_quantity: tally.total,
                distinct_supplier_orders: tally.supplier_orders.len(),
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.orders
            .cmp(&a.orders)
            .then_with(|| a.mean_quantity.total_cmp(&b.mean_quantity))
    });

    debug!("Low-quantity detection: {} materials kept", out.len());
    out
}
