//! Shared fixtures for engine tests.

use crate::models::{Ledger, LedgerSchema, Transaction, BASIC_LABEL};
use chrono::NaiveDate;

/// A basic-material line dated at midnight of `date` (`YYYY-MM-DD`).
pub fn tx(site: &str, requisition: &str, material: &str, date: &str) -> Transaction {
    let at = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .expect("fixture date")
        .and_hms_opt(0, 0, 0)
        .expect("midnight");

    Transaction {
        site_desc: Some(format!("Obra {}", site)),
        requisition: Some(requisition.to_string()),
        requisition_date: Some(at),
        material_desc: Some(format!("Material {}", material)),
        material_kind: Some(BASIC_LABEL.to_string()),
        quantity: Some(1.0),
        ..Transaction::new(site, material)
    }
}

/// Same as [`tx`] with an ordered quantity and supplier order.
pub fn order(
    site: &str,
    requisition: &str,
    material: &str,
    date: &str,
    quantity: f64,
    supplier_order: &str,
) -> Transaction {
    Transaction {
        quantity: Some(quantity),
        supplier_order: Some(supplier_order.to_string()),
        ..tx(site, requisition, material, date)
    }
}

/// A ledger with every optional column present.
pub fn ledger(records: Vec<Transaction>) -> Ledger {
    Ledger::new(records, LedgerSchema::complete())
}

/// The same ledger with every row appearing twice.
pub fn doubled(source: &Ledger) -> Ledger {
    let mut records = source.records.clone();
    records.extend(source.records.iter().cloned());
    Ledger::new(records, source.schema)
}
