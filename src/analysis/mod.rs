//! Recurrence analytics engine.
//!
//! Every aggregator reads the basic-material rows of a [`Ledger`] for one
//! year and returns a freshly built, typed table. Aggregators never depend
//! on each other's output.
//!
//! [`Ledger`]: crate::models::Ledger

pub mod filter;
pub mod intervals;
pub mod low_quantity;
pub mod monthly;
pub mod panel;
pub mod runs;
pub mod subsequent;
pub mod views;
pub mod weekly;

#[cfg(test)]
pub(crate) mod testutil;

pub use filter::{basic_rows, material_names, site_names, BasicRow};
pub use intervals::requisition_intervals;
pub use low_quantity::low_quantity_high_frequency;
pub use monthly::monthly_recurrence;
pub use panel::{recurrence_panel, recurrence_panel_concurrent, recurrence_panel_with, PanelThresholds};
pub use runs::{consecutive_runs, RunStats};
pub use subsequent::subsequent_requisitions;
pub use views::{
    site_monthly_detail, sites_with_monthly_recurrence, top_low_quantity_items,
    top_monthly_items, top_subsequent_items, weekly_heatmap,
};
pub use weekly::weekly_recurrence;

/// Round to a fixed number of decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
