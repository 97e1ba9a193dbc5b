//! Panel orchestration: every indicator for one year plus their summary.

use super::intervals::requisition_intervals;
use super::low_quantity::low_quantity_high_frequency;
use super::monthly::monthly_recurrence;
use super::subsequent::subsequent_requisitions;
use super::weekly::weekly_recurrence;
use crate::models::{
    IndicatorSummary, Ledger, LowQuantityItem, MonthlyRecurrence, RecurrencePanel,
    RequisitionInterval, SubsequentRequisitions, WeeklyRecurrence,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::{spawn_blocking, JoinError};
use tracing::info;

/// Thresholds for every aggregator in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelThresholds {
    /// Minimum distinct requisitions per site and month.
    #[serde(default = "default_min_reqs_per_month")]
    pub min_reqs_per_month: usize,

    /// Minimum links between consecutive requisitions.
    #[serde(default = "default_min_links")]
    pub min_links: usize,

    /// Minimum distinct (or consecutive) ISO weeks.
    #[serde(default = "default_min_weeks")]
    pub min_weeks: usize,

    /// Apply `min_weeks` to the longest consecutive run instead.
    #[serde(default)]
    pub require_consecutive_weeks: bool,

    /// Minimum distinct requisition days for interval statistics.
    #[serde(default = "default_min_reqs_interval")]
    pub min_reqs_interval: usize,

    /// Minimum order lines for a "pingado" material.
    #[serde(default = "default_min_orders")]
    pub min_orders: usize,

    /// Maximum mean ordered quantity for a "pingado" material.
    #[serde(default = "default_max_mean_quantity")]
    pub max_mean_quantity: f64,
}

impl Default for PanelThresholds {
    fn default() -> Self {
        Self {
            min_reqs_per_month: default_min_reqs_per_month(),
            min_links: default_min_links(),
            min_weeks: default_min_weeks(),
            require_consecutive_weeks: false,
            min_reqs_interval: default_min_reqs_interval(),
            min_orders: default_min_orders(),
            max_mean_quantity: default_max_mean_quantity(),
        }
    }
}

fn default_min_reqs_per_month() -> usize {
    2
}

fn default_min_links() -> usize {
    1
}

fn default_min_weeks() -> usize {
    4
}

fn default_min_reqs_interval() -> usize {
    2
}

fn default_min_orders() -> usize {
    5
}

fn default_max_mean_quantity() -> f64 {
    10.0
}

/// Build the panel with the default thresholds.
pub fn recurrence_panel(ledger: &Ledger, year: Option<i32>) -> RecurrencePanel {
    recurrence_panel_with(ledger, year, &PanelThresholds::default())
}

/// Build the panel with explicit thresholds.
pub fn recurrence_panel_with(
    ledger: &Ledger,
    year: Option<i32>,
    thresholds: &PanelThresholds,
) -> RecurrencePanel {
    assemble(
        year,
        monthly_recurrence(ledger, year, thresholds.min_reqs_per_month),
        subsequent_requisitions(ledger, year, thresholds.min_links),
        weekly_recurrence(
            ledger,
            year,
            thresholds.min_weeks,
            thresholds.require_consecutive_weeks,
        ),
        requisition_intervals(ledger, year, thresholds.min_reqs_interval),
        low_quantity_high_frequency(
            ledger,
            year,
            thresholds.min_orders,
            thresholds.max_mean_quantity,
        ),
    )
}

/// Build the panel with each aggregator on its own blocking task.
///
/// Aggregators only read the shared ledger, so the result is identical to
/// [`recurrence_panel_with`].
pub async fn recurrence_panel_concurrent(
    ledger: Arc<Ledger>,
    year: Option<i32>,
    thresholds: PanelThresholds,
) -> Result<RecurrencePanel, JoinError> {
    let monthly = {
        let ledger = Arc::clone(&ledger);
        spawn_blocking(move || monthly_recurrence(&ledger, year, thresholds.min_reqs_per_month))
    };
    let subsequent = {
        let ledger = Arc::clone(&ledger);
        spawn_blocking(move || subsequent_requisitions(&ledger, year, thresholds.min_links))
    };
    let weekly = {
        let ledger = Arc::clone(&ledger);
        spawn_blocking(move || {
            weekly_recurrence(
                &ledger,
                year,
                thresholds.min_weeks,
                thresholds.require_consecutive_weeks,
            )
        })
    };
    let intervals = {
        let ledger = Arc::clone(&ledger);
        spawn_blocking(move || requisition_intervals(&ledger, year, thresholds.min_reqs_interval))
    };
    let low_quantity = spawn_blocking(move || {
        low_quantity_high_frequency(
            &ledger,
            year,
            thresholds.min_orders,
            thresholds.max_mean_quantity,
        )
    });

    let (monthly, subsequent, weekly, intervals, low_quantity) =
        futures::try_join!(monthly, subsequent, weekly, intervals, low_quantity)?;

    Ok(assemble(
        year,
        monthly,
        subsequent,
        weekly,
        intervals,
        low_quantity,
    ))
}

fn distinct_materials<'a>(materials: impl Iterator<Item = &'a str>) -> usize {
    materials.collect::<HashSet<_>>().len()
}

fn assemble(
    year: Option<i32>,
    monthly: Vec<MonthlyRecurrence>,
    subsequent: Vec<SubsequentRequisitions>,
    weekly: Vec<WeeklyRecurrence>,
    intervals: Vec<RequisitionInterval>,
    low_quantity: Vec<LowQuantityItem>,
) -> RecurrencePanel {
    let summary = IndicatorSummary {
        year,
        monthly: distinct_materials(monthly.iter().map(|r| r.material.as_str())),
        subsequent: distinct_materials(subsequent.iter().map(|r| r.material.as_str())),
        weekly: distinct_materials(weekly.iter().map(|r| r.material.as_str())),
        intervals: distinct_materials(intervals.iter().map(|r| r.material.as_str())),
        low_quantity: distinct_materials(low_quantity.iter().map(|r| r.material.as_str())),
    };

    info!(
        "Panel {:?}: {} monthly, {} subsequent, {} weekly, {} interval, {} low-quantity materials",
        year,
        summary.monthly,
        summary.subsequent,
        summary.weekly,
        summary.intervals,
        summary.low_quantity
    );

    RecurrencePanel {
        monthly,
        subsequent,
        weekly,
        intervals,
        low_quantity,
        summary,
    }
}
