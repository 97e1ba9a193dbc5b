//! Basic materials requisitioned across many ISO weeks at one site.

use super::filter::{basic_rows, label, material_names, site_names, BasicRow};
use super::runs::consecutive_runs;
use crate::models::{Ledger, WeeklyRecurrence};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Continuous week number: consecutive ISO weeks differ by exactly one,
/// including across ISO-year boundaries.
fn week_ordinal(date: NaiveDate) -> i64 {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday.num_days_from_ce() as i64 - 1).div_euclid(7)
}

/// Count the distinct ISO weeks each (site, material) was requisitioned in.
///
/// Rows pass the calendar-year filter first and then must also fall in ISO
/// year `year`, so early-January days belonging to the previous ISO year are
/// left out. With `require_consecutive` the threshold applies to the longest
/// run of consecutive weeks, otherwise to the distinct week count. Sorted by
/// longest run, then distinct weeks (highest first).
pub fn weekly_recurrence(
    ledger: &Ledger,
    year: Option<i32>,
    min_weeks: usize,
    require_consecutive: bool,
) -> Vec<WeeklyRecurrence> {
    let rows: Vec<BasicRow<'_>> = basic_rows(ledger, year)
        .into_iter()
        .filter(|row| year.map_or(true, |y| row.at.iso_week().year() == y))
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut weeks: BTreeMap<(&str, &str), BTreeSet<i64>> = BTreeMap::new();
    for row in &rows {
        weeks
            .entry((row.tx.site.as_str(), row.tx.material.as_str()))
            .or_default()
            .insert(week_ordinal(row.at.date()));
    }

    let sites = site_names(&rows, &ledger.schema);
    let materials = material_names(&rows, &ledger.schema);

    let mut out: Vec<WeeklyRecurrence> = Vec::new();
    for ((site, material), ordinals) in weeks {
        let ordinals: Vec<i64> = ordinals.into_iter().collect();
        let distinct_weeks = ordinals.len();
        let max_run = consecutive_runs(&ordinals).longest;

        let measure = if require_consecutive {
            max_run
        } else {
            distinct_weeks
        };
        if measure < min_weeks {
            continue;
        }

        out.push(WeeklyRecurrence {
            site: site.to_string(),
            site_desc: label(&sites, site),
            material: material.to_string(),
            material_desc: label(&materials, material),
            distinct_weeks,
            max_run,
        });
    }

    out.sort_by(|a, b| {
        b.max_run
            .cmp(&a.max_run)
            .then_with(|| b.distinct_weeks.cmp(&a.distinct_weeks))
    });

    debug!("Weekly recurrence: {} pairs kept", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testutil::{doubled, ledger, tx};

    /// M1 at site A in ISO weeks 1, 2, 3 and 7 of 2025, twice in week 2.
    fn four_weeks() -> Ledger {
        ledger(vec![
            tx("A", "R1", "M1", "2025-01-02"), // W01
            tx("A", "R2", "M1", "2025-01-07"), // W02
            tx("A", "R3", "M1", "2025-01-09"), // W02
            tx("A", "R4", "M1", "2025-01-15"), // W03
            tx("A", "R5", "M1", "2025-02-12"), // W07
        ])
    }

    #[test]
    fn test_distinct_weeks_and_run() {
        let out = weekly_recurrence(&four_weeks(), Some(2025), 4, false);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].distinct_weeks, 4);
        assert_eq!(out[0].max_run, 3);
        assert_eq!(out[0].material_desc, "Material M1");
    }

    #[test]
    fn test_require_consecutive_uses_run_length() {
        let ledger = four_weeks();
        assert!(weekly_recurrence(&ledger, Some(2025), 4, true).is_empty());
        assert_eq!(weekly_recurrence(&ledger, Some(2025), 3, true).len(), 1);
    }

    #[test]
    fn test_single_occurrence() {
        let ledger = ledger(vec![tx("A", "R1", "M1", "2025-06-10")]);
        let out = weekly_recurrence(&ledger, Some(2025), 1, false);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].distinct_weeks, 1);
        assert_eq!(out[0].max_run, 1);
    }

    #[test]
    fn test_iso_year_and_calendar_year_both_apply() {
        // 2024-12-30 is ISO 2025-W01 but calendar 2024; 2027-01-01 is
        // calendar 2027 but ISO 2026-W53. Neither counts for its other year.
        let ledger = ledger(vec![
            tx("A", "R1", "M1", "2024-12-30"),
            tx("A", "R2", "M1", "2027-01-01"),
        ]);

        assert!(weekly_recurrence(&ledger, Some(2025), 1, false).is_empty());
        assert!(weekly_recurrence(&ledger, Some(2024), 1, false).is_empty());
        assert!(weekly_recurrence(&ledger, Some(2026), 1, false).is_empty());
        assert!(weekly_recurrence(&ledger, Some(2027), 1, false).is_empty());
    }

    #[test]
    fn test_runs_cross_iso_year_without_year_filter() {
        // 2026-W53 followed by 2027-W01.
        let ledger = ledger(vec![
            tx("A", "R1", "M1", "2026-12-29"),
            tx("A", "R2", "M1", "2027-01-05"),
        ]);

        let out = weekly_recurrence(&ledger, None, 2, true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].max_run, 2);
    }

    #[test]
    fn test_week_ordinal_is_continuous() {
        let a = NaiveDate::from_ymd_opt(2025, 12, 28).unwrap(); // Sunday, W52
        let b = NaiveDate::from_ymd_opt(2025, 12, 29).unwrap(); // Monday, 2026-W01
        assert_eq!(week_ordinal(b) - week_ordinal(a), 1);

        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();
        assert_eq!(week_ordinal(monday), week_ordinal(sunday));
    }

    #[test]
    fn test_sorted_by_run_then_weeks() {
        let mut records = four_weeks().records;
        for (i, date) in ["2025-03-03", "2025-03-10", "2025-03-17", "2025-03-24"]
            .iter()
            .enumerate()
        {
            records.push(tx("A", &format!("S{}", i), "M2", date));
        }
        let out = weekly_recurrence(&ledger(records), Some(2025), 4, false);

        assert_eq!(out[0].material, "M2");
        assert_eq!(out[0].max_run, 4);
        assert_eq!(out[1].material, "M1");
    }

    #[test]
    fn test_row_duplication_is_absorbed() {
        let base = four_weeks();
        assert_eq!(
            weekly_recurrence(&doubled(&base), Some(2025), 2, false),
            weekly_recurrence(&base, Some(2025), 2, false)
        );
    }

    #[test]
    fn test_idempotent() {
        let mut records = four_weeks().records;
        records.push(tx("B", "R6", "M1", "2025-01-03"));
        records.push(tx("B", "R7", "M2", "2025-03-04"));
        records.push(tx("B", "R8", "M1", "2025-03-10"));
        let ledger = ledger(records);

        let first = weekly_recurrence(&ledger, Some(2025), 1, false);
        assert_eq!(first.len(), 3);
        assert_eq!(first, weekly_recurrence(&ledger, Some(2025), 1, false));
        assert_eq!(
            weekly_recurrence(&ledger, Some(2025), 2, true),
            weekly_recurrence(&ledger, Some(2025), 2, true)
        );
    }

    #[test]
    fn test_threshold_monotonicity() {
        let ledger = four_weeks();
        let mut previous = usize::MAX;
        for min in 1..6 {
            let rows = weekly_recurrence(&ledger, Some(2025), min, false).len();
            assert!(rows <= previous);
            previous = rows;
        }
    }
}
