//! Presentation views derived from the indicator tables.

use crate::models::{
    EntityLabel, LowQuantityItem, MonthlyItemTotal, MonthlyRecurrence, SiteDetail,
    SubsequentRequisitions, WeeklyHeatmap, WeeklyRecurrence,
};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sum monthly requisition counts per material, highest first.
fn totals_by_material<'a>(rows: impl Iterator<Item = &'a MonthlyRecurrence>) -> Vec<MonthlyItemTotal> {
    let mut totals: BTreeMap<&str, (usize, &str)> = BTreeMap::new();

    for row in rows {
        let entry = totals
            .entry(row.material.as_str())
            .or_insert((0, row.material_desc.as_str()));
        entry.0 += row.requisitions;
    }

    let mut items: Vec<MonthlyItemTotal> = totals
        .into_iter()
        .map(|(material, (requisitions, desc))| MonthlyItemTotal {
            material: material.to_string(),
            material_desc: desc.to_string(),
            requisitions,
        })
        .collect();

    items.sort_by_key(|item| Reverse(item.requisitions));
    items
}

/// Top `n` materials by monthly recurrence summed over sites and months.
pub fn top_monthly_items(monthly: &[MonthlyRecurrence], n: usize) -> Vec<MonthlyItemTotal> {
    let mut items = totals_by_material(monthly.iter());
    items.truncate(n);
    items
}

/// Monthly recurrence of one site, summed per material.
///
/// Returns `None` when the site has no row in the monthly table.
pub fn site_monthly_detail(monthly: &[MonthlyRecurrence], site: &str) -> Option<SiteDetail> {
    let first = monthly.iter().find(|row| row.site == site)?;

    Some(SiteDetail {
        site: first.site.clone(),
        site_desc: first.site_desc.clone(),
        items: totals_by_material(monthly.iter().filter(|row| row.site == site)),
    })
}

/// Sites present in the monthly table as (code, description), sorted by code.
pub fn sites_with_monthly_recurrence(monthly: &[MonthlyRecurrence]) -> Vec<(String, String)> {
    let mut sites: HashMap<&str, &str> = HashMap::new();
    for row in monthly {
        sites.entry(row.site.as_str()).or_insert(row.site_desc.as_str());
    }

    let mut sites: Vec<(String, String)> = sites
        .into_iter()
        .map(|(code, desc)| (code.to_string(), desc.to_string()))
        .collect();
    sites.sort();
    sites
}

/// Top `n` site/material pairs by links, then longest chain.
pub fn top_subsequent_items(
    subsequent: &[SubsequentRequisitions],
    n: usize,
) -> Vec<SubsequentRequisitions> {
    let mut rows = subsequent.to_vec();
    rows.sort_by_key(|row| Reverse((row.links, row.max_run)));
    rows.truncate(n);
    rows
}

/// Top `n` low-quantity materials by number of orders.
pub fn top_low_quantity_items(low_quantity: &[LowQuantityItem], n: usize) -> Vec<LowQuantityItem> {
    let mut rows = low_quantity.to_vec();
    rows.sort_by_key(|row| Reverse(row.orders));
    rows.truncate(n);
    rows
}

/// Sum `SEMANAS_DISTINTAS` per key and keep the `n` largest, ties by code.
fn rank_by_weeks<'a>(
    rows: impl Iterator<Item = &'a WeeklyRecurrence>,
    key: impl Fn(&'a WeeklyRecurrence) -> (&'a str, &'a str),
    n: usize,
) -> Vec<EntityLabel> {
    let mut totals: BTreeMap<&str, (usize, &str)> = BTreeMap::new();
    for row in rows {
        let (code, name) = key(row);
        totals.entry(code).or_insert((0, name)).0 += row.distinct_weeks;
    }

    let mut ranked: Vec<(&str, usize, &str)> = totals
        .into_iter()
        .map(|(code, (weeks, name))| (code, weeks, name))
        .collect();
    ranked.sort_by_key(|&(_, weeks, _)| Reverse(weeks));

    ranked
        .into_iter()
        .take(n)
        .map(|(code, _, name)| EntityLabel {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect()
}

/// Site × material matrix of distinct weeks.
///
/// Materials are ranked by distinct weeks summed over all sites; sites are
/// ranked by the weeks they contribute to the selected materials only.
pub fn weekly_heatmap(weekly: &[WeeklyRecurrence], top_items: usize, top_sites: usize) -> WeeklyHeatmap {
    let materials = rank_by_weeks(
        weekly.iter(),
        |row| (row.material.as_str(), row.material_desc.as_str()),
        top_items,
    );
    let selected: HashSet<&str> = materials.iter().map(|m| m.code.as_str()).collect();

    let sites = rank_by_weeks(
        weekly.iter().filter(|row| selected.contains(row.material.as_str())),
        |row| (row.site.as_str(), row.site_desc.as_str()),
        top_sites,
    );
    if sites.is_empty() {
        return WeeklyHeatmap::default();
    }

    let column: HashMap<&str, usize> = materials
        .iter()
        .enumerate()
        .map(|(j, m)| (m.code.as_str(), j))
        .collect();
    let line: HashMap<&str, usize> = sites
        .iter()
        .enumerate()
        .map(|(i, s)| (s.code.as_str(), i))
        .collect();

    let mut cells = vec![vec![0; materials.len()]; sites.len()];
    for row in weekly {
        if let (Some(&i), Some(&j)) = (line.get(row.site.as_str()), column.get(row.material.as_str())) {
            cells[i][j] += row.distinct_weeks;
        }
    }

    WeeklyHeatmap {
        sites,
        materials,
        cells,
    }
}
