//! Markdown and JSON report generation.
//!
//! This module renders the recurrence panel, its summary and the
//! presentation views into a single report document.

use crate::analysis::sites_with_monthly_recurrence;
use crate::models::{
    IndicatorRow, IndicatorSummary, LowQuantityItem, MonthlyItemTotal, Report, ReportMetadata,
    SiteDetail, SubsequentRequisitions, WeeklyHeatmap,
};
use anyhow::Result;

/// Generate a complete Markdown report.
///
/// With `include_tables` unset only the summary, the views and the site
/// sections are rendered.
pub fn generate_markdown_report(report: &Report, include_tables: bool) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Basic Materials Recurrence Panel\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.panel.summary));
    output.push_str(&generate_top_items_section(&report.top_items));
    output.push_str(&generate_top_subsequent_section(&report.top_subsequent));
    output.push_str(&generate_heatmap_section(&report.weekly_heatmap));
    output.push_str(&generate_top_low_quantity_section(&report.top_low_quantity));

    if let Some(ref detail) = report.site_detail {
        output.push_str(&generate_site_detail_section(detail));
    }

    output.push_str(&generate_sites_section(report));

    if include_tables {
        let panel = &report.panel;
        output.push_str(&generate_table_section(
            "Monthly Recurrence",
            "Basic materials requisitioned in several distinct requisitions of the same site and month.",
            &panel.monthly,
        ));
        output.push_str(&generate_table_section(
            "Subsequent Requisitions",
            "Basic materials present in back-to-back requisitions of a site.",
            &panel.subsequent,
        ));
        output.push_str(&generate_table_section(
            "Weekly Recurrence",
            "Basic materials requisitioned in many ISO weeks at the same site.",
            &panel.weekly,
        ));
        output.push_str(&generate_table_section(
            "Requisition Intervals",
            "Gaps in days between consecutive requisition days of a material at a site.",
            &panel.intervals,
        ));
        output.push_str(&generate_table_section(
            "Small Quantities at High Frequency",
            "Basic materials ordered often with a small mean quantity, across all sites.",
            &panel.low_quantity,
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input));
    section.push_str(&format!("- **Year:** {}\n", year_label(metadata.year)));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Files Read:** {}\n", metadata.files_read));
    section.push_str(&format!("- **Rows Loaded:** {}\n", metadata.rows_loaded));
    if metadata.rows_rejected > 0 {
        section.push_str(&format!(
            "- **Rows Rejected:** {}\n",
            metadata.rows_rejected
        ));
    }
    section.push_str(&format!(
        "- **Basic Rows Analysed:** {}\n",
        metadata.basic_rows
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn year_label(year: Option<i32>) -> String {
    year.map(|y| y.to_string())
        .unwrap_or_else(|| "all years".to_string())
}

/// Generate the indicator summary section.
fn generate_summary_section(summary: &IndicatorSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "Distinct basic materials flagged by each indicator ({}).\n\n",
        year_label(summary.year)
    ));
    section.push_str("| Indicator | Materials |\n");
    section.push_str("|:---|---:|\n");
    for (indicator, count) in summary.entries() {
        section.push_str(&format!("| `{}` | {} |\n", indicator, count));
    }
    section.push('\n');

    section
}

/// Generate the top monthly-recurrent items section.
fn generate_top_items_section(items: &[MonthlyItemTotal]) -> String {
    let mut section = String::new();

    section.push_str("## Top Recurrent Items\n\n");

    if items.is_empty() {
        section.push_str("No material was requisitioned repeatedly within a month.\n\n");
        return section;
    }

    section.push_str(&generate_item_totals_table(items));
    section
}

/// Generate the section on materials in back-to-back requisitions.
fn generate_top_subsequent_section(rows: &[SubsequentRequisitions]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Items in Subsequent Requisitions\n\n");
    section.push_str("| # | Site | Material | Description | Links | Longest Chain |\n");
    section.push_str("|---:|:---|:---|:---|---:|---:|\n");
    for (i, row) in rows.iter().enumerate() {
        section.push_str(&format!(
            "| {} | `{}` | `{}` | {} | {} | {} |\n",
            i + 1,
            escape_cell(&row.site),
            escape_cell(&row.material),
            escape_cell(&row.material_desc),
            row.links,
            row.max_run
        ));
    }
    section.push('\n');

    section
}

/// Generate the site × material matrix of distinct weeks.
fn generate_heatmap_section(heatmap: &WeeklyHeatmap) -> String {
    if heatmap.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Weekly Recurrence by Site and Material\n\n");
    section.push_str("Distinct weeks with requisitions; `-` where the pair has no weekly row.\n\n");

    let header: Vec<String> = heatmap
        .materials
        .iter()
        .map(|m| escape_cell(&m.name))
        .collect();
    section.push_str(&format!("| Site | {} |\n", header.join(" | ")));
    section.push_str(&format!(
        "|:---|{}\n",
        heatmap.materials.iter().map(|_| "---:|").collect::<String>()
    ));

    for (site, row) in heatmap.sites.iter().zip(&heatmap.cells) {
        let cells: Vec<String> = row
            .iter()
            .map(|&weeks| match weeks {
                0 => "-".to_string(),
                n => n.to_string(),
            })
            .collect();
        section.push_str(&format!(
            "| `{}` {} | {} |\n",
            escape_cell(&site.code),
            escape_cell(&site.name),
            cells.join(" | ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the section on small quantities ordered often.
fn generate_top_low_quantity_section(rows: &[LowQuantityItem]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Most Frequent Small-Quantity Items\n\n");
    section.push_str("| # | Material | Description | Orders | Mean Quantity |\n");
    section.push_str("|---:|:---|:---|---:|---:|\n");
    for (i, row) in rows.iter().enumerate() {
        section.push_str(&format!(
            "| {} | `{}` | {} | {} | {:.2} |\n",
            i + 1,
            escape_cell(&row.material),
            escape_cell(&row.material_desc),
            row.orders,
            row.mean_quantity
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-site detail section.
fn generate_site_detail_section(detail: &SiteDetail) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## Site {} - {}\n\n",
        escape_cell(&detail.site),
        escape_cell(&detail.site_desc)
    ));
    section.push_str(&generate_item_totals_table(&detail.items));
    section
}

fn generate_item_totals_table(items: &[MonthlyItemTotal]) -> String {
    let mut table = String::new();

    table.push_str("| # | Material | Description | Requisitions |\n");
    table.push_str("|---:|:---|:---|---:|\n");
    for (i, item) in items.iter().enumerate() {
        table.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            i + 1,
            escape_cell(&item.material),
            escape_cell(&item.material_desc),
            item.requisitions
        ));
    }
    table.push('\n');

    table
}

/// Generate the list of sites with monthly recurrence.
fn generate_sites_section(report: &Report) -> String {
    let sites = sites_with_monthly_recurrence(&report.panel.monthly);
    if sites.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Sites with Monthly Recurrence\n\n");
    for (code, desc) in sites {
        section.push_str(&format!("- `{}` {}\n", code, desc));
    }
    section.push('\n');

    section
}

/// Generate one indicator table, headed by its external column names.
fn generate_table_section<R: IndicatorRow>(title: &str, description: &str, rows: &[R]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str(&format!("{}\n\n", description));

    if rows.is_empty() {
        section.push_str("*No rows.*\n\n");
        return section;
    }

    section.push_str(&format!("| {} |\n", R::COLUMNS.join(" | ")));
    section.push_str(&format!(
        "|{}\n",
        R::COLUMNS.iter().map(|_| "---|").collect::<String>()
    ));

    for row in rows {
        let cells: Vec<String> = row.cells().iter().map(|c| escape_cell(c)).collect();
        section.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    section.push('\n');

    section
}

/// Keep cell text from breaking the table layout.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by recurrence-panel v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
