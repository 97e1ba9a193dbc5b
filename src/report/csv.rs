//! CSV export of the indicator tables, one file per indicator.

use crate::models::{IndicatorRow, IndicatorSummary, RecurrencePanel};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Quote a field when it holds a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line<S: AsRef<str>>(fields: &[S]) -> String {
    let escaped: Vec<String> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    format!("{}\n", escaped.join(","))
}

/// Render an indicator table with its header row.
pub fn table_to_csv<R: IndicatorRow>(rows: &[R]) -> String {
    let mut output = csv_line(R::COLUMNS);
    for row in rows {
        output.push_str(&csv_line(&row.cells()));
    }
    output
}

fn summary_to_csv(summary: &IndicatorSummary) -> String {
    let year = summary.year.map(|y| y.to_string()).unwrap_or_default();
    let mut output = csv_line(&["ano", "indicador", "qtd_itens"]);
    for (indicator, count) in summary.entries() {
        output.push_str(&csv_line(&[year.clone(), indicator.to_string(), count.to_string()]));
    }
    output
}

/// Write every panel table into `dir`, creating it if needed.
///
/// Returns the written paths in panel order.
pub fn write_csv_tables(panel: &RecurrencePanel, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create CSV directory: {}", dir.display()))?;

    let tables = [
        ("basicos_reqs_mes", table_to_csv(&panel.monthly)),
        ("basicos_reqs_subsequentes", table_to_csv(&panel.subsequent)),
        ("basicos_semanal_por_obra", table_to_csv(&panel.weekly)),
        ("intervalo_medio_entre_pedidos", table_to_csv(&panel.intervals)),
        ("itens_pequena_qtd_alta_freq", table_to_csv(&panel.low_quantity)),
        ("resumo_indicadores", summary_to_csv(&panel.summary)),
    ];

    let mut written = Vec::with_capacity(tables.len());
    for (name, content) in tables {
        let path = dir.join(format!("{}.csv", name));
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}
