//! Parsing and coercion of requisition exports.

use super::scanner::InputFormat;
use super::workbook::{read_workbook_rows, BASIC_CODES_SHEET, LEDGER_SHEET};
use super::LedgerError;
use crate::models::{columns, Ledger, LedgerSchema, Transaction, BASIC_LABEL, SPECIFIC_LABEL};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A raw export row keyed by column name.
pub type RawRow = Map<String, Value>;

/// Options applied while building the ledger.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Material codes classified as basic when the export has no
    /// `TIPO_MATERIAL` column.
    pub basic_codes: Option<HashSet<String>>,
    /// Left-pad supplier codes with zeros to a common width.
    pub pad_supplier_codes: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            basic_codes: None,
            pad_supplier_codes: true,
        }
    }
}

/// Ingestion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub files: usize,
    /// Rows accepted into the ledger.
    pub rows: usize,
    /// Rows without a site or material code.
    pub rejected: usize,
}

/// Split a text export into raw rows.
///
/// Workbooks are binary; read them with [`read_workbook_rows`].
pub fn parse_rows(
    content: &str,
    format: InputFormat,
    path: &Path,
) -> Result<Vec<RawRow>, LedgerError> {
    let json_error = |line: usize, source: serde_json::Error| LedgerError::Json {
        path: path.to_path_buf(),
        line,
        source,
    };

    match format {
        InputFormat::Json => {
            if content.trim().is_empty() {
                return Ok(Vec::new());
            }
            let value: Value =
                serde_json::from_str(content).map_err(|e| json_error(e.line(), e))?;
            let Value::Array(items) = value else {
                return Err(LedgerError::InvalidShape(path.to_path_buf()));
            };
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    _ => Err(LedgerError::InvalidShape(path.to_path_buf())),
                })
                .collect()
        }
        InputFormat::JsonLines => {
            let mut rows = Vec::new();
            for (index, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str(line).map_err(|e| json_error(index + 1, e))? {
                    Value::Object(row) => rows.push(row),
                    _ => return Err(LedgerError::InvalidShape(path.to_path_buf())),
                }
            }
            Ok(rows)
        }
        InputFormat::Workbook => Err(LedgerError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Read and parse every export file, then build one ledger from all rows.
pub async fn load_ledger(
    paths: &[PathBuf],
    options: &LoadOptions,
) -> Result<(Ledger, LoadStats), LedgerError> {
    let mut rows = Vec::new();

    for path in paths {
        let format =
            InputFormat::from_path(path).ok_or_else(|| LedgerError::UnsupportedFormat(path.clone()))?;
        let parsed = match format {
            InputFormat::Workbook => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || read_workbook_rows(&path, LEDGER_SHEET)).await??
            }
            _ => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| LedgerError::Io {
                        path: path.clone(),
                        source,
                    })?;
                parse_rows(&content, format, path)?
            }
        };
        debug!("Read {} rows from {}", parsed.len(), path.display());
        rows.extend(parsed);
    }

    let (ledger, mut stats) = build_ledger(rows, options);
    stats.files = paths.len();

    info!(
        "Loaded {} rows from {} file(s), {} rejected",
        stats.rows, stats.files, stats.rejected
    );
    Ok((ledger, stats))
}

/// Load the list of basic material codes.
///
/// Accepts a workbook with a `Código` column (sheet `Final`, else the first
/// sheet), a JSON array (of codes, or of objects with a `Código` key) or a
/// plain text file with one code per line.
pub fn load_basic_codes(path: &Path) -> Result<HashSet<String>, LedgerError> {
    if InputFormat::from_path(path) == Some(InputFormat::Workbook) {
        let rows = read_workbook_rows(path, BASIC_CODES_SHEET)?;
        return Ok(rows.iter().filter_map(basic_code).collect());
    }

    let content = std::fs::read_to_string(path).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if !is_json {
        return Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect());
    }

    let value: Value = serde_json::from_str(&content).map_err(|source| LedgerError::Json {
        path: path.to_path_buf(),
        line: source.line(),
        source,
    })?;
    let Value::Array(items) = value else {
        return Err(LedgerError::InvalidShape(path.to_path_buf()));
    };

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::Object(row) => basic_code(row),
            other => cell_text(Some(other)),
        })
        .collect())
}

fn basic_code(row: &RawRow) -> Option<String> {
    cell_text(row.get("Código").or_else(|| row.get("Codigo")))
}

/// Build a typed ledger from raw rows.
///
/// A column counts as present when any row carries its key. Rows without a
/// site or material code are rejected; other unreadable cells become `None`.
pub fn build_ledger(rows: Vec<RawRow>, options: &LoadOptions) -> (Ledger, LoadStats) {
    let has = |column: &str| rows.iter().any(|row| row.contains_key(column));
    let mut schema = LedgerSchema {
        site_desc: has(columns::SITE_DESC),
        requisition: has(columns::REQUISITION),
        material_desc: has(columns::MATERIAL_DESC),
        material_kind: has(columns::MATERIAL_KIND),
        quantity: has(columns::ORDERED_QTY),
        supplier_order: has(columns::SUPPLIER_ORDER),
        supplier: has(columns::SUPPLIER),
    };

    let mut stats = LoadStats::default();
    let mut records = Vec::with_capacity(rows.len());

    for row in &rows {
        let site = cell_text(row.get(columns::SITE));
        let material = cell_text(row.get(columns::MATERIAL));
        let (Some(site), Some(material)) = (site, material) else {
            stats.rejected += 1;
            continue;
        };

        records.push(Transaction {
            site_desc: cell_text(row.get(columns::SITE_DESC)),
            requisition: cell_text(row.get(columns::REQUISITION)),
            requisition_date: cell_date(row.get(columns::REQUISITION_DATE)),
            material_desc: cell_text(row.get(columns::MATERIAL_DESC)),
            material_kind: cell_text(row.get(columns::MATERIAL_KIND)),
            quantity: cell_number(row.get(columns::ORDERED_QTY)),
            supplier_order: cell_text(row.get(columns::SUPPLIER_ORDER)),
            supplier: cell_text(row.get(columns::SUPPLIER)),
            ..Transaction::new(site, material)
        });
    }

    if stats.rejected > 0 {
        warn!(
            "Rejected {} row(s) without {} or {}",
            stats.rejected,
            columns::SITE,
            columns::MATERIAL
        );
    }

    if !schema.material_kind {
        if let Some(ref codes) = options.basic_codes {
            classify_basics(&mut records, codes);
            schema.material_kind = true;
        }
    }

    if options.pad_supplier_codes && schema.supplier {
        pad_supplier_codes(&mut records);
    }

    stats.rows = records.len();
    (Ledger::new(records, schema), stats)
}

/// Label each row basic or specific by membership in `codes`.
fn classify_basics(records: &mut [Transaction], codes: &HashSet<String>) {
    let mut basics = 0;
    for record in records.iter_mut() {
        let label = if codes.contains(&record.material) {
            basics += 1;
            BASIC_LABEL
        } else {
            SPECIFIC_LABEL
        };
        record.material_kind = Some(label.to_string());
    }
    debug!(
        "Classified {} of {} rows as basic from the code list",
        basics,
        records.len()
    );
}

/// Restore leading zeros lost by spreadsheet exports.
fn pad_supplier_codes(records: &mut [Transaction]) {
    let width = records
        .iter()
        .filter_map(|r| r.supplier.as_deref())
        .map(|code| code.chars().count())
        .max()
        .unwrap_or(0);

    for code in records.iter_mut().filter_map(|r| r.supplier.as_mut()) {
        if code.chars().count() < width {
            *code = format!("{:0>width$}", code, width = width);
        }
    }
}

/// Coerce a cell to text; blanks, nulls and nested values become `None`.
fn cell_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    Some(format!("{:.0}", f))
                } else {
                    Some(f.to_string())
                }
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Coerce a cell to a timestamp.
fn cell_date(value: Option<&Value>) -> Option<NaiveDateTime> {
    let Value::String(s) = value? else {
        return None;
    };
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Coerce a cell to a finite number.
fn cell_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn raw(value: Value) -> RawRow {
        match value {
            Value::Object(row) => row,
            _ => panic!("fixture must be an object"),
        }
    }

    fn full_row() -> RawRow {
        raw(json!({
            "EMPRD": 101,
            "EMPRD_DESC": "Residencial Aurora",
            "REQ_CDG": "5001",
            "REQ_DATA": "2025-03-14 09:30:00",
            "INSUMO_CDG": "000123",
            "INSUMO_DESC": "Cimento CP-II 50kg",
            "TIPO_MATERIAL": "BÁSICO",
            "QTD_PED": "12.5",
            "OF_CDG": 7001,
            "FORNECEDOR_CDG": "42"
        }))
    }

    #[test]
    fn test_parse_json_array() {
        let rows = parse_rows(
            r#"[{"EMPRD": 1}, {"EMPRD": 2}]"#,
            InputFormat::Json,
            Path::new("x.json"),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_json_rejects_non_array() {
        let result = parse_rows(r#"{"EMPRD": 1}"#, InputFormat::Json, Path::new("x.json"));
        assert!(matches!(result, Err(LedgerError::InvalidShape(_))));
    }

    #[test]
    fn test_parse_json_lines_reports_line() {
        let content = "{\"EMPRD\": 1}\n\n{\"EMPRD\": 2}\n{broken\n";
        let result = parse_rows(content, InputFormat::JsonLines, Path::new("x.jsonl"));
        match result {
            Err(LedgerError::Json { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_build_full_row() {
        let (ledger, stats) = build_ledger(vec![full_row()], &LoadOptions::default());

        assert_eq!(stats.rows, 1);
        assert_eq!(stats.rejected, 0);
        assert_eq!(ledger.schema, LedgerSchema::complete());

        let tx = &ledger.records[0];
        assert_eq!(tx.site, "101");
        assert_eq!(tx.material, "000123");
        assert_eq!(tx.requisition.as_deref(), Some("5001"));
        assert_eq!(
            tx.requisition_date,
            NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(9, 30, 0)
        );
        assert_eq!(tx.quantity, Some(12.5));
        assert_eq!(tx.supplier_order.as_deref(), Some("7001"));
        assert!(tx.is_basic());
    }

    #[test]
    fn test_rows_without_keys_are_rejected() {
        let mut no_material = full_row();
        no_material.remove("INSUMO_CDG");
        let mut blank_site = full_row();
        blank_site.insert("EMPRD".to_string(), json!("  "));

        let (ledger, stats) =
            build_ledger(vec![full_row(), no_material, blank_site], &LoadOptions::default());

        assert_eq!(ledger.len(), 1);
        assert_eq!(stats.rejected, 2);
    }

    #[test]
    fn test_bad_cells_become_missing() {
        let mut row = full_row();
        row.insert("REQ_DATA".to_string(), json!("not a date"));
        row.insert("QTD_PED".to_string(), json!("dozen"));

        let (ledger, _) = build_ledger(vec![row], &LoadOptions::default());
        assert_eq!(ledger.records[0].requisition_date, None);
        assert_eq!(ledger.records[0].quantity, None);
        assert!(ledger.schema.quantity);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        for input in [
            "2025-01-31",
            "31/01/2025",
            "2025-01-31T00:00:00",
            "2025-01-31 00:00:00.000",
            "2025-01-31T00:00:00Z",
        ] {
            let parsed = cell_date(Some(&json!(input))).map(|dt| dt.date());
            assert_eq!(parsed, Some(expected), "input {}", input);
        }
        assert_eq!(cell_date(Some(&json!(45000))), None);
    }

    #[test]
    fn test_number_text() {
        assert_eq!(cell_text(Some(&json!(1234.0))), Some("1234".to_string()));
        assert_eq!(cell_text(Some(&json!(12.5))), Some("12.5".to_string()));
        assert_eq!(cell_text(Some(&json!(null))), None);
        assert_eq!(cell_text(None), None);
    }

    #[test]
    fn test_schema_tracks_absent_columns() {
        let (ledger, _) = build_ledger(
            vec![raw(json!({"EMPRD": "A", "INSUMO_CDG": "M1", "REQ_DATA": "2025-01-01"}))],
            &LoadOptions::default(),
        );

        assert!(!ledger.schema.requisition);
        assert!(!ledger.schema.material_kind);
        assert!(!ledger.schema.quantity);
    }

    #[test]
    fn test_classification_from_code_list() {
        let rows = vec![
            raw(json!({"EMPRD": "A", "INSUMO_CDG": "M1"})),
            raw(json!({"EMPRD": "A", "INSUMO_CDG": "M2"})),
        ];
        let options = LoadOptions {
            basic_codes: Some(["M1".to_string()].into_iter().collect()),
            ..LoadOptions::default()
        };

        let (ledger, _) = build_ledger(rows, &options);
        assert!(ledger.schema.material_kind);
        assert!(ledger.records[0].is_basic());
        assert_eq!(ledger.records[1].material_kind.as_deref(), Some(SPECIFIC_LABEL));
    }

    #[test]
    fn test_existing_kind_column_wins_over_code_list() {
        let options = LoadOptions {
            basic_codes: Some(HashSet::new()),
            ..LoadOptions::default()
        };
        let (ledger, _) = build_ledger(vec![full_row()], &options);
        assert!(ledger.records[0].is_basic());
    }

    #[test]
    fn test_supplier_codes_padded() {
        let mut short = full_row();
        short.insert("FORNECEDOR_CDG".to_string(), json!(7));
        let mut long = full_row();
        long.insert("FORNECEDOR_CDG".to_string(), json!("00123"));

        let (ledger, _) = build_ledger(vec![short.clone(), long.clone()], &LoadOptions::default());
        assert_eq!(ledger.records[0].supplier.as_deref(), Some("00007"));

        let options = LoadOptions {
            pad_supplier_codes: false,
            ..LoadOptions::default()
        };
        let (ledger, _) = build_ledger(vec![short, long], &options);
        assert_eq!(ledger.records[0].supplier.as_deref(), Some("7"));
    }

    #[test]
    fn test_load_ledger_from_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("jan.json");
        let second = dir.path().join("feb.jsonl");
        fs::write(
            &first,
            r#"[{"EMPRD": "A", "INSUMO_CDG": "M1", "REQ_CDG": "R1", "REQ_DATA": "2025-01-02"}]"#,
        )
        .unwrap();
        fs::write(
            &second,
            "{\"EMPRD\": \"A\", \"INSUMO_CDG\": \"M1\", \"REQ_CDG\": \"R2\", \"REQ_DATA\": \"2025-02-02\"}\n{\"INSUMO_CDG\": \"M9\"}\n",
        )
        .unwrap();

        let (ledger, stats) = tokio_test::block_on(load_ledger(
            &[first, second],
            &LoadOptions::default(),
        ))
        .unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(
            stats,
            LoadStats {
                files: 2,
                rows: 2,
                rejected: 1
            }
        );
    }

    #[test]
    fn test_basic_codes_file_formats() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("basicos.txt");
        fs::write(&text, "M1\n\n  M2 \n").unwrap();
        let json = dir.path().join("basicos.json");
        fs::write(&json, r#"[{"Código": "M3"}, 456, "M5"]"#).unwrap();

        let codes = load_basic_codes(&text).unwrap();
        assert!(codes.contains("M1") && codes.contains("M2"));
        assert_eq!(codes.len(), 2);

        let codes = load_basic_codes(&json).unwrap();
        assert!(codes.contains("M3") && codes.contains("456") && codes.contains("M5"));
    }
}
