//! Excel workbook input.
//!
//! The first row of a sheet holds the column names. Every later row becomes
//! a [`RawRow`] keyed by them, so workbooks feed the same ledger builder as
//! JSON exports.

use super::loader::RawRow;
use super::LedgerError;
use calamine::{open_workbook_auto, Data, Range, Reader};
use serde_json::{Number, Value};
use std::path::Path;
use tracing::debug;

/// Sheet read from ledger workbooks when present.
pub const LEDGER_SHEET: &str = "Planilha1";

/// Sheet read from basic-code workbooks when present.
pub const BASIC_CODES_SHEET: &str = "Final";

/// Read the rows of `preferred_sheet`, or of the first sheet when the
/// workbook has no sheet by that name.
pub fn read_workbook_rows(path: &Path, preferred_sheet: &str) -> Result<Vec<RawRow>, LedgerError> {
    let workbook_error = |source: calamine::Error| LedgerError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|name| name.as_str() == preferred_sheet)
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| LedgerError::EmptyWorkbook(path.to_path_buf()))?;

    debug!("Reading sheet {:?} of {}", sheet, path.display());
    let range = workbook.worksheet_range(&sheet).map_err(workbook_error)?;

    Ok(range_rows(&range))
}

/// Key each row below the header by the header's column names.
///
/// Columns with a blank header are dropped, and so are rows with no value.
fn range_rows(range: &Range<Data>) -> Vec<RawRow> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let columns: Vec<Option<String>> = header.iter().map(header_name).collect();

    rows.filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .filter_map(|(column, cell)| Some((column.clone()?, cell_value(cell))))
                .collect()
        })
        .collect()
}

fn header_name(cell: &Data) -> Option<String> {
    let name = match cell_value(cell) {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!name.is_empty()).then_some(name)
}

/// Map a cell to the JSON value an export would carry for it.
///
/// Date cells become ISO 8601 text; blanks and error cells become null.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|at| Value::String(at.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{load_basic_codes, load_ledger, LoadOptions};
    use chrono::NaiveDate;
    use rust_xlsxwriter::{Format, Workbook, Worksheet};
    use serde_json::json;
    use std::collections::HashSet;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    enum Cell {
        Text(&'static str),
        Number(f64),
        /// Excel day serial shown with a date format.
        Date(f64),
        Blank,
    }

    // 2025-01-01 is day 45658 in the 1900 date system.
    const JAN_5_2025: f64 = 45662.0;

    fn write_sheet(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) {
        let date = Format::new().set_num_format("yyyy-mm-dd");
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match *cell {
                    Cell::Text(text) => {
                        worksheet.write_string(r, c, text).unwrap();
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, n).unwrap();
                    }
                    Cell::Date(serial) => {
                        worksheet.write_number_with_format(r, c, serial, &date).unwrap();
                    }
                    Cell::Blank => {}
                }
            }
        }
    }

    fn write_workbook(dir: &TempDir, file: &str, sheets: &[(&str, Vec<Vec<Cell>>)]) -> PathBuf {
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*name).unwrap();
            write_sheet(worksheet, rows);
        }

        let path = dir.path().join(file);
        workbook.save(&path).unwrap();
        path
    }

    fn ledger_sheet() -> Vec<Vec<Cell>> {
        use Cell::*;
        vec![
            vec![
                Text("EMPRD"),
                Text("EMPRD_DESC"),
                Text("REQ_CDG"),
                Text("REQ_DATA"),
                Text("INSUMO_CDG"),
                Text("TIPO_MATERIAL"),
                Text("QTD_PED"),
            ],
            vec![
                Number(101.0),
                Text("Residencial Aurora"),
                Number(5001.0),
                Date(JAN_5_2025),
                Text("M1"),
                Text("BÁSICO"),
                Number(2.5),
            ],
            vec![Blank, Blank, Blank, Blank, Blank, Blank, Blank],
            vec![
                Number(102.0),
                Text("Torre Sul"),
                Number(5002.0),
                Text("2025-02-10"),
                Text("M2"),
                Text("ESPECÍFICO"),
                Blank,
            ],
        ]
    }

    #[test]
    fn test_rows_keyed_by_header() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(&dir, "ledger.xlsx", &[(LEDGER_SHEET, ledger_sheet())]);

        let rows = read_workbook_rows(&path, LEDGER_SHEET).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["EMPRD"], json!(101.0));
        assert_eq!(rows[0]["REQ_DATA"], json!("2025-01-05T00:00:00"));
        assert_eq!(rows[0]["QTD_PED"], json!(2.5));
        assert_eq!(rows[1]["REQ_DATA"], json!("2025-02-10"));
        assert_eq!(rows[1]["QTD_PED"], Value::Null);
        assert_eq!(rows[1].len(), 7);
    }

    #[test]
    fn test_preferred_sheet_then_first() {
        use Cell::*;
        let dir = TempDir::new().unwrap();
        let summary = vec![vec![Text("TOTAL")], vec![Number(3.0)]];

        let path = write_workbook(
            &dir,
            "two.xlsx",
            &[("Resumo", summary), (LEDGER_SHEET, ledger_sheet())],
        );
        let rows = read_workbook_rows(&path, LEDGER_SHEET).unwrap();
        assert!(rows[0].contains_key("EMPRD"));

        let path = write_workbook(&dir, "other.xlsx", &[("Dados", ledger_sheet())]);
        let rows = read_workbook_rows(&path, LEDGER_SHEET).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_blank_header_columns_dropped() {
        use Cell::*;
        let dir = TempDir::new().unwrap();
        let sheet = vec![
            vec![Text("EMPRD"), Blank, Text("INSUMO_CDG")],
            vec![Text("A"), Text("stray"), Text("M1")],
        ];
        let path = write_workbook(&dir, "gaps.xlsx", &[(LEDGER_SHEET, sheet)]);

        let rows = read_workbook_rows(&path, LEDGER_SHEET).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["INSUMO_CDG"], json!("M1"));
    }

    #[test]
    fn test_unreadable_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, "not a workbook").unwrap();

        assert!(matches!(
            read_workbook_rows(&path, LEDGER_SHEET),
            Err(LedgerError::Workbook { .. })
        ));
    }

    #[test]
    fn test_load_ledger_from_workbook() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(&dir, "total_indicadores.xlsx", &[(LEDGER_SHEET, ledger_sheet())]);

        let (ledger, stats) =
            tokio_test::block_on(load_ledger(&[path], &LoadOptions::default())).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.rows, 2);
        assert!(ledger.schema.requisition);
        assert!(ledger.schema.material_kind);

        let first = &ledger.records[0];
        assert_eq!(first.site, "101");
        assert_eq!(first.requisition.as_deref(), Some("5001"));
        assert_eq!(
            first.requisition_date,
            NaiveDate::from_ymd_opt(2025, 1, 5).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
        assert_eq!(first.quantity, Some(2.5));
        assert!(first.is_basic());

        let second = &ledger.records[1];
        assert_eq!(second.site_desc.as_deref(), Some("Torre Sul"));
        assert_eq!(second.quantity, None);
        assert!(!second.is_basic());
    }

    #[test]
    fn test_basic_codes_from_workbook() {
        use Cell::*;
        let dir = TempDir::new().unwrap();
        let codes = vec![
            vec![Text("Código"), Text("Descrição")],
            vec![Number(1001.0), Text("Cimento")],
            vec![Text("A-7"), Text("Areia")],
            vec![Blank, Text("sem código")],
        ];
        let notes = vec![vec![Text("Código")], vec![Number(9.0)]];
        let path = write_workbook(
            &dir,
            "MateriaisBasicos.xlsx",
            &[("Notas", notes), (BASIC_CODES_SHEET, codes)],
        );

        let loaded = load_basic_codes(&path).unwrap();

        let expected: HashSet<String> = ["1001", "A-7"].iter().map(|c| c.to_string()).collect();
        assert_eq!(loaded, expected);
    }
}
