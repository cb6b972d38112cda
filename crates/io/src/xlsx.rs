// Excel file import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import: every sheet as raw rows starting at the first used cell.
// Export: a single "Tokenized" sheet of plain values, no styles.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::Workbook as XlsxWorkbook;

use pseudogrid_engine::value::Value;

use crate::workbook::{SourceSheet, SourceWorkbook};

/// Name of the worksheet written by [`export_to_buffer`].
pub const EXPORT_SHEET_NAME: &str = "Tokenized";

/// Excel's hard limits.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Import an Excel file (xlsx, xls, xlsb, ods)
pub fn import(path: &Path) -> Result<SourceWorkbook, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        let rows: Vec<Vec<Value>> = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        log::debug!("sheet '{}': {} rows", sheet_name, rows.len());
        sheets.push(SourceSheet { name: sheet_name.clone(), rows });
    }

    Ok(SourceWorkbook { sheets })
}

fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Blank,
        Data::String(s) => Value::from(s.as_str()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        // Dates stay serial numbers, as stored
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::from(s.as_str()),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
    }
}

/// Serialize rows into an in-memory xlsx workbook with one sheet.
pub fn export_to_buffer(rows: &[Vec<Value>]) -> Result<Vec<u8>, String> {
    if rows.len() > MAX_ROWS {
        return Err(format!("Table has {} rows; xlsx allows at most {}", rows.len(), MAX_ROWS));
    }

    let mut xlsx_workbook = XlsxWorkbook::new();
    let worksheet = xlsx_workbook
        .add_worksheet()
        .set_name(EXPORT_SHEET_NAME)
        .map_err(|e| format!("Failed to create sheet '{}': {}", EXPORT_SHEET_NAME, e))?;

    for (row_idx, row) in rows.iter().enumerate() {
        if row.len() > MAX_COLS {
            return Err(format!("Row {} has {} columns; xlsx allows at most {}", row_idx + 1, row.len(), MAX_COLS));
        }
        let row32 = row_idx as u32;
        for (col_idx, value) in row.iter().enumerate() {
            let col16 = col_idx as u16;
            let written = match value {
                Value::Blank => continue,
                Value::Text(s) => worksheet.write_string(row32, col16, s),
                Value::Number(n) => worksheet.write_number(row32, col16, *n),
                Value::Bool(b) => worksheet.write_boolean(row32, col16, *b),
            };
            written.map_err(|e| format!("Failed to write cell ({}, {}): {}", row_idx + 1, col_idx + 1, e))?;
        }
    }

    xlsx_workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to build XLSX file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_export_then_import_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokenized.xlsx");
        let rows = vec![
            vec![Value::from("name"), Value::from("age"), Value::from("active")],
            vec![Value::from("[[AbCdEfGhIjKlMnOpQrStUv]]"), Value::Number(31.0), Value::Bool(true)],
            vec![Value::Blank, Value::Number(2.5), Value::Bool(false)],
        ];
        fs::write(&path, export_to_buffer(&rows).unwrap()).unwrap();

        let wb = import(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec![EXPORT_SHEET_NAME]);
        let sheet = &wb.sheets[0];
        assert_eq!(sheet.rows, rows);
    }

    #[test]
    fn test_export_empty_table() {
        let bytes = export_to_buffer(&[]).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_import_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a zip").unwrap();
        assert!(import(&path).unwrap_err().starts_with("Failed to open Excel file"));
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(&Data::String(String::new())), Value::Blank);
        assert_eq!(convert_cell(&Data::Int(7)), Value::Number(7.0));
        assert_eq!(convert_cell(&Data::Empty), Value::Blank);
    }
}
