// Source workbook: sheet names plus raw rows, decoded from any supported file

use std::path::Path;

use pseudogrid_engine::value::Value;

use crate::{csv, xlsx};

/// One sheet as array-of-arrays rows, no header row, blanks as [`Value::Blank`].
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSheet {
    pub name: String,
    pub rows: Vec<Vec<Value>>,
}

impl SourceSheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceWorkbook {
    pub sheets: Vec<SourceSheet>,
}

impl SourceWorkbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Find a sheet by exact name, falling back to a 1-based index.
    pub fn sheet(&self, selector: &str) -> Option<&SourceSheet> {
        if let Some(sheet) = self.sheets.iter().find(|s| s.name == selector) {
            return Some(sheet);
        }
        selector
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| self.sheets.get(idx))
    }

    pub fn first(&self) -> Option<&SourceSheet> {
        self.sheets.first()
    }
}

/// Open a workbook, choosing the decoder from the file extension.
pub fn open(path: &Path) -> Result<SourceWorkbook, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let workbook = match ext.as_str() {
        "csv" | "txt" => csv::import_workbook(path, None)?,
        "tsv" | "tab" => csv::import_workbook(path, Some(b'\t'))?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::import(path)?,
        "" => return Err(format!("Cannot determine file type of '{}'", path.display())),
        other => return Err(format!("Unsupported file type: .{}", other)),
    };

    if workbook.sheets.is_empty() {
        return Err("File contains no sheets".to_string());
    }
    log::debug!(
        "opened {} with {} sheet(s)",
        path.display(),
        workbook.sheets.len()
    );
    Ok(workbook)
}
