use serde::Serialize;

use crate::error::EngineError;
use crate::token::Token;
use crate::value::Value;

/// One grid cell: the permanent source value plus the token assigned to it, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cell {
    original: Value,
    tokenized: Option<Token>,
}

impl Cell {
    pub fn new(original: Value) -> Self {
        Self { original, tokenized: None }
    }

    pub fn original(&self) -> &Value {
        &self.original
    }

    pub fn token(&self) -> Option<&Token> {
        self.tokenized.as_ref()
    }

    pub fn is_tokenized(&self) -> bool {
        self.tokenized.is_some()
    }

    pub(crate) fn set_token(&mut self, token: Token) {
        self.tokenized = Some(token);
    }

    pub(crate) fn clear_token(&mut self) -> Option<Token> {
        self.tokenized.take()
    }
}

/// Rectangular grid of cells built wholesale from raw sheet rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Vec<Cell>>,
    col_count: usize,
}

impl Table {
    /// Build a table from array-of-arrays rows, padding short rows with blanks
    /// up to the widest row.
    pub fn from_rows(raw: Vec<Vec<Value>>) -> Result<Table, EngineError> {
        if raw.is_empty() {
            return Err(EngineError::EmptySheet);
        }
        let col_count = raw.iter().map(Vec::len).max().unwrap_or(0);
        if col_count == 0 {
            return Err(EngineError::NoColumns);
        }

        let rows = raw
            .into_iter()
            .map(|row| {
                let mut cells: Vec<Cell> = row.into_iter().map(Cell::new).collect();
                cells.resize_with(col_count, Cell::default);
                cells
            })
            .collect();

        Ok(Table { rows, col_count })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub(crate) fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(col))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Rows of `col` that a toggle on `(row, col)` applies to.
    ///
    /// A non-blank value expands to every row in the column whose value has the
    /// identical string form (no trimming); a blank cell only affects itself.
    pub fn cluster(&self, row: usize, col: usize) -> Vec<usize> {
        let Some(cell) = self.cell(row, col) else {
            return Vec::new();
        };
        if cell.original.is_blank() {
            return vec![row];
        }

        let needle = cell.original.as_text();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.get(col).is_some_and(|c| c.original.as_text() == needle))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// True when any cell outside `excluding_column` holds `token`.
    pub fn holds_token_outside(&self, token: &Token, excluding_column: usize) -> bool {
        self.rows.iter().any(|row| {
            row.iter()
                .enumerate()
                .any(|(c, cell)| c != excluding_column && cell.tokenized.as_ref() == Some(token))
        })
    }

    pub(crate) fn check_cell(&self, row: usize, col: usize) -> Result<(), EngineError> {
        if self.rows.is_empty() {
            return Err(EngineError::NoTable);
        }
        if row >= self.rows.len() || col >= self.col_count {
            return Err(EngineError::CellOutOfBounds { row, col });
        }
        Ok(())
    }

    pub(crate) fn check_column(&self, col: usize) -> Result<(), EngineError> {
        if self.rows.is_empty() {
            return Err(EngineError::NoTable);
        }
        if col >= self.col_count {
            return Err(EngineError::ColumnOutOfBounds { col });
        }
        Ok(())
    }
}
