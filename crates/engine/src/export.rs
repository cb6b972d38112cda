//! Export resolver: the value each cell contributes to an exported table,
//! and the set of tokens those values actually reference.

use rustc_hash::FxHashSet;

use crate::error::EngineError;
use crate::overrides::OverrideState;
use crate::state::TokenizationState;
use crate::table::Cell;
use crate::token::Token;
use crate::value::Value;

/// Exported form of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportCell<'a> {
    Original(&'a Value),
    Token(&'a Token),
}

impl ExportCell<'_> {
    pub fn to_value(self) -> Value {
        match self {
            ExportCell::Original(value) => value.clone(),
            ExportCell::Token(token) => Value::Text(token.as_str().to_string()),
        }
    }

    pub fn is_token(self) -> bool {
        matches!(self, ExportCell::Token(_))
    }
}

/// The token a cell emits, if any. Priority: exclusion, inclusion,
/// inactive point, active point, column range, original.
fn exported_token<'a>(state: &TokenizationState, row: usize, col: usize, cell: &'a Cell) -> Option<&'a Token> {
    let column_tokenized = state.is_column_tokenized(col);
    let token = cell.token()?;
    match OverrideState::resolve(state.overrides(), row, col, column_tokenized, true) {
        OverrideState::Excluded | OverrideState::PointInactive => None,
        OverrideState::Included | OverrideState::PointActive => Some(token),
        OverrideState::None if column_tokenized && state.marker().row_in_range(row) => Some(token),
        _ => None,
    }
}

pub fn resolve_cell_export(
    state: &TokenizationState,
    row: usize,
    col: usize,
) -> Result<ExportCell<'_>, EngineError> {
    state.table().check_cell(row, col)?;
    let Some(cell) = state.table().cell(row, col) else {
        return Err(EngineError::CellOutOfBounds { row, col });
    };
    Ok(match exported_token(state, row, col, cell) {
        Some(token) => ExportCell::Token(token),
        None => ExportCell::Original(cell.original()),
    })
}

/// Every row of the table as it should be written out.
pub fn export_rows(state: &TokenizationState) -> Vec<Vec<Value>> {
    state
        .table()
        .rows()
        .enumerate()
        .map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(col, cell)| match exported_token(state, row, col, cell) {
                    Some(token) => ExportCell::Token(token).to_value(),
                    None => cell.original().clone(),
                })
                .collect()
        })
        .collect()
}

/// Tokens that [`export_rows`] emits, row-major by first appearance.
pub fn collect_used_tokens(state: &TokenizationState) -> Vec<&Token> {
    let mut seen: FxHashSet<&Token> = FxHashSet::default();
    let mut used = Vec::new();
    for (row, cells) in state.table().rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Some(token) = exported_token(state, row, col, cell) {
                if seen.insert(token) {
                    used.push(token);
                }
            }
        }
    }
    used
}

/// `token -> original` pairs for the used tokens only.
pub fn used_dictionary(state: &TokenizationState) -> Vec<(String, String)> {
    collect_used_tokens(state)
        .into_iter()
        .filter_map(|token| {
            state
                .store()
                .original_for(token)
                .map(|original| (token.as_str().to_string(), original.to_string()))
        })
        .collect()
}
