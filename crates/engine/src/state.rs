//! The tokenization session: table, token store, column sets, range marker,
//! per-cell overrides and view mode, plus every operation that mutates them.
//!
//! Resolvers ([`crate::display`], [`crate::export`]) only read this state.

use std::collections::BTreeSet;

use crate::display::ViewMode;
use crate::error::EngineError;
use crate::export_session::{ArtifactKind, ExportSession, ExportStamp};
use crate::overrides::{Mark, OverrideLayer};
use crate::range::{BoundKind, DragOutcome, MarkerDrag, RangeMarker};
use crate::table::Table;
use crate::token::{Token, TokenStore};
use crate::value::Value;

/// What one [`TokenizationState::tokenize_columns`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizeSummary {
    /// Columns moved from selected to tokenized, ascending.
    pub columns: Vec<usize>,
    /// Cells that received (or kept) a token in whole-column passes.
    pub column_cells: usize,
    /// Queued cells that received a point token.
    pub point_cells: usize,
    /// Distinct values registered in the token store by this call.
    pub new_tokens: usize,
    /// The view switched to tokenized for the first time.
    pub switched_view: bool,
}

impl TokenizeSummary {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.point_cells == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenizationState {
    table: Table,
    store: TokenStore,
    selected_columns: BTreeSet<usize>,
    tokenized_columns: BTreeSet<usize>,
    marker: RangeMarker,
    overrides: OverrideLayer,
    view_mode: ViewMode,
    has_tokenized_data: bool,
    auto_switched: bool,
    user_modified: bool,
    export_session: ExportSession,
    table_exported: bool,
    dictionary_exported: bool,
}

impl TokenizationState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Accessors ---

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn marker(&self) -> &RangeMarker {
        &self.marker
    }

    pub fn overrides(&self) -> &OverrideLayer {
        &self.overrides
    }

    pub fn selected_columns(&self) -> &BTreeSet<usize> {
        &self.selected_columns
    }

    pub fn tokenized_columns(&self) -> &BTreeSet<usize> {
        &self.tokenized_columns
    }

    pub fn is_column_selected(&self, col: usize) -> bool {
        self.selected_columns.contains(&col)
    }

    pub fn is_column_tokenized(&self, col: usize) -> bool {
        self.tokenized_columns.contains(&col)
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn has_tokenized_data(&self) -> bool {
        self.has_tokenized_data
    }

    pub fn is_user_modified(&self) -> bool {
        self.user_modified
    }

    pub fn table_exported(&self) -> bool {
        self.table_exported
    }

    pub fn dictionary_exported(&self) -> bool {
        self.dictionary_exported
    }

    // --- Table lifecycle ---

    /// Build the table from raw sheet rows, replacing any previous table and
    /// all per-table state. The token store is kept.
    pub fn recognize(&mut self, rows: Vec<Vec<Value>>) -> Result<(), EngineError> {
        let table = Table::from_rows(rows)?;
        let row_count = table.row_count();
        log::debug!("recognized table: {} rows x {} columns", row_count, table.col_count());

        self.table = table;
        self.clear_table_state();
        let start_row = self.marker.start_row();
        self.marker.reset(row_count, start_row, row_count);
        Ok(())
    }

    /// A rebuild would discard user work.
    pub fn needs_recognize_confirmation(&self) -> bool {
        !self.table.is_empty() && self.user_modified
    }

    /// Drop the table when a different sheet is picked.
    pub fn change_sheet(&mut self) {
        self.table = Table::default();
        self.clear_table_state();
        self.marker = RangeMarker::new(0);
    }

    /// Forget everything, token store included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_table_state(&mut self) {
        self.selected_columns.clear();
        self.tokenized_columns.clear();
        self.overrides.clear();
        self.has_tokenized_data = false;
        self.auto_switched = false;
        self.view_mode = ViewMode::Original;
        self.export_session.reset();
        self.table_exported = false;
        self.dictionary_exported = false;
        self.user_modified = false;
    }

    fn mark_table_changed(&mut self) {
        if !self.table.is_empty() {
            self.user_modified = true;
        }
    }

    // --- Range marker ---

    pub fn set_marker_bound(&mut self, kind: BoundKind, row: usize) {
        self.marker.set_bound(kind, row);
    }

    pub fn toggle_marker_enabled(&mut self) {
        self.marker.toggle_enabled();
    }

    pub fn begin_marker_drag(&self, kind: BoundKind) -> MarkerDrag {
        MarkerDrag::begin(&self.marker, kind)
    }

    pub fn finish_marker_drag(&mut self, drag: MarkerDrag) -> DragOutcome {
        drag.release(&mut self.marker)
    }

    // --- Column selection ---

    /// Column header click: untokenize a tokenized column, otherwise flip
    /// its selection.
    pub fn toggle_column_selection(&mut self, col: usize) -> Result<(), EngineError> {
        self.table.check_column(col)?;
        if self.tokenized_columns.contains(&col) {
            self.untokenize_column(col);
        } else if !self.selected_columns.remove(&col) {
            self.selected_columns.insert(col);
        }
        self.mark_table_changed();
        Ok(())
    }

    /// Remove every token of a tokenized column. Returns false (and changes
    /// nothing) when the column is not tokenized.
    pub fn untokenize_column(&mut self, col: usize) -> bool {
        if !self.tokenized_columns.contains(&col) {
            return false;
        }

        let mut cleared: Vec<Token> = Vec::new();
        for row in 0..self.table.row_count() {
            if let Some(token) = self.table.cell_mut(row, col).and_then(|c| c.clear_token()) {
                if !cleared.contains(&token) {
                    cleared.push(token);
                }
            }
        }
        let released = cleared
            .iter()
            .filter(|token| self.store.release_if_unused(token, &self.table, col))
            .count();
        log::debug!(
            "untokenized column {}: {} distinct tokens cleared, {} released",
            col + 1,
            cleared.len(),
            released
        );

        self.tokenized_columns.remove(&col);
        self.overrides.clear_column(col);

        if self.tokenized_columns.is_empty() {
            self.has_tokenized_data = false;
            self.export_session.reset();
            self.view_mode = ViewMode::Original;
        }
        self.enforce_view_availability();
        true
    }

    // --- Cell toggle ---

    /// Click on a cell's marker. Applies to the whole cluster of cells in the
    /// column sharing the clicked value (a blank cell is its own cluster).
    pub fn toggle_cell_tokenization(&mut self, row: usize, col: usize) -> Result<(), EngineError> {
        self.table.check_cell(row, col)?;
        let Some(cell) = self.table.cell(row, col) else {
            return Err(EngineError::CellOutOfBounds { row, col });
        };
        let has_token = cell.is_tokenized();
        let blank = cell.original().is_blank();
        let text = cell.original().as_text().into_owned();
        let cluster = self.table.cluster(row, col);

        if self.tokenized_columns.contains(&col) {
            if has_token {
                if self.overrides.has(row, col, Mark::Excluded) {
                    for &r in &cluster {
                        self.overrides.remove(r, col, Mark::Excluded);
                        self.overrides.insert(r, col, Mark::Included);
                    }
                } else if self.overrides.has(row, col, Mark::Included) {
                    for &r in &cluster {
                        self.overrides.remove(r, col, Mark::Included);
                    }
                } else {
                    let mark = if self.marker.row_in_range(row) {
                        Mark::Excluded
                    } else {
                        Mark::Included
                    };
                    for &r in &cluster {
                        self.overrides.insert(r, col, mark);
                    }
                }
            } else if self.overrides.has(row, col, Mark::Included) {
                // The point token stays on the cell; only the override goes.
                for &r in &cluster {
                    self.overrides.remove(r, col, Mark::Included);
                }
            } else {
                let token = if blank {
                    None
                } else {
                    Some(self.store.get_or_create_token(&text)?)
                };
                for &r in &cluster {
                    self.overrides.insert(r, col, Mark::Included);
                    if let (Some(token), Some(cell)) = (&token, self.table.cell_mut(r, col)) {
                        cell.set_token(token.clone());
                    }
                }
                if token.is_some() {
                    self.has_tokenized_data = true;
                }
            }
        } else if has_token {
            if self.overrides.has(row, col, Mark::Included) {
                for &r in &cluster {
                    self.overrides.remove(r, col, Mark::Included);
                }
            }
            let now_inactive = !self.overrides.has(row, col, Mark::Inactive);
            for &r in &cluster {
                if now_inactive {
                    self.overrides.insert(r, col, Mark::Inactive);
                } else {
                    self.overrides.remove(r, col, Mark::Inactive);
                }
            }
        } else {
            let queue = !self.overrides.has(row, col, Mark::Included);
            for &r in &cluster {
                if queue {
                    self.overrides.insert(r, col, Mark::Included);
                } else {
                    self.overrides.remove(r, col, Mark::Included);
                }
            }
        }

        self.mark_table_changed();
        Ok(())
    }

    // --- Tokenization ---

    /// Selected columns or queued point cells are waiting for tokenization.
    pub fn has_pending_tokenization(&self) -> bool {
        if self.table.is_empty() {
            return false;
        }
        !self.selected_columns.is_empty() || !self.point_columns().is_empty()
    }

    /// Non-tokenized, non-selected columns with queued cells.
    fn point_columns(&self) -> Vec<usize> {
        self.overrides
            .columns_with(Mark::Included)
            .into_iter()
            .filter(|c| !self.tokenized_columns.contains(c) && !self.selected_columns.contains(c))
            .collect()
    }

    /// Tokenize every selected column in full (range-independent) and give
    /// each queued cell of other columns a point token.
    ///
    /// All new tokens are generated before anything is changed, so a failing
    /// random source leaves the state untouched.
    pub fn tokenize_columns(&mut self) -> Result<TokenizeSummary, EngineError> {
        if self.table.is_empty() {
            return Err(EngineError::NoTable);
        }

        let selected: Vec<usize> = self.selected_columns.iter().copied().collect();
        let point_columns = self.point_columns();

        let mut needed: Vec<String> = Vec::new();
        for &col in &selected {
            for row in 0..self.table.row_count() {
                if self.overrides.has(row, col, Mark::Excluded) {
                    continue;
                }
                if let Some(cell) = self.table.cell(row, col) {
                    if !cell.is_tokenized() && !cell.original().is_blank() {
                        needed.push(cell.original().as_text().into_owned());
                    }
                }
            }
        }
        for &col in &point_columns {
            for row in self.overrides.rows_with(col, Mark::Included) {
                if let Some(cell) = self.table.cell(row, col) {
                    if !cell.original().is_blank() {
                        needed.push(cell.original().as_text().into_owned());
                    }
                }
            }
        }
        let pending = self.store.prepare(needed.iter().map(String::as_str))?;

        let had_tokens_before = self.tokens_available();
        let mut summary = TokenizeSummary {
            new_tokens: pending.len(),
            ..TokenizeSummary::default()
        };
        self.store.commit(pending);

        for &col in &selected {
            for row in 0..self.table.row_count() {
                if self.overrides.has(row, col, Mark::Excluded) {
                    continue;
                }
                let Some(cell) = self.table.cell(row, col) else {
                    continue;
                };
                if cell.is_tokenized() {
                    // Earlier point token is kept and reactivated.
                    self.overrides.remove(row, col, Mark::Inactive);
                    summary.column_cells += 1;
                    continue;
                }
                if cell.original().is_blank() {
                    continue;
                }
                if self.assign_token(row, col) {
                    summary.column_cells += 1;
                }
            }
            self.selected_columns.remove(&col);
            self.tokenized_columns.insert(col);
            summary.columns.push(col);
        }

        for &col in &point_columns {
            for row in self.overrides.rows_with(col, Mark::Included) {
                let blank = self.table.cell(row, col).map_or(true, |c| c.original().is_blank());
                if blank {
                    continue;
                }
                if self.assign_token(row, col) {
                    summary.point_cells += 1;
                    self.overrides.remove(row, col, Mark::Included);
                    self.overrides.remove(row, col, Mark::Inactive);
                }
            }
        }

        self.has_tokenized_data |= summary.column_cells + summary.point_cells > 0;
        self.export_session.reset();
        self.enforce_view_availability();

        if !self.auto_switched && !had_tokens_before && self.tokens_available() {
            self.view_mode = ViewMode::Tokenized;
            self.auto_switched = true;
            summary.switched_view = true;
        }

        log::debug!(
            "tokenized {} column(s), {} column cells, {} point cells, {} new tokens",
            summary.columns.len(),
            summary.column_cells,
            summary.point_cells,
            summary.new_tokens
        );
        Ok(summary)
    }

    /// Store token for the cell's value onto the cell.
    fn assign_token(&mut self, row: usize, col: usize) -> bool {
        let Some(text) = self.table.cell(row, col).map(|c| c.original().as_text().into_owned()) else {
            return false;
        };
        let Some(token) = self.store.token_for(&text).cloned() else {
            log::warn!("no token registered for cell ({}, {})", row + 1, col + 1);
            return false;
        };
        match self.table.cell_mut(row, col) {
            Some(cell) => {
                cell.set_token(token);
                true
            }
            None => false,
        }
    }

    // --- View mode ---

    fn tokens_available(&self) -> bool {
        self.has_tokenized_data && !self.tokenized_columns.is_empty()
    }

    fn enforce_view_availability(&mut self) {
        if !self.tokens_available() && self.view_mode != ViewMode::Original {
            self.view_mode = ViewMode::Original;
        }
    }

    pub fn available_view_modes(&self) -> Vec<ViewMode> {
        if self.tokens_available() {
            vec![ViewMode::Original, ViewMode::Tokenized, ViewMode::Both]
        } else {
            vec![ViewMode::Original]
        }
    }

    /// Switch the view, falling back to original when token views are not
    /// available. Returns the mode now in effect.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> ViewMode {
        if mode != ViewMode::Original && !self.tokens_available() {
            log::warn!("view mode '{}' unavailable without tokenized columns", mode);
            self.view_mode = ViewMode::Original;
        } else {
            self.view_mode = mode;
        }
        self.view_mode
    }

    // --- Export bookkeeping ---

    pub fn export_stamp(&mut self) -> ExportStamp {
        self.export_session.stamp().clone()
    }

    pub fn export_file_name(&mut self, kind: ArtifactKind) -> String {
        self.export_session.file_name(kind)
    }

    pub fn record_export(&mut self, kind: ArtifactKind) {
        match kind {
            ArtifactKind::Table(_) => {
                self.table_exported = true;
                self.mark_table_changed();
            }
            ArtifactKind::Dictionary => self.dictionary_exported = true,
            ArtifactKind::Bundle => {
                self.table_exported = true;
                self.dictionary_exported = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export_rows, resolve_cell_export};
    use crate::export_session::TableFormat;
    use proptest::prelude::*;

    fn rows(values: &[&[&str]]) -> Vec<Vec<Value>> {
        values
            .iter()
            .map(|r| r.iter().map(|v| Value::from(*v)).collect())
            .collect()
    }

    fn column(values: &[&str]) -> Vec<Vec<Value>> {
        values.iter().map(|v| vec![Value::from(*v)]).collect()
    }

    fn recognized(data: Vec<Vec<Value>>) -> TokenizationState {
        let mut state = TokenizationState::new();
        state.recognize(data).unwrap();
        state
    }

    fn token(state: &TokenizationState, row: usize, col: usize) -> Option<Token> {
        state.table().cell(row, col).unwrap().token().cloned()
    }

    #[test]
    fn test_tokenize_shares_tokens_and_skips_blanks() {
        let mut state = recognized(column(&["a", "b", "a", "", "c"]));
        state.toggle_column_selection(0).unwrap();
        let summary = state.tokenize_columns().unwrap();

        assert_eq!(token(&state, 0, 0), token(&state, 2, 0));
        assert!(token(&state, 0, 0).is_some());
        assert!(!state.table().cell(3, 0).unwrap().is_tokenized());
        assert_eq!(state.tokenized_columns().iter().copied().collect::<Vec<_>>(), vec![0]);
        assert!(state.selected_columns().is_empty());
        assert_eq!(summary.columns, vec![0]);
        assert_eq!(summary.column_cells, 4);
        assert_eq!(summary.new_tokens, 3);
        assert!(summary.switched_view);
        assert!(state.has_tokenized_data());
    }

    #[test]
    fn test_tokenize_ignores_range() {
        let mut state = recognized(column(&["a", "b", "c"]));
        state.set_marker_bound(BoundKind::Start, 2);
        state.set_marker_bound(BoundKind::End, 2);
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        assert!((0..3).all(|r| token(&state, r, 0).is_some()));
    }

    #[test]
    fn test_token_reused_across_columns() {
        let mut state = recognized(rows(&[&["alice", "bob"], &["carol", "alice"]]));
        state.toggle_column_selection(0).unwrap();
        state.toggle_column_selection(1).unwrap();
        state.tokenize_columns().unwrap();
        assert_eq!(token(&state, 0, 0), token(&state, 1, 1));
        assert_eq!(state.store().len(), 3);
    }

    #[test]
    fn test_auto_switch_happens_once() {
        let mut state = recognized(rows(&[&["a", "b"]]));
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        assert_eq!(state.view_mode(), ViewMode::Tokenized);

        state.set_view_mode(ViewMode::Original);
        state.toggle_column_selection(0).unwrap(); // untokenize
        state.toggle_column_selection(1).unwrap();
        let summary = state.tokenize_columns().unwrap();
        assert!(!summary.switched_view);
        assert_eq!(state.view_mode(), ViewMode::Original);
    }

    #[test]
    fn test_untokenize_releases_and_is_idempotent() {
        let mut state = recognized(rows(&[&["a", "a"], &["b", "c"]]));
        state.toggle_column_selection(0).unwrap();
        state.toggle_column_selection(1).unwrap();
        state.tokenize_columns().unwrap();
        assert_eq!(state.store().len(), 3);

        assert!(state.untokenize_column(0));
        // "a" still held by column 1, "b" released
        assert_eq!(state.store().len(), 2);
        assert!(state.store().token_for("a").is_some());
        assert!(state.store().token_for("b").is_none());
        assert!(state.table().cell(0, 0).unwrap().token().is_none());
        assert_eq!(state.table().cell(0, 0).unwrap().original(), &Value::from("a"));
        assert_eq!(state.view_mode(), ViewMode::Tokenized);

        let snapshot = (state.store().len(), state.tokenized_columns().clone(), state.view_mode());
        assert!(!state.untokenize_column(0));
        assert_eq!(snapshot, (state.store().len(), state.tokenized_columns().clone(), state.view_mode()));
    }

    #[test]
    fn test_untokenize_last_column_resets_view() {
        let mut state = recognized(column(&["a", "b"]));
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        state.toggle_cell_tokenization(0, 0).unwrap();
        state.export_stamp();

        state.toggle_column_selection(0).unwrap();
        assert!(state.tokenized_columns().is_empty());
        assert!(state.overrides().is_empty());
        assert!(!state.has_tokenized_data());
        assert_eq!(state.view_mode(), ViewMode::Original);
        assert_eq!(state.available_view_modes(), vec![ViewMode::Original]);
        assert!(state.store().is_empty());
        // A new export session begins
        assert!(state.export_session.current().is_none());
    }

    #[test]
    fn test_toggle_in_range_excludes_then_includes_then_resets() {
        let mut state = recognized(column(&["a", "b", "a"]));
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();

        state.toggle_cell_tokenization(0, 0).unwrap();
        assert_eq!(state.overrides().rows_with(0, Mark::Excluded), vec![0, 2]);

        state.toggle_cell_tokenization(2, 0).unwrap();
        assert!(state.overrides().rows_with(0, Mark::Excluded).is_empty());
        assert_eq!(state.overrides().rows_with(0, Mark::Included), vec![0, 2]);

        state.toggle_cell_tokenization(0, 0).unwrap();
        assert!(state.overrides().is_empty());
    }

    #[test]
    fn test_toggle_out_of_range_includes() {
        let mut state = recognized(column(&["a", "b", "c"]));
        state.set_marker_bound(BoundKind::End, 1);
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();

        state.toggle_cell_tokenization(2, 0).unwrap();
        assert_eq!(state.overrides().rows_with(0, Mark::Included), vec![2]);
        assert!(resolve_cell_export(&state, 2, 0).unwrap().is_token());
    }

    #[test]
    fn test_excluded_cell_not_tokenized_by_column_pass() {
        // Not reachable through toggles alone; set the mark directly.
        let mut state = recognized(column(&["a", "b"]));
        state.overrides.insert(1, 0, Mark::Excluded);
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        assert!(token(&state, 0, 0).is_some());
        assert!(token(&state, 1, 0).is_none());
    }

    #[test]
    fn test_tokenized_column_cell_without_token_gets_point_token() {
        let mut state = recognized(column(&["a", "b"]));
        state.overrides.insert(1, 0, Mark::Excluded);
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        state.overrides.remove(1, 0, Mark::Excluded);
        assert!(token(&state, 1, 0).is_none());

        state.toggle_cell_tokenization(1, 0).unwrap();
        assert!(token(&state, 1, 0).is_some());
        assert!(state.overrides().has(1, 0, Mark::Included));

        // Removing the override keeps the token
        state.toggle_cell_tokenization(1, 0).unwrap();
        assert!(!state.overrides().has(1, 0, Mark::Included));
        assert!(token(&state, 1, 0).is_some());
    }

    #[test]
    fn test_blank_toggle_affects_single_cell() {
        let mut state = recognized(rows(&[&["", "a"], &["", "b"], &["x", "c"]]));
        state.toggle_cell_tokenization(0, 0).unwrap();
        assert_eq!(state.overrides().count(0, Mark::Included), 1);
        assert!(state.overrides().has(0, 0, Mark::Included));
        assert!(state.is_user_modified());
    }

    #[test]
    fn test_queue_then_point_tokenize() {
        let mut state = recognized(rows(&[&["a", "k"], &["b", "k"], &["c", "m"]]));
        state.toggle_cell_tokenization(0, 1).unwrap();
        assert_eq!(state.overrides().rows_with(1, Mark::Included), vec![0, 1]);
        assert!(state.has_pending_tokenization());

        let summary = state.tokenize_columns().unwrap();
        assert_eq!(summary.point_cells, 2);
        assert!(summary.columns.is_empty());
        assert!(!summary.switched_view);
        assert!(state.overrides().is_empty());
        assert!(!state.has_pending_tokenization());
        assert_eq!(token(&state, 0, 1), token(&state, 1, 1));
        assert!(token(&state, 2, 1).is_none());
        assert_eq!(state.available_view_modes(), vec![ViewMode::Original]);
    }

    #[test]
    fn test_point_token_toggles_active_and_never_requeues() {
        let mut state = recognized(column(&["a", "b"]));
        state.toggle_cell_tokenization(0, 0).unwrap();
        state.tokenize_columns().unwrap();

        state.toggle_cell_tokenization(0, 0).unwrap();
        assert!(state.overrides().has(0, 0, Mark::Inactive));
        assert!(!state.has_pending_tokenization());
        state.toggle_cell_tokenization(0, 0).unwrap();
        assert!(state.overrides().is_empty());
        assert!(token(&state, 0, 0).is_some());
    }

    #[test]
    fn test_column_pass_reactivates_point_token() {
        let mut state = recognized(column(&["a", "b"]));
        state.toggle_cell_tokenization(0, 0).unwrap();
        state.tokenize_columns().unwrap();
        let point = token(&state, 0, 0);
        state.toggle_cell_tokenization(0, 0).unwrap();
        assert!(state.overrides().has(0, 0, Mark::Inactive));

        state.toggle_column_selection(0).unwrap();
        let summary = state.tokenize_columns().unwrap();
        assert_eq!(token(&state, 0, 0), point);
        assert!(!state.overrides().has(0, 0, Mark::Inactive));
        assert_eq!(summary.column_cells, 2);
        assert_eq!(summary.new_tokens, 1);
    }

    #[test]
    fn test_queued_cells_in_selected_column_become_inclusions() {
        let mut state = recognized(column(&["a", "b", "c"]));
        state.set_marker_bound(BoundKind::End, 1);
        state.toggle_cell_tokenization(2, 0).unwrap();
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();

        assert!(state.overrides().has(2, 0, Mark::Included));
        assert!(resolve_cell_export(&state, 2, 0).unwrap().is_token());
        assert!(!resolve_cell_export(&state, 1, 0).unwrap().is_token());
    }

    #[test]
    fn test_recognize_rejects_without_mutating() {
        let mut state = recognized(column(&["a"]));
        state.toggle_column_selection(0).unwrap();
        assert_eq!(state.recognize(vec![]), Err(EngineError::EmptySheet));
        assert_eq!(state.recognize(vec![vec![]]), Err(EngineError::NoColumns));
        assert!(state.is_column_selected(0));
        assert_eq!(state.table().row_count(), 1);
    }

    #[test]
    fn test_recognize_keeps_store_and_clamps_marker() {
        let mut state = recognized(column(&["a", "b", "c", "d"]));
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        state.set_marker_bound(BoundKind::Start, 3);
        assert!(state.needs_recognize_confirmation());

        state.recognize(column(&["x", "y"])).unwrap();
        assert_eq!(state.store().len(), 4);
        assert!(state.tokenized_columns().is_empty());
        assert_eq!(state.view_mode(), ViewMode::Original);
        assert_eq!((state.marker().start_row(), state.marker().end_row()), (2, 2));
        assert!(!state.needs_recognize_confirmation());
    }

    #[test]
    fn test_change_sheet_and_reset() {
        let mut state = recognized(column(&["a", "b"]));
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();

        state.change_sheet();
        assert!(state.table().is_empty());
        assert_eq!(state.store().len(), 2);
        assert_eq!((state.marker().start_row(), state.marker().end_row()), (1, 1));
        assert_eq!(state.toggle_column_selection(0), Err(EngineError::NoTable));

        state.reset();
        assert!(state.store().is_empty());
    }

    #[test]
    fn test_tokenize_without_table() {
        let mut state = TokenizationState::new();
        assert_eq!(state.tokenize_columns(), Err(EngineError::NoTable));
        assert!(!state.has_pending_tokenization());
    }

    #[test]
    fn test_export_session_resets_on_tokenize() {
        let mut state = recognized(column(&["a", "b"]));
        state.toggle_cell_tokenization(0, 0).unwrap();
        state.tokenize_columns().unwrap();
        let name = state.export_file_name(ArtifactKind::Dictionary);
        assert_eq!(name, state.export_file_name(ArtifactKind::Dictionary));

        state.record_export(ArtifactKind::Table(TableFormat::Csv));
        assert!(state.table_exported());
        assert!(!state.dictionary_exported());

        state.toggle_cell_tokenization(1, 0).unwrap();
        state.tokenize_columns().unwrap();
        assert!(state.export_session.current().is_none());
    }

    #[test]
    fn test_marker_drag_through_state() {
        let mut state = recognized(column(&["a", "b", "c"]));
        let mut drag = state.begin_marker_drag(BoundKind::Start);
        drag.hover(3);
        assert_eq!(
            state.finish_marker_drag(drag),
            DragOutcome::Moved { kind: BoundKind::Start, row: 3 }
        );
        assert_eq!((state.marker().start_row(), state.marker().end_row()), (3, 3));

        let drag = state.begin_marker_drag(BoundKind::End);
        assert_eq!(state.finish_marker_drag(drag), DragOutcome::Toggled { enabled: false });
        state.toggle_column_selection(0).unwrap();
        state.tokenize_columns().unwrap();
        assert!(export_rows(&state).iter().all(|r| r[0].as_text().starts_with("[[")));
    }

    proptest! {
        #[test]
        fn prop_cluster_toggle_is_uniform(
            values in proptest::collection::vec(prop_oneof![Just("a"), Just("b"), Just(""), Just(" ")], 1..12),
            pick in 0usize..12,
            tokenize_first in any::<bool>(),
        ) {
            let mut state = recognized(column(&values));
            let row = pick % values.len();
            if tokenize_first {
                state.toggle_column_selection(0).unwrap();
                state.tokenize_columns().unwrap();
            }
            let cluster = state.table().cluster(row, 0);
            state.toggle_cell_tokenization(row, 0).unwrap();

            if values[row].trim().is_empty() {
                prop_assert_eq!(cluster.clone(), vec![row]);
            }
            let marks = |r: usize| {
                [Mark::Excluded, Mark::Included, Mark::Inactive].map(|m| state.overrides().has(r, 0, m))
            };
            let expected = marks(row);
            prop_assert!(expected.iter().any(|&m| m));
            for r in 0..values.len() {
                if cluster.contains(&r) {
                    prop_assert_eq!(marks(r), expected);
                } else {
                    prop_assert_eq!(marks(r), [false; 3]);
                }
            }
        }

        #[test]
        fn prop_store_maps_stay_inverse(
            values in proptest::collection::vec("[a-d]{0,2}", 1..10),
            cols in proptest::collection::vec(0usize..2, 1..4),
        ) {
            let data: Vec<Vec<Value>> = values
                .iter()
                .map(|v| vec![Value::from(v.as_str()), Value::from(format!("{v}!"))])
                .collect();
            let mut state = recognized(data);
            for col in cols {
                state.toggle_column_selection(col).unwrap();
                state.tokenize_columns().unwrap();
            }
            for (token, original) in state.store().iter() {
                prop_assert_eq!(state.store().token_for(original), Some(token));
            }
            for cells in state.table().rows() {
                for cell in cells {
                    if let Some(token) = cell.token() {
                        let text = cell.original().as_text();
                        prop_assert_eq!(state.store().original_for(token), Some(text.as_ref()));
                    }
                }
            }
        }
    }
}
