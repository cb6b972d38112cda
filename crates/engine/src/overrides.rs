use std::collections::BTreeMap;

/// Marks a single cell can carry. Marks are independent flags; which of them
/// matters depends on the column state (see [`OverrideState::resolve`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    /// Tokenized column: show/export the original despite range default.
    Excluded,
    /// Tokenized column: show/export the token despite range default.
    /// Non-tokenized column: queued for point tokenization.
    Included,
    /// Point token in a non-tokenized column, temporarily deactivated.
    Inactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellMarks {
    excluded: bool,
    included: bool,
    inactive: bool,
}

impl CellMarks {
    fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::Excluded => self.excluded,
            Mark::Included => self.included,
            Mark::Inactive => self.inactive,
        }
    }

    fn set(&mut self, mark: Mark, on: bool) {
        match mark {
            Mark::Excluded => self.excluded = on,
            Mark::Included => self.included = on,
            Mark::Inactive => self.inactive = on,
        }
    }

    fn is_empty(&self) -> bool {
        !(self.excluded || self.included || self.inactive)
    }
}

/// Sparse per-cell override marks, keyed column then row (both 0-based).
///
/// A cell record exists only while at least one mark is set and a column
/// entry only while it holds at least one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLayer {
    columns: BTreeMap<usize, BTreeMap<usize, CellMarks>>,
}

impl OverrideLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, row: usize, col: usize, mark: Mark) -> bool {
        self.columns
            .get(&col)
            .and_then(|rows| rows.get(&row))
            .is_some_and(|m| m.get(mark))
    }

    pub fn insert(&mut self, row: usize, col: usize, mark: Mark) {
        self.columns
            .entry(col)
            .or_default()
            .entry(row)
            .or_default()
            .set(mark, true);
    }

    /// Clear one mark, pruning the cell record and column entry when they empty out.
    pub fn remove(&mut self, row: usize, col: usize, mark: Mark) {
        let Some(rows) = self.columns.get_mut(&col) else {
            return;
        };
        if let Some(marks) = rows.get_mut(&row) {
            marks.set(mark, false);
            if marks.is_empty() {
                rows.remove(&row);
            }
        }
        if rows.is_empty() {
            self.columns.remove(&col);
        }
    }

    /// Rows of `col` carrying `mark`, ascending.
    pub fn rows_with(&self, col: usize, mark: Mark) -> Vec<usize> {
        self.columns
            .get(&col)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, m)| m.get(mark))
                    .map(|(row, _)| *row)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Columns holding at least one cell with `mark`, ascending.
    pub fn columns_with(&self, mark: Mark) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|(_, rows)| rows.values().any(|m| m.get(mark)))
            .map(|(col, _)| *col)
            .collect()
    }

    pub fn count(&self, col: usize, mark: Mark) -> usize {
        self.columns
            .get(&col)
            .map_or(0, |rows| rows.values().filter(|m| m.get(mark)).count())
    }

    pub fn clear_column(&mut self, col: usize) {
        self.columns.remove(&col);
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of columns with any mark.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// The one override that governs a cell, derived from its marks and the
/// state of its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideState {
    None,
    /// Tokenized column, forced to original.
    Excluded,
    /// Tokenized column, forced to token.
    Included,
    /// Point token, deactivated.
    PointInactive,
    /// Point token, active.
    PointActive,
    /// Waiting for point tokenization.
    Queued,
}

impl OverrideState {
    pub fn resolve(
        layer: &OverrideLayer,
        row: usize,
        col: usize,
        column_tokenized: bool,
        has_token: bool,
    ) -> OverrideState {
        if column_tokenized {
            if layer.has(row, col, Mark::Excluded) {
                OverrideState::Excluded
            } else if layer.has(row, col, Mark::Included) {
                OverrideState::Included
            } else {
                OverrideState::None
            }
        } else if has_token {
            if layer.has(row, col, Mark::Inactive) {
                OverrideState::PointInactive
            } else {
                OverrideState::PointActive
            }
        } else if layer.has(row, col, Mark::Included) {
            OverrideState::Queued
        } else {
            OverrideState::None
        }
    }

    /// Cells under an explicit user override get an outline.
    pub fn is_outlined(self) -> bool {
        matches!(
            self,
            OverrideState::Excluded
                | OverrideState::Included
                | OverrideState::PointInactive
                | OverrideState::PointActive
        )
    }
}
