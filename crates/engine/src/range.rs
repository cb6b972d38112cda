use serde::{Deserialize, Serialize};

/// Which handle of the range marker is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Start,
    End,
}

/// Row bounds gating which rows of a tokenized column show and export tokens.
///
/// Bounds are 1-based and inclusive, always `1 <= start <= end <= max(1, row_count)`.
/// A disabled marker keeps its stored bounds but its effective range is the
/// whole table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeMarker {
    start_row: usize,
    end_row: usize,
    enabled: bool,
    row_count: usize,
}

impl Default for RangeMarker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RangeMarker {
    /// Marker covering the whole table, enabled.
    pub fn new(row_count: usize) -> Self {
        Self {
            start_row: 1,
            end_row: row_count.max(1),
            enabled: true,
            row_count,
        }
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn end_row(&self) -> usize {
        self.end_row
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    fn max_row(&self) -> usize {
        self.row_count.max(1)
    }

    /// Move one handle. Dragging a handle past the other swaps them.
    pub fn set_bound(&mut self, kind: BoundKind, row: usize) {
        let clamped = row.clamp(1, self.max_row());
        match kind {
            BoundKind::Start => self.start_row = clamped,
            BoundKind::End => self.end_row = clamped,
        }
        self.normalize();
    }

    pub fn bound(&self, kind: BoundKind) -> usize {
        match kind {
            BoundKind::Start => self.start_row,
            BoundKind::End => self.end_row,
        }
    }

    pub fn toggle_enabled(&mut self) {
        self.enabled = !self.enabled;
        self.normalize();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.toggle_enabled();
        }
    }

    /// Re-clamp stored bounds after the row count changed.
    pub fn recompute(&mut self, row_count: usize) {
        self.row_count = row_count;
        self.normalize();
    }

    /// Explicitly place both handles (e.g. after a table rebuild).
    pub fn reset(&mut self, row_count: usize, start_row: usize, end_row: usize) {
        self.row_count = row_count;
        self.start_row = start_row;
        self.end_row = end_row;
        self.enabled = true;
        self.normalize();
    }

    fn normalize(&mut self) {
        let max_row = self.max_row();
        self.start_row = self.start_row.clamp(1, max_row);
        self.end_row = self.end_row.clamp(1, max_row);
        if self.start_row > self.end_row {
            std::mem::swap(&mut self.start_row, &mut self.end_row);
        }
    }

    /// 1-based first row of the effective range.
    pub fn effective_start(&self) -> usize {
        if self.enabled {
            self.start_row
        } else {
            1
        }
    }

    /// 1-based last row of the effective range.
    pub fn effective_end(&self) -> usize {
        if self.enabled {
            self.end_row
        } else {
            self.max_row()
        }
    }

    /// Whether the 0-based row index lies inside the effective range.
    pub fn row_in_range(&self, idx0: usize) -> bool {
        idx0 + 1 >= self.effective_start() && idx0 < self.effective_end()
    }
}

/// What releasing a marker drag did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// The handle was moved; `row` is the committed (clamped) row.
    Moved { kind: BoundKind, row: usize },
    /// The pointer never left the handle's row: treated as a click.
    Toggled { enabled: bool },
}

/// A provisional marker drag. Nothing touches the marker until
/// [`MarkerDrag::release`]; dropping the gesture discards it.
#[derive(Debug, Clone)]
pub struct MarkerDrag {
    kind: BoundKind,
    origin_row: usize,
    candidate_row: usize,
    activated: bool,
}

impl MarkerDrag {
    pub fn begin(marker: &RangeMarker, kind: BoundKind) -> Self {
        let origin_row = marker.bound(kind);
        Self {
            kind,
            origin_row,
            candidate_row: origin_row,
            activated: false,
        }
    }

    /// Pointer moved over `row` (1-based).
    pub fn hover(&mut self, row: usize) {
        self.candidate_row = row;
        if row != self.origin_row {
            self.activated = true;
        }
    }

    pub fn kind(&self) -> BoundKind {
        self.kind
    }

    pub fn candidate_row(&self) -> usize {
        self.candidate_row
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Abandon the gesture (pointer left the window, Escape).
    pub fn cancel(self) {
        log::debug!("marker drag on {:?} cancelled at row {}", self.kind, self.candidate_row);
    }

    pub fn release(self, marker: &mut RangeMarker) -> DragOutcome {
        if self.activated {
            let row = self.candidate_row.clamp(1, marker.max_row());
            marker.set_bound(self.kind, row);
            DragOutcome::Moved { kind: self.kind, row }
        } else {
            marker.toggle_enabled();
            DragOutcome::Toggled { enabled: marker.is_enabled() }
        }
    }
}
