//! Display resolver: what a view layer should paint for each cell.
//!
//! Everything here is a pure read of [`TokenizationState`]. The rules mirror
//! the export resolver in [`crate::export`] but are derived independently;
//! the two are kept in agreement by tests.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::overrides::OverrideState;
use crate::state::TokenizationState;

/// Which values the table view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Original,
    Tokenized,
    Both,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Original => "original",
            ViewMode::Tokenized => "tokenized",
            ViewMode::Both => "both",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(ViewMode::Original),
            "tokenized" => Ok(ViewMode::Tokenized),
            "both" => Ok(ViewMode::Both),
            other => Err(format!("unknown view mode '{}' (expected original, tokenized or both)", other)),
        }
    }
}

/// Cell background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// White.
    None,
    /// Yellow: will be tokenized.
    Selected,
    /// Green: token in effect.
    Tokenized,
}

/// Small per-cell indicator next to the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Excluded,
    Tokenized,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnHeader {
    Plain,
    Selected,
    Tokenized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent<'a> {
    Plain(Cow<'a, str>),
    /// Original above token, used in [`ViewMode::Both`].
    Stacked { original: Cow<'a, str>, token: &'a str },
}

impl CellContent<'_> {
    /// Single-line rendering: stacked content joins both parts.
    pub fn to_line(&self) -> String {
        match self {
            CellContent::Plain(text) => text.to_string(),
            CellContent::Stacked { original, token } => format!("{} / {}", original, token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState<'a> {
    pub background: Background,
    pub marker: Option<MarkerKind>,
    pub outlined: bool,
    /// True when the rendered content includes the cell's token.
    pub shows_token: bool,
    pub override_state: OverrideState,
    pub content: CellContent<'a>,
    pub tooltip: Option<Cow<'a, str>>,
}

pub fn resolve_cell_display(
    state: &TokenizationState,
    row: usize,
    col: usize,
) -> Result<DisplayState<'_>, EngineError> {
    state.table().check_cell(row, col)?;
    let table = state.table();
    let Some(cell) = table.cell(row, col) else {
        return Err(EngineError::CellOutOfBounds { row, col });
    };

    let column_tokenized = state.is_column_tokenized(col);
    let in_range = state.marker().row_in_range(row);
    let override_state =
        OverrideState::resolve(state.overrides(), row, col, column_tokenized, cell.is_tokenized());

    let (background, wants_token, marker) = match override_state {
        OverrideState::Excluded => (Background::None, false, Some(MarkerKind::Excluded)),
        OverrideState::Included => (Background::Tokenized, true, Some(MarkerKind::Tokenized)),
        OverrideState::PointInactive => (Background::None, false, Some(MarkerKind::Excluded)),
        OverrideState::PointActive => (Background::Tokenized, true, Some(MarkerKind::Tokenized)),
        OverrideState::Queued => (Background::Selected, false, Some(MarkerKind::Selected)),
        OverrideState::None if column_tokenized => {
            if in_range && cell.is_tokenized() {
                (Background::Tokenized, true, Some(MarkerKind::Tokenized))
            } else {
                (Background::None, false, None)
            }
        }
        OverrideState::None => {
            if state.is_column_selected(col) && in_range {
                (Background::Selected, false, None)
            } else {
                (Background::None, false, None)
            }
        }
    };

    // Explicit overrides stay visible even in the original view.
    let mode = state.view_mode();
    let mode_allows = match mode {
        ViewMode::Original => {
            matches!(override_state, OverrideState::Included | OverrideState::PointActive)
        }
        ViewMode::Tokenized | ViewMode::Both => true,
    };

    let original = cell.original().as_text();
    let token = cell.token().filter(|_| wants_token && mode_allows);

    let (content, tooltip) = match token {
        Some(token) if mode == ViewMode::Both => (
            CellContent::Stacked { original, token: token.as_str() },
            None,
        ),
        Some(token) => {
            let tooltip = if original.is_empty() { None } else { Some(original) };
            (CellContent::Plain(Cow::Borrowed(token.as_str())), tooltip)
        }
        None => (CellContent::Plain(original), None),
    };

    Ok(DisplayState {
        background,
        marker,
        outlined: override_state.is_outlined(),
        shows_token: token.is_some(),
        override_state,
        content,
        tooltip,
    })
}

pub fn column_header(state: &TokenizationState, col: usize) -> ColumnHeader {
    if state.is_column_tokenized(col) {
        ColumnHeader::Tokenized
    } else if state.is_column_selected(col) {
        ColumnHeader::Selected
    } else {
        ColumnHeader::Plain
    }
}
