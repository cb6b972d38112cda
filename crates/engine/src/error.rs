use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// An operation needs a recognized table and there is none.
    NoTable,
    /// The source sheet has no rows.
    EmptySheet,
    /// The source sheet has rows but not a single column.
    NoColumns,
    /// Row/column pair outside the table (0-based).
    CellOutOfBounds { row: usize, col: usize },
    /// Column index outside the table (0-based).
    ColumnOutOfBounds { col: usize },
    /// The OS random source failed; no new token can be created.
    RandomUnavailable(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTable => write!(f, "no table recognized yet"),
            Self::EmptySheet => write!(f, "selected sheet is empty"),
            Self::NoColumns => write!(f, "selected sheet contains no data"),
            Self::CellOutOfBounds { row, col } => {
                write!(f, "cell (row {}, column {}) is outside the table", row + 1, col + 1)
            }
            Self::ColumnOutOfBounds { col } => {
                write!(f, "column {} is outside the table", col + 1)
            }
            Self::RandomUnavailable(msg) => write!(f, "secure random source unavailable: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
