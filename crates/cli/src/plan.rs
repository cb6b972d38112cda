// Tokenization plans: the ordered user actions replayed against a state.
//
// A plan comes either from command-line flags or from a TOML file with a
// `[[step]]` list. Rows and columns are 1-based everywhere in a plan.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;

use pseudogrid_engine::error::EngineError;
use pseudogrid_engine::range::BoundKind;
use pseudogrid_engine::state::{TokenizationState, TokenizeSummary};

/// 1-based cell coordinate written `ROW:COL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

pub fn parse_cell_ref(s: &str) -> Result<CellRef, String> {
    let (row, col) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ROW:COL, got '{}'", s))?;
    let row: usize = row.trim().parse().map_err(|_| format!("invalid row in '{}'", s))?;
    let col: usize = col.trim().parse().map_err(|_| format!("invalid column in '{}'", s))?;
    if row == 0 || col == 0 {
        return Err(format!("rows and columns are 1-based, got '{}'", s));
    }
    Ok(CellRef { row, col })
}

fn parse_column(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("columns are 1-based".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("invalid column number '{}'", s)),
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct PlanArgs {
    /// Select a column for tokenization (1-based). Repeatable.
    #[arg(long = "column", value_name = "N", value_parser = parse_column)]
    pub columns: Vec<usize>,

    /// Toggle a cell before tokenizing (queues it in untokenized columns). Repeatable.
    #[arg(long, value_name = "R:C", value_parser = parse_cell_ref)]
    pub queue: Vec<CellRef>,

    /// First row of the tokenization range (1-based)
    #[arg(long, value_name = "N")]
    pub start: Option<usize>,

    /// Last row of the tokenization range (1-based, inclusive)
    #[arg(long, value_name = "N")]
    pub end: Option<usize>,

    /// Disable the range marker (tokens apply to every row)
    #[arg(long)]
    pub no_range: bool,

    /// Toggle a cell after tokenizing (exclude or include it). Repeatable.
    #[arg(long, value_name = "R:C", value_parser = parse_cell_ref)]
    pub toggle: Vec<CellRef>,

    /// Read the steps from a TOML plan file instead
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["columns", "queue", "start", "end", "no_range", "toggle"]
    )]
    pub plan: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Step {
    /// Mark a column for tokenization.
    Select { column: usize },
    /// Cell marker click.
    Toggle { row: usize, column: usize },
    /// Move a range marker handle.
    Bound { kind: BoundKind, row: usize },
    /// Enable or disable the range marker.
    Marker { enabled: bool },
    Tokenize,
    Untokenize { column: usize },
}

impl Step {
    fn check(&self) -> Result<(), String> {
        let zero = match *self {
            Step::Select { column } | Step::Untokenize { column } => column == 0,
            Step::Toggle { row, column } => row == 0 || column == 0,
            Step::Bound { row, .. } => row == 0,
            Step::Marker { .. } | Step::Tokenize => false,
        };
        if zero {
            return Err(format!("{:?}: rows and columns are 1-based", self));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PlanFile {
    #[serde(default, rename = "step")]
    steps: Vec<Step>,
}

/// Ordered list of steps, every index already checked to be 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Result<Self, String> {
        for step in &steps {
            step.check()?;
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        let file: PlanFile = toml::from_str(text).map_err(|e| format!("Invalid plan: {}", e))?;
        Self::new(file.steps)
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read plan '{}': {}", path.display(), e))?;
        Self::from_toml(&text)
    }

    /// Flag order: range, selection, queued cells, tokenize, post-tokenize toggles.
    /// The tokenize step is only added when something was selected or queued.
    pub fn from_flags(args: &PlanArgs) -> Result<Self, String> {
        let mut steps = Vec::new();
        if let Some(row) = args.start {
            steps.push(Step::Bound { kind: BoundKind::Start, row });
        }
        if let Some(row) = args.end {
            steps.push(Step::Bound { kind: BoundKind::End, row });
        }
        if args.no_range {
            steps.push(Step::Marker { enabled: false });
        }
        steps.extend(args.columns.iter().map(|&column| Step::Select { column }));
        steps.extend(args.queue.iter().map(|c| Step::Toggle { row: c.row, column: c.col }));
        if !args.columns.is_empty() || !args.queue.is_empty() {
            steps.push(Step::Tokenize);
        }
        steps.extend(args.toggle.iter().map(|c| Step::Toggle { row: c.row, column: c.col }));
        Self::new(steps)
    }

    /// Load the plan file when one is given, otherwise build from the flags.
    pub fn from_args(args: &PlanArgs) -> Result<Self, String> {
        match &args.plan {
            Some(path) => Self::load(path),
            None => Self::from_flags(args),
        }
    }

    /// Run every step in order. Stops at the first rejected step.
    pub fn apply(&self, state: &mut TokenizationState) -> Result<Vec<TokenizeSummary>, EngineError> {
        let mut runs = Vec::new();
        for step in &self.steps {
            log::debug!("plan step {:?}", step);
            match *step {
                Step::Select { column } => {
                    let col = column - 1;
                    if state.is_column_tokenized(col) {
                        log::warn!("column {} is already tokenized", column);
                    } else if !state.is_column_selected(col) {
                        state.toggle_column_selection(col)?;
                    }
                }
                Step::Toggle { row, column } => state.toggle_cell_tokenization(row - 1, column - 1)?,
                Step::Bound { kind, row } => state.set_marker_bound(kind, row),
                Step::Marker { enabled } => {
                    if state.marker().is_enabled() != enabled {
                        state.toggle_marker_enabled();
                    }
                }
                Step::Tokenize => runs.push(state.tokenize_columns()?),
                Step::Untokenize { column } => {
                    if !state.untokenize_column(column - 1) {
                        log::warn!("column {} is not tokenized", column);
                    }
                }
            }
        }
        Ok(runs)
    }
}
