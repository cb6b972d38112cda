// pgrid - headless spreadsheet pseudonymization
//
// Tokenize: replace chosen column values with random [[tokens]] and export the
// table plus the token dictionary. Detokenize: map tokens in free text back
// through a dictionary.

mod exit_codes;
mod plan;
mod render;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use pseudogrid_config::Settings;
use pseudogrid_engine::detokenize::{scan, Occurrence, ScanStats, TokenEntry, TokenFilter};
use pseudogrid_engine::display::ViewMode;
use pseudogrid_engine::error::EngineError;
use pseudogrid_engine::export::collect_used_tokens;
use pseudogrid_engine::export_session::{ArtifactKind, TableFormat};
use pseudogrid_engine::state::TokenizationState;
use pseudogrid_io::artifacts::{self, TableOptions, WrittenArtifact};
use pseudogrid_io::{dictionary, workbook};

use exit_codes::{
    engine_exit_code, EXIT_IO, EXIT_NOTHING_TO_EXPORT, EXIT_PARSE, EXIT_FORMAT, EXIT_SUCCESS,
    EXIT_USAGE,
};
use plan::{Plan, PlanArgs};

#[derive(Parser)]
#[command(name = "pgrid")]
#[command(about = "Pseudonymize spreadsheet columns with random tokens (headless)")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, env = "PGRID_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a workbook
    #[command(after_help = "\
Examples:
  pgrid sheets clients.xlsx
  pgrid sheets export.csv --json")]
    Sheets {
        /// Workbook (xlsx, xls, xlsb, ods, csv, tsv)
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how the table looks after a tokenization plan
    #[command(after_help = "\
Examples:
  pgrid preview clients.xlsx --column 2
  pgrid preview clients.xlsx --column 2 --start 2 --view both
  pgrid preview clients.xlsx --plan steps.toml --json")]
    Preview {
        file: PathBuf,

        /// Sheet name or 1-based index (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,

        #[command(flatten)]
        plan: PlanArgs,

        /// View mode: original, tokenized or both
        #[arg(long, value_name = "MODE")]
        view: Option<ViewMode>,

        /// Maximum rows to print
        #[arg(long, value_name = "N")]
        rows: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tokenize columns and write the table and its dictionary
    #[command(after_help = "\
Examples:
  pgrid tokenize clients.xlsx --column 2 --column 3 --start 2
  pgrid tokenize clients.csv --column 1 --format csv --delimiter ';' -o out/
  pgrid tokenize clients.xlsx --plan steps.toml --format bundle")]
    Tokenize {
        file: PathBuf,

        /// Sheet name or 1-based index (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,

        #[command(flatten)]
        plan: PlanArgs,

        /// Artifacts to write (defaults to the configured table format)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Output directory
        #[arg(long, short = 'o', value_name = "DIR")]
        out: Option<PathBuf>,

        /// CSV delimiter
        #[arg(long)]
        delimiter: Option<char>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace tokens in text with their originals from a dictionary
    #[command(after_help = "\
Examples:
  pgrid detokenize --dict dictionary.json reply.txt
  cat reply.txt | pgrid detokenize --dict dictionary.json --stats
  pgrid detokenize --dict dictionary.json reply.txt --hide-found --stats")]
    Detokenize {
        /// Dictionary JSON exported by `pgrid tokenize`
        #[arg(long, value_name = "FILE")]
        dict: PathBuf,

        /// Text file (omit or - for stdin)
        input: Option<String>,

        /// Hide resolved tokens from the token list
        #[arg(long)]
        hide_found: bool,

        /// Hide unresolved tokens from the token list
        #[arg(long)]
        hide_not_found: bool,

        /// Print the token list and counts to stderr
        #[arg(long)]
        stats: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    /// xlsx table and dictionary
    Xlsx,
    /// CSV table and dictionary
    Csv,
    /// One zip with table and dictionary
    Bundle,
    /// Table, dictionary and bundle
    All,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };

    let result = match cli.command {
        Commands::Sheets { file, json } => cmd_sheets(&file, json),
        Commands::Preview { file, sheet, plan, view, rows, json } => {
            cmd_preview(&file, sheet.as_deref(), &plan, view, rows, json, &settings)
        }
        Commands::Tokenize { file, sheet, plan, format, out, delimiter, json } => {
            cmd_tokenize(&file, sheet.as_deref(), &plan, format, out, delimiter, json, &settings)
        }
        Commands::Detokenize { dict, input, hide_found, hide_not_found, stats, json } => {
            cmd_detokenize(&dict, input.as_deref(), hide_found, hide_not_found, stats, json, &settings)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self { code: EXIT_FORMAT, message: msg.into(), hint: None }
    }

    pub fn engine(err: EngineError) -> Self {
        let hint = match &err {
            EngineError::CellOutOfBounds { .. } | EngineError::ColumnOutOfBounds { .. } => {
                Some("rows and columns are 1-based; run `pgrid preview` to see the table".to_string())
            }
            EngineError::EmptySheet | EngineError::NoColumns => {
                Some("pick another sheet with --sheet".to_string())
            }
            _ => None,
        };
        Self { code: engine_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .and_then(|_| handle.flush())
        .map_err(|e| CliError::io(e.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    write_stdout(&format!("{}\n", json))
}

fn require_file(path: &Path) -> Result<(), CliError> {
    if !path.is_file() {
        return Err(CliError::io(format!("{}: no such file", path.display())));
    }
    Ok(())
}

fn open_workbook(path: &Path) -> Result<workbook::SourceWorkbook, CliError> {
    require_file(path)?;
    workbook::open(path).map_err(|e| {
        CliError::format(e).with_hint("supported: xlsx, xlsm, xls, xlsb, ods, csv, tsv, txt")
    })
}

/// Open the workbook, pick the sheet and recognize its table.
fn load_state(path: &Path, sheet: Option<&str>) -> Result<(String, TokenizationState), CliError> {
    let wb = open_workbook(path)?;
    let source = match sheet {
        Some(selector) => wb.sheet(selector).ok_or_else(|| {
            CliError::args(format!("sheet '{}' not found", selector))
                .with_hint(format!("available sheets: {}", wb.sheet_names().join(", ")))
        })?,
        None => wb.first().ok_or_else(|| CliError::format("File contains no sheets"))?,
    };

    let mut state = TokenizationState::new();
    state.recognize(source.rows.clone()).map_err(CliError::engine)?;
    Ok((source.name.clone(), state))
}

/// Build the plan and run it against a freshly recognized sheet.
fn run_plan(
    path: &Path,
    sheet: Option<&str>,
    args: &PlanArgs,
) -> Result<(String, TokenizationState, usize), CliError> {
    if let Some(plan_path) = &args.plan {
        require_file(plan_path)?;
    }
    let plan = Plan::from_args(args).map_err(CliError::parse)?;
    let (name, mut state) = load_state(path, sheet)?;
    let runs = plan.apply(&mut state).map_err(CliError::engine)?;
    let new_tokens = runs.iter().map(|r| r.new_tokens).sum();
    Ok((name, state, new_tokens))
}

// ============================================================================
// sheets
// ============================================================================

#[derive(Serialize)]
struct SheetInfo<'a> {
    index: usize,
    name: &'a str,
    rows: usize,
    columns: usize,
}

fn cmd_sheets(path: &Path, json: bool) -> Result<(), CliError> {
    let wb = open_workbook(path)?;
    let infos: Vec<SheetInfo<'_>> = wb
        .sheets
        .iter()
        .enumerate()
        .map(|(i, s)| SheetInfo { index: i + 1, name: &s.name, rows: s.row_count(), columns: s.col_count() })
        .collect();

    if json {
        return print_json(&infos);
    }
    let mut out = String::new();
    for info in &infos {
        out.push_str(&format!("{}  {}  ({} rows x {} columns)\n", info.index, info.name, info.rows, info.columns));
    }
    write_stdout(&out)
}

// ============================================================================
// preview
// ============================================================================

fn cmd_preview(
    path: &Path,
    sheet: Option<&str>,
    args: &PlanArgs,
    view: Option<ViewMode>,
    rows: Option<usize>,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let (_, mut state, _) = run_plan(path, sheet, args)?;

    match view {
        Some(mode) => {
            let applied = state.set_view_mode(mode);
            if applied != mode {
                eprintln!("note: '{}' view needs tokenized columns, showing '{}'", mode, applied);
            }
        }
        None if state.has_tokenized_data() => {
            state.set_view_mode(settings.default_view_mode);
        }
        None => {}
    }

    let max_rows = rows.unwrap_or(settings.preview_max_rows);
    if json {
        let preview = render::preview_json(&state, max_rows).map_err(CliError::engine)?;
        return print_json(&preview);
    }
    let grid = render::render_grid(&state, max_rows).map_err(CliError::engine)?;
    write_stdout(&grid)
}

// ============================================================================
// tokenize
// ============================================================================

#[derive(Serialize)]
struct FileReport {
    kind: &'static str,
    path: String,
    bytes: usize,
}

impl From<&WrittenArtifact> for FileReport {
    fn from(artifact: &WrittenArtifact) -> Self {
        let kind = match artifact.kind {
            ArtifactKind::Table(_) => "table",
            ArtifactKind::Dictionary => "dictionary",
            ArtifactKind::Bundle => "bundle",
        };
        Self { kind, path: artifact.path.display().to_string(), bytes: artifact.bytes }
    }
}

#[derive(Serialize)]
struct TokenizeReport {
    sheet: String,
    tokenized_columns: Vec<usize>,
    new_tokens: usize,
    dictionary_entries: usize,
    files: Vec<FileReport>,
}

fn delimiter_byte(c: char) -> Result<u8, CliError> {
    if !c.is_ascii() {
        return Err(CliError::args(format!("delimiter '{}' is not a single ASCII character", c)));
    }
    Ok(c as u8)
}

#[allow(clippy::too_many_arguments)]
fn cmd_tokenize(
    path: &Path,
    sheet: Option<&str>,
    args: &PlanArgs,
    format: Option<ExportFormat>,
    out: Option<PathBuf>,
    delimiter: Option<char>,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let delimiter = match delimiter {
        Some(c) => delimiter_byte(c)?,
        None => settings.csv_delimiter_byte().ok_or_else(|| {
            CliError::args("export.csvDelimiter must be a single ASCII character")
                .with_hint("fix it in the settings file or pass --delimiter")
        })?,
    };
    let format = format.unwrap_or(match settings.table_format {
        TableFormat::Xlsx => ExportFormat::Xlsx,
        TableFormat::Csv => ExportFormat::Csv,
    });
    let table_format = match format {
        ExportFormat::Xlsx => TableFormat::Xlsx,
        ExportFormat::Csv => TableFormat::Csv,
        ExportFormat::Bundle | ExportFormat::All => settings.table_format,
    };
    let options = TableOptions { format: table_format, delimiter };
    let dir = out
        .or_else(|| settings.export_directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let (sheet_name, mut state, new_tokens) = run_plan(path, sheet, args)?;

    let dictionary_entries = collect_used_tokens(&state).len();
    if dictionary_entries == 0 {
        return Err(CliError {
            code: EXIT_NOTHING_TO_EXPORT,
            message: "no token reaches the exported table".to_string(),
            hint: Some("select a column with --column N or queue cells with --queue R:C".to_string()),
        });
    }

    let mut written = Vec::new();
    if format != ExportFormat::Bundle {
        written.push(artifacts::export_table(&mut state, &dir, options).map_err(CliError::io)?);
        written.push(artifacts::export_dictionary(&mut state, &dir).map_err(CliError::io)?);
    }
    if matches!(format, ExportFormat::Bundle | ExportFormat::All) {
        written.push(artifacts::export_bundle(&mut state, &dir, options).map_err(CliError::io)?);
    }

    let report = TokenizeReport {
        sheet: sheet_name,
        tokenized_columns: state.tokenized_columns().iter().map(|c| c + 1).collect(),
        new_tokens,
        dictionary_entries,
        files: written.iter().map(FileReport::from).collect(),
    };
    if json {
        return print_json(&report);
    }

    let columns: Vec<String> = state.tokenized_columns().iter().map(|&c| render::col_letter(c)).collect();
    let mut text = format!(
        "sheet '{}': tokenized columns {} ({} new tokens, {} in dictionary)\n",
        report.sheet,
        if columns.is_empty() { "-".to_string() } else { columns.join(", ") },
        report.new_tokens,
        report.dictionary_entries
    );
    for file in &report.files {
        text.push_str(&format!("wrote {} ({} bytes)\n", file.path, file.bytes));
    }
    write_stdout(&text)
}

// ============================================================================
// detokenize
// ============================================================================

#[derive(Serialize)]
struct DetokenizeReport<'a> {
    text: String,
    stats: ScanStats,
    dictionary_entries: usize,
    tokens: Vec<&'a TokenEntry>,
    occurrences: &'a [Occurrence],
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
            Ok(text)
        }
        Some(path) => std::fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {}", path, e))),
    }
}

fn cmd_detokenize(
    dict_path: &Path,
    input: Option<&str>,
    hide_found: bool,
    hide_not_found: bool,
    stats: bool,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    require_file(dict_path)?;
    let dict = dictionary::load(dict_path).map_err(|e| {
        CliError::parse(e).with_hint("the dictionary is a flat JSON object of token -> original")
    })?;
    let text = read_input(input)?;

    let result = scan(&text, &dict);
    let filter = TokenFilter {
        found: settings.show_found && !hide_found,
        not_found: settings.show_not_found && !hide_not_found,
    };
    let entries = result.filtered_entries(filter);

    if json {
        return print_json(&DetokenizeReport {
            text: result.render_plain(),
            stats: result.stats(),
            dictionary_entries: dict.len(),
            tokens: entries,
            occurrences: result.occurrences(),
        });
    }

    write_stdout(&result.render_plain())?;

    if stats {
        let s = result.stats();
        eprintln!(
            "tokens: {} total, {} unique, {} found, {} not found ({} chars, {} in dictionary)",
            s.total, s.unique, s.found, s.not_found, s.chars, dict.len()
        );
        for entry in &entries {
            match &entry.original {
                Some(original) => eprintln!("  {} x{} -> {}", entry.token, entry.count, original),
                None => eprintln!("  {} x{} (not in dictionary)", entry.token, entry.count),
            }
        }
        if entries.is_empty() && !result.entries().is_empty() {
            eprintln!("  (all tokens hidden by filter)");
        }
    }
    Ok(())
}
