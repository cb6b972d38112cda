// Integration tests for the `pgrid` binary.
// Run with: cargo test -p pseudogrid-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("settings.json"), "{}").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn pgrid(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_pgrid"))
            .current_dir(self.dir.path())
            .env("PGRID_SETTINGS", self.path("settings.json"))
            .args(args)
            .output()
            .expect("run pgrid")
    }
}

const CLIENTS: &str = "name,city\nAnn,Oslo\nBob,Rome\nAnn,Paris\n";

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "exit {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn report_path(report: &serde_json::Value, kind: &str) -> PathBuf {
    let file = report["files"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["kind"] == kind)
        .unwrap_or_else(|| panic!("no {} in report", kind));
    PathBuf::from(file["path"].as_str().unwrap())
}

fn resolve(ws: &Workspace, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        ws.dir.path().join(path)
    }
}

// ---------------------------------------------------------------------------
// sheets
// ---------------------------------------------------------------------------

#[test]
fn sheets_lists_csv_as_single_sheet() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);

    let json = stdout_json(&ws.pgrid(&["sheets", "clients.csv", "--json"]));
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["index"], 1);
    assert_eq!(json[0]["name"], "clients");
    assert_eq!(json[0]["rows"], 4);
    assert_eq!(json[0]["columns"], 2);
}

// ---------------------------------------------------------------------------
// tokenize
// ---------------------------------------------------------------------------

#[test]
fn tokenize_writes_table_and_dictionary() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);

    let report = stdout_json(&ws.pgrid(&[
        "tokenize", "clients.csv", "--column", "1", "--start", "2", "--format", "csv", "-o", "out", "--json",
    ]));
    assert_eq!(report["sheet"], "clients");
    assert_eq!(report["tokenized_columns"], serde_json::json!([1]));
    // name, Ann, Bob
    assert_eq!(report["new_tokens"], 3);
    // The header row lies outside the range
    assert_eq!(report["dictionary_entries"], 2);
    assert_eq!(report["files"].as_array().unwrap().len(), 2);

    let table = fs::read_to_string(resolve(&ws, &report_path(&report, "table"))).unwrap();
    let lines: Vec<&str> = table.trim_start_matches('\u{FEFF}').lines().collect();
    assert_eq!(lines[0], "name,city");
    let token_of = |line: &str| line.split(',').next().unwrap().to_string();
    assert!(token_of(lines[1]).starts_with("[[") && lines[1].ends_with(",Oslo"));
    assert_eq!(token_of(lines[1]), token_of(lines[3]));
    assert_ne!(token_of(lines[1]), token_of(lines[2]));

    let dict_text = fs::read_to_string(resolve(&ws, &report_path(&report, "dictionary"))).unwrap();
    let dict: serde_json::Value = serde_json::from_str(&dict_text).unwrap();
    let dict = dict.as_object().unwrap();
    assert_eq!(dict.len(), 2);
    assert_eq!(dict[&token_of(lines[1])], "Ann");
    assert_eq!(dict[&token_of(lines[2])], "Bob");
}

#[test]
fn tokenize_then_detokenize_round_trip() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);

    let report = stdout_json(&ws.pgrid(&[
        "tokenize", "clients.csv", "--column", "2", "--format", "csv", "--json",
    ]));
    let table = fs::read_to_string(resolve(&ws, &report_path(&report, "table"))).unwrap();
    let rome_token = table.lines().nth(2).unwrap().split(',').nth(1).unwrap().to_string();
    let dict_path = resolve(&ws, &report_path(&report, "dictionary"));

    ws.write("reply.txt", &format!("Trip to {} and [[unknown]].\n", rome_token));
    let output = ws.pgrid(&["detokenize", "--dict", dict_path.to_str().unwrap(), "reply.txt"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Trip to Rome and [[unknown]].\n");

    let json = stdout_json(&ws.pgrid(&[
        "detokenize", "--dict", dict_path.to_str().unwrap(), "reply.txt", "--hide-found", "--json",
    ]));
    assert_eq!(json["stats"]["total"], 2);
    assert_eq!(json["stats"]["found"], 1);
    assert_eq!(json["stats"]["not_found"], 1);
    // Only the unresolved token stays listed
    assert_eq!(json["tokens"].as_array().unwrap().len(), 1);
    assert_eq!(json["tokens"][0]["token"], "[[unknown]]");
    assert_eq!(json["text"], "Trip to Rome and [[unknown]].\n");
}

#[test]
fn tokenize_bundle_from_plan_file() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);
    ws.write(
        "steps.toml",
        r#"
[[step]]
action = "select"
column = 2

[[step]]
action = "tokenize"

[[step]]
action = "toggle"
row = 2
column = 2
"#,
    );

    let report = stdout_json(&ws.pgrid(&[
        "tokenize", "clients.csv", "--plan", "steps.toml", "--format", "bundle", "--json",
    ]));
    assert_eq!(report["files"].as_array().unwrap().len(), 1);
    // Oslo was excluded after tokenizing: city, Rome, Paris remain
    assert_eq!(report["dictionary_entries"], 3);

    let bytes = fs::read(resolve(&ws, &report_path(&report, "bundle"))).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with(".json"));
    assert!(names[1].ends_with(".xlsx"));
}

#[test]
fn tokenize_without_selection_has_nothing_to_export() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);

    let output = ws.pgrid(&["tokenize", "clients.csv"]);
    assert_eq!(output.status.code(), Some(6));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no token"));
    assert_eq!(fs::read_dir(ws.dir.path()).unwrap().count(), 2);
}

// ---------------------------------------------------------------------------
// preview
// ---------------------------------------------------------------------------

#[test]
fn preview_json_in_both_view() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);

    let json = stdout_json(&ws.pgrid(&[
        "preview", "clients.csv", "--column", "1", "--view", "both", "--rows", "2", "--json",
    ]));
    assert_eq!(json["view"], "both");
    assert_eq!(json["rows"], 4);
    assert_eq!(json["cells"].as_array().unwrap().len(), 2);
    assert_eq!(json["cells"][1][0]["text"], "Ann");
    assert!(json["cells"][1][0]["token_line"].as_str().unwrap().starts_with("[["));
    assert_eq!(json["column_states"][0]["state"], "tokenized");
    assert_eq!(json["marker"]["enabled"], true);
}

#[test]
fn preview_falls_back_to_original_view() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);

    let output = ws.pgrid(&["preview", "clients.csv", "--view", "tokenized"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("needs tokenized columns"));
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("view: original"));
    assert!(text.contains("Paris"));
}

// ---------------------------------------------------------------------------
// errors and exit codes
// ---------------------------------------------------------------------------

#[test]
fn missing_input_is_io_error() {
    let ws = Workspace::new();
    let output = ws.pgrid(&["sheets", "nope.xlsx"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn unknown_sheet_is_usage_error() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);
    let output = ws.pgrid(&["preview", "clients.csv", "--sheet", "Other"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("available sheets: clients"));
}

#[test]
fn column_out_of_bounds_is_usage_error() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);
    let output = ws.pgrid(&["tokenize", "clients.csv", "--column", "9"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn empty_sheet_is_format_error() {
    let ws = Workspace::new();
    ws.write("empty.csv", "");
    let output = ws.pgrid(&["preview", "empty.csv"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn malformed_dictionary_is_parse_error() {
    let ws = Workspace::new();
    ws.write("dict.json", r#"{"[[a]]": ["nested"]}"#);
    ws.write("reply.txt", "[[a]]");
    let output = ws.pgrid(&["detokenize", "--dict", "dict.json", "reply.txt"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
}

#[test]
fn plan_file_conflicts_with_flags() {
    let ws = Workspace::new();
    ws.write("clients.csv", CLIENTS);
    ws.write("steps.toml", "");
    let output = ws.pgrid(&["preview", "clients.csv", "--plan", "steps.toml", "--column", "1"]);
    assert_eq!(output.status.code(), Some(2));
}
