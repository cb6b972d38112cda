// Application settings
// Loaded from ~/.config/pseudogrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use pseudogrid_engine::display::ViewMode;
use pseudogrid_engine::export_session::TableFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // View applied after tokenizing
    #[serde(rename = "view.defaultMode")]
    pub default_view_mode: ViewMode,

    // Export
    #[serde(rename = "export.tableFormat")]
    pub table_format: TableFormat,

    #[serde(rename = "export.csvDelimiter")]
    pub csv_delimiter: char,

    #[serde(rename = "export.directory")]
    pub export_directory: Option<PathBuf>,  // None = current directory

    // Detokenizer token list
    #[serde(rename = "detokenize.showFound")]
    pub show_found: bool,

    #[serde(rename = "detokenize.showNotFound")]
    pub show_not_found: bool,

    // Preview
    #[serde(rename = "preview.maxRows")]
    pub preview_max_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_view_mode: ViewMode::Tokenized,
            table_format: TableFormat::Xlsx,
            csv_delimiter: ',',
            export_directory: None,
            show_found: true,
            show_not_found: true,
            preview_max_rows: 50,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
    // View shown once tokens exist: "original", "tokenized", "both"
    "view.defaultMode": "tokenized",

    // Export ("xlsx" or "csv")
    "export.tableFormat": "xlsx",
    "export.csvDelimiter": ",",
    "export.directory": null,

    // Detokenizer token list filters
    "detokenize.showFound": true,
    "detokenize.showNotFound": true,

    // Rows printed by `pgrid preview`
    "preview.maxRows": 50
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pseudogrid");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults.
    /// A commented default file is written on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            create_default_file(&path);
            return Self::default();
        }

        Self::load_from(&path)
    }

    /// Load settings from a specific file, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Delimiter as a byte, when it is a single ASCII character.
    pub fn csv_delimiter_byte(&self) -> Option<u8> {
        self.csv_delimiter.is_ascii().then_some(self.csv_delimiter as u8)
    }
}

fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("error creating config directory: {}", e);
            return;
        }
    }

    if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
        log::warn!("error writing default settings.json: {}", e);
    }
}
