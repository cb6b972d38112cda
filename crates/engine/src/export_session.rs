use chrono::{DateTime, Local};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const EXPORT_ID_LEN: usize = 8;

/// Which artifact a file name is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Table(TableFormat),
    Dictionary,
    Bundle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Xlsx,
    Csv,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Xlsx => "xlsx",
            TableFormat::Csv => "csv",
        }
    }
}

impl ArtifactKind {
    /// Label embedded in the file name.
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Table(_) => "Таблица",
            ArtifactKind::Dictionary => "Словарь",
            ArtifactKind::Bundle => "Комплект",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Table(format) => format.extension(),
            ArtifactKind::Dictionary => "json",
            ArtifactKind::Bundle => "zip",
        }
    }
}

/// Export id and timestamp shared by every artifact of one export session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportStamp {
    pub id: String,
    pub timestamp: String,
}

impl ExportStamp {
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!("{}_{}_{}.{}", self.id, kind.label(), self.timestamp, kind.extension())
    }
}

/// Lazily fixed export naming. The stamp is drawn on first use and kept
/// until [`ExportSession::reset`], so a table and its dictionary exported
/// separately still pair up by name.
#[derive(Debug, Clone, Default)]
pub struct ExportSession {
    stamp: Option<ExportStamp>,
}

impl ExportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self) -> &ExportStamp {
        self.stamp.get_or_insert_with(|| {
            let stamp = ExportStamp {
                id: generate_export_id(),
                timestamp: format_timestamp(&Local::now()),
            };
            log::debug!("export session {} started", stamp.id);
            stamp
        })
    }

    pub fn file_name(&mut self, kind: ArtifactKind) -> String {
        self.stamp().file_name(kind)
    }

    pub fn current(&self) -> Option<&ExportStamp> {
        self.stamp.as_ref()
    }

    pub fn reset(&mut self) {
        self.stamp = None;
    }
}

fn generate_export_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(EXPORT_ID_LEN)
        .map(char::from)
        .collect()
}

/// `YYYYMMDD_HHMM` in local time.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M").to_string()
}
