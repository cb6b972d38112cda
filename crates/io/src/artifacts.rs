// Export artifacts: table, used-token dictionary and the bundle of both,
// named by the state's export session and written into a directory

use std::path::{Path, PathBuf};

use pseudogrid_engine::export::{export_rows, used_dictionary};
use pseudogrid_engine::export_session::{ArtifactKind, TableFormat};
use pseudogrid_engine::state::TokenizationState;

use crate::{bundle, csv, dictionary, xlsx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub format: TableFormat,
    pub delimiter: u8,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self { format: TableFormat::Xlsx, delimiter: b',' }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub bytes: usize,
    /// Entries in the exported dictionary, when one is part of the artifact.
    pub dictionary_entries: Option<usize>,
}

/// Exported table serialized in the requested format.
pub fn table_bytes(state: &TokenizationState, options: TableOptions) -> Result<Vec<u8>, String> {
    let rows = export_rows(state);
    match options.format {
        TableFormat::Xlsx => xlsx::export_to_buffer(&rows),
        TableFormat::Csv => csv::export_to_bytes(&rows, options.delimiter),
    }
}

/// Used-token dictionary as pretty JSON, plus its entry count.
pub fn dictionary_json(state: &TokenizationState) -> Result<(String, usize), String> {
    let entries = used_dictionary(state);
    let json = dictionary::to_json(&entries)?;
    Ok((json, entries.len()))
}

fn ensure_table(state: &TokenizationState) -> Result<(), String> {
    if state.table().is_empty() {
        return Err("No table to export".to_string());
    }
    Ok(())
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Failed to create output directory '{}': {}", dir.display(), e))?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    log::info!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

pub fn export_table(
    state: &mut TokenizationState,
    dir: &Path,
    options: TableOptions,
) -> Result<WrittenArtifact, String> {
    ensure_table(state)?;
    let kind = ArtifactKind::Table(options.format);
    let bytes = table_bytes(state, options)?;
    let path = write_file(dir, &state.export_file_name(kind), &bytes)?;
    state.record_export(kind);
    Ok(WrittenArtifact { kind, path, bytes: bytes.len(), dictionary_entries: None })
}

pub fn export_dictionary(state: &mut TokenizationState, dir: &Path) -> Result<WrittenArtifact, String> {
    ensure_table(state)?;
    let kind = ArtifactKind::Dictionary;
    let (json, entries) = dictionary_json(state)?;
    let path = write_file(dir, &state.export_file_name(kind), json.as_bytes())?;
    state.record_export(kind);
    Ok(WrittenArtifact { kind, path, bytes: json.len(), dictionary_entries: Some(entries) })
}

/// Table and dictionary in one archive. Nothing is written unless the
/// whole archive was built.
pub fn export_bundle(
    state: &mut TokenizationState,
    dir: &Path,
    options: TableOptions,
) -> Result<WrittenArtifact, String> {
    ensure_table(state)?;
    let table = table_bytes(state, options)?;
    let (json, entries) = dictionary_json(state)?;

    let stamp = state.export_stamp();
    let archive = bundle::build(&[
        (stamp.file_name(ArtifactKind::Table(options.format)), table),
        (stamp.file_name(ArtifactKind::Dictionary), json.into_bytes()),
    ])?;

    let kind = ArtifactKind::Bundle;
    let path = write_file(dir, &stamp.file_name(kind), &archive)?;
    state.record_export(kind);
    Ok(WrittenArtifact { kind, path, bytes: archive.len(), dictionary_entries: Some(entries) })
}
