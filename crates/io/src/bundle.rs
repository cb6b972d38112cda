// Zip bundle of export artifacts, built entirely in memory

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Pack `(file name, contents)` entries into a zip archive.
pub fn build(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, String> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, contents) in entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| format!("Failed to add '{}' to archive: {}", name, e))?;
        zip.write_all(contents)
            .map_err(|e| format!("Failed to write '{}' to archive: {}", name, e))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| format!("Failed to finish archive: {}", e))?;
    Ok(cursor.into_inner())
}
