// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use pseudogrid_engine::value::Value;

use crate::workbook::{SourceSheet, SourceWorkbook};

const UTF8_BOM: &str = "\u{FEFF}";

/// Read a delimited file as a single-sheet workbook named after the file stem.
/// `delimiter: None` sniffs it from the content.
pub fn import_workbook(path: &Path, delimiter: Option<u8>) -> Result<SourceWorkbook, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    let rows = import_from_string(&content, delimiter)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string();
    Ok(SourceWorkbook { sheets: vec![SourceSheet { name, rows }] })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // More consistent lines first, wider rows break ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252 exports).
/// A leading byte order mark is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(match content.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

/// Every record becomes a row of text values; empty fields are blanks.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<Vec<Vec<Value>>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("Failed to parse CSV: {}", e))?;
        rows.push(record.iter().map(Value::from).collect());
    }
    Ok(rows)
}

/// Delimited text with a UTF-8 byte order mark, one record per table row.
pub fn export_to_bytes(rows: &[Vec<Value>], delimiter: u8) -> Result<Vec<u8>, String> {
    let mut buffer = UTF8_BOM.as_bytes().to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(&mut buffer);
        for row in rows {
            writer
                .write_record(row.iter().map(|v| v.as_text().into_owned()))
                .map_err(|e| format!("Failed to write CSV: {}", e))?;
        }
        writer.flush().map_err(|e| e.to_string())?;
    }
    Ok(buffer)
}
