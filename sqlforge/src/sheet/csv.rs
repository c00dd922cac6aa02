//! CSV tables with encoding and delimiter auto-detection.

use std::fs;
use std::path::Path;

use super::Table;
use crate::error::{SheetError, SheetResult};

/// Delimiters tried by [`detect_delimiter`], in tie-break order.
const SEPARATORS: [char; 4] = [';', ',', '\t', '|'];

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8 and anything unrecognised: lossy UTF-8.
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &SEPARATORS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Header names are trimmed. Blank cells become `None`; lines where every
/// cell is blank are dropped.
pub fn parse_str(content: &str, delimiter: char) -> SheetResult<Table> {
    if content.trim().is_empty() {
        return Err(SheetError::EmptyFile);
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::NoHeaders);
    }

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values: Vec<Option<String>> = record
            .iter()
            .map(|v| (!v.trim().is_empty()).then(|| v.to_string()))
            .collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        records.push(values);
    }

    Ok(Table { headers, records })
}

/// Read a CSV file, detecting encoding and (unless given) the delimiter.
pub fn read(path: &Path, delimiter: Option<char>) -> SheetResult<Table> {
    let bytes = fs::read(path).map_err(|e| SheetError::io(path, e))?;
    parse_bytes(&bytes, delimiter)
}

/// Parse CSV bytes, detecting encoding and (unless given) the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> SheetResult<Table> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    tracing::debug!(%encoding, delimiter = %delimiter.escape_default(), "decoded csv");
    parse_str(&content, delimiter)
}

/// Write a table as CSV. Absent values become empty fields.
pub fn write(path: &Path, table: &Table, delimiter: char) -> SheetResult<()> {
    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_path(path)?;

    writer.write_record(&table.headers)?;
    for record in &table.records {
        writer.write_record(record.iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    writer.flush().map_err(|e| SheetError::io(path, e))?;
    Ok(())
}
