//! Record-level helpers around the mapping sheet.
//!
//! These work on loose JSON records instead of [`MappingRow`](crate::models::MappingRow):
//! a reader, a writer to a fixed file under the data directory and a
//! pass-through inspector.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::SheetResult;
use crate::logs::log_success;
use crate::models::normalize_cell;
use crate::sheet::{read_table, write_table, Table};

/// File name used by [`save_records`].
pub const SAVED_FILE: &str = "Transformed_file.xlsx";

/// One spreadsheet line keyed by header, in column order.
pub type Record = Map<String, Value>;

/// Load a spreadsheet as records. Missing values are `null`.
pub fn read_records(path: &Path) -> SheetResult<Vec<Record>> {
    let table = read_table(path)?;
    let records = table
        .records
        .iter()
        .map(|values| {
            table
                .headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = normalize_cell(values.get(i).and_then(|v| v.as_deref()))
                        .map(Value::String)
                        .unwrap_or(Value::Null);
                    (header.clone(), value)
                })
                .collect()
        })
        .collect();
    Ok(records)
}

/// Write records to `<data_path>/Transformed_file.xlsx` and return the path.
///
/// Columns are the union of record keys in first-seen order.
pub fn save_records(records: &[Record], data_path: &Path) -> SheetResult<PathBuf> {
    let mut headers: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|r| r.keys()) {
        if !headers.contains(key) {
            headers.push(key.clone());
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| record.get(h).and_then(cell_text))
                .collect()
        })
        .collect();

    let path = data_path.join(SAVED_FILE);
    write_table(&path, &Table { headers, records: rows })?;
    log_success(format!("Excel saved to {}", path.display()));
    Ok(path)
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Log every record and hand the input back unchanged.
pub fn inspect_records(records: Vec<Record>) -> Vec<Record> {
    tracing::info!(count = records.len(), "inspecting records");
    for (i, record) in records.iter().enumerate() {
        let record = Value::Object(record.clone());
        tracing::info!(row = i + 1, %record, "record");
    }
    records
}

/// Read and inspect a spreadsheet; with `save_to`, also write the records
/// there through [`save_records`].
pub fn inspect_file(input: &Path, save_to: Option<&Path>) -> SheetResult<(Vec<Record>, Option<PathBuf>)> {
    let records = inspect_records(read_records(input)?);
    let saved = match save_to {
        Some(data_path) => Some(save_records(&records, data_path)?),
        None => None,
    };
    Ok((records, saved))
}
