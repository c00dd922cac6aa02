//! XLSX tables through `umya-spreadsheet`.
//!
//! Only the first worksheet is read; row 1 holds the headers. Output goes
//! to a fresh workbook with a single `Sheet1`.

use std::collections::BTreeMap;
use std::path::Path;

use super::Table;
use crate::error::{SheetError, SheetResult};

const OUTPUT_SHEET: &str = "Sheet1";

fn xlsx_error(path: &Path, message: impl ToString) -> SheetError {
    SheetError::Xlsx {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Read the first worksheet of an `.xlsx` workbook.
pub fn read(path: &Path) -> SheetResult<Table> {
    if !path.exists() {
        return Err(SheetError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        ));
    }

    let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| xlsx_error(path, e))?;
    let ws = book
        .get_sheet(&0)
        .ok_or_else(|| SheetError::NoWorksheet(path.display().to_string()))?;

    // umya coordinates are (col, row), 1-based
    let mut cells: BTreeMap<(u32, u32), String> = BTreeMap::new();
    let mut max_row = 0;
    let mut max_col = 0;
    for cell in ws.get_cell_collection() {
        let coord = cell.get_coordinate();
        let col = *coord.get_col_num();
        let row = *coord.get_row_num();
        let value = cell.get_value();
        if value.trim().is_empty() {
            continue;
        }
        max_row = max_row.max(row);
        max_col = max_col.max(col);
        cells.insert((row, col), value.into_owned());
    }

    if cells.is_empty() {
        return Err(SheetError::EmptyFile);
    }

    let headers: Vec<String> = (1..=max_col)
        .map(|c| cells.get(&(1, c)).map(|h| h.trim().to_string()).unwrap_or_default())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SheetError::NoHeaders);
    }

    let records = (2..=max_row)
        .map(|r| (1..=max_col).map(|c| cells.get(&(r, c)).cloned()).collect::<Vec<_>>())
        .filter(|values| values.iter().any(Option::is_some))
        .collect();

    Ok(Table { headers, records })
}

/// Write a table to a new `.xlsx` workbook. Absent values stay empty.
pub fn write(path: &Path, table: &Table) -> SheetResult<()> {
    let mut book = umya_spreadsheet::new_file();
    let ws = book
        .get_sheet_by_name_mut(OUTPUT_SHEET)
        .ok_or_else(|| xlsx_error(path, "default worksheet missing"))?;

    for (c, header) in table.headers.iter().enumerate() {
        ws.get_cell_mut((c as u32 + 1, 1)).set_value(header.as_str());
    }
    for (r, record) in table.records.iter().enumerate() {
        for (c, value) in record.iter().enumerate() {
            if let Some(value) = value {
                ws.get_cell_mut((c as u32 + 1, r as u32 + 2)).set_value(value.as_str());
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|e| xlsx_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table {
            headers: vec!["source_column".into(), "target_column".into(), "notes".into()],
            records: vec![
                vec![Some("customer_id".into()), Some("cust_id".into()), None],
                vec![Some("line_items".into()), None, Some("exploded".into())],
            ],
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.xlsx");

        write(&path, &table()).unwrap();
        let read_back = read(&path).unwrap();

        assert_eq!(read_back, table());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read(&dir.path().join("nope.xlsx")).unwrap_err();
        assert!(matches!(err, SheetError::Io { .. }));
    }

    #[test]
    fn test_empty_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let book = umya_spreadsheet::new_file();
        umya_spreadsheet::writer::xlsx::write(&book, &path).unwrap();

        assert!(matches!(read(&path), Err(SheetError::EmptyFile)));
    }
}
