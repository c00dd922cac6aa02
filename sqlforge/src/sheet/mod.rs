//! Spreadsheet reading and writing.
//!
//! The file extension picks the backend: `.xlsx`/`.xlsm` through
//! [`xlsx`], `.csv`/`.tsv`/`.txt` through [`csv`]. Both load into the same
//! [`Table`]; [`MappingSheet`] is the typed view used by the pipeline.

pub mod csv;
pub mod xlsx;

use std::fs;
use std::path::Path;

use crate::error::{SheetError, SheetResult};
use crate::models::{columns, MappingRow};

/// Header row plus data records; `None` marks a blank cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

/// Storage format, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    /// `None`: detect the delimiter on read, `,` on write.
    Csv { delimiter: Option<char> },
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> SheetResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" => Ok(SheetFormat::Xlsx),
            "csv" | "txt" => Ok(SheetFormat::Csv { delimiter: None }),
            "tsv" => Ok(SheetFormat::Csv {
                delimiter: Some('\t'),
            }),
            _ => Err(SheetError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read any supported spreadsheet.
pub fn read_table(path: &Path) -> SheetResult<Table> {
    match SheetFormat::from_path(path)? {
        SheetFormat::Xlsx => xlsx::read(path),
        SheetFormat::Csv { delimiter } => csv::read(path, delimiter),
    }
}

/// Write any supported spreadsheet, creating the parent directory.
pub fn write_table(path: &Path, table: &Table) -> SheetResult<()> {
    let format = SheetFormat::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SheetError::io(parent, e))?;
    }
    match format {
        SheetFormat::Xlsx => xlsx::write(path, table),
        SheetFormat::Csv { delimiter } => csv::write(path, table, delimiter.unwrap_or(',')),
    }
}

/// Mapping rows with the header order they were read in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSheet {
    pub headers: Vec<String>,
    pub rows: Vec<MappingRow>,
}

impl MappingSheet {
    pub fn from_table(table: &Table) -> Self {
        Self {
            headers: table.headers.clone(),
            rows: table
                .records
                .iter()
                .map(|values| MappingRow::from_record(&table.headers, values))
                .collect(),
        }
    }

    /// Input headers followed by any output column not already present.
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        for column in columns::OUTPUT {
            if !headers.iter().any(|h| h == column) {
                headers.push(column.to_string());
            }
        }
        headers
    }

    pub fn to_table(&self) -> Table {
        let headers = self.output_headers();
        let records = self
            .rows
            .iter()
            .map(|row| headers.iter().map(|h| row.value(h)).collect())
            .collect();
        Table { headers, records }
    }
}

/// Read a mapping spreadsheet.
pub fn read_mapping(path: &Path) -> SheetResult<MappingSheet> {
    Ok(MappingSheet::from_table(&read_table(path)?))
}

/// Write a mapping spreadsheet with the output columns filled in.
pub fn write_mapping(path: &Path, sheet: &MappingSheet) -> SheetResult<()> {
    write_table(path, &sheet.to_table())
}
