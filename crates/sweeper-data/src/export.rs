//! CSV export.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::TableError;
use crate::file::output_file_name;
use crate::table::DecodedTable;

/// Serialize a table as UTF-8 delimited text, header first
pub fn to_csv(table: &DecodedTable, delimiter: u8) -> Result<Vec<u8>, TableError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }

    writer
        .into_inner()
        .map_err(|e| TableError::Export(e.to_string()))
}

/// Write a table into `output_dir` as `<stem>.csv`, returning the path written
pub fn export_csv(
    table: &DecodedTable,
    source_name: &str,
    output_dir: &Path,
    delimiter: u8,
) -> Result<PathBuf, TableError> {
    let bytes = to_csv(table, delimiter)?;
    let path = output_dir.join(output_file_name(source_name, "csv"));

    fs::create_dir_all(output_dir).map_err(|e| TableError::Export(e.to_string()))?;
    fs::write(&path, bytes)
        .map_err(|e| TableError::Export(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), rows = table.row_count(), "Exported table");
    Ok(path)
}
