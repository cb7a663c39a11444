//! Uploaded files and their format hints.

use std::fs;
use std::path::Path;

use crate::error::{DecodeError, Result};
use crate::sources::SpreadsheetKind;

/// Format family derived from a file name's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text with the given field delimiter
    Csv {
        /// Field delimiter
        delimiter: u8,
    },
    /// Binary spreadsheet container
    Spreadsheet(SpreadsheetKind),
}

impl FileFormat {
    /// Map a file name to its format family
    ///
    /// Extensions are compared case-insensitively.
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = extension_of(name).to_ascii_lowercase();
        match extension.as_str() {
            ".csv" | ".txt" => Ok(FileFormat::Csv { delimiter: b',' }),
            ".tsv" => Ok(FileFormat::Csv { delimiter: b'\t' }),
            ".xlsx" | ".xlsm" => Ok(FileFormat::Spreadsheet(SpreadsheetKind::Xlsx)),
            ".xls" => Ok(FileFormat::Spreadsheet(SpreadsheetKind::Xls)),
            ".ods" => Ok(FileFormat::Spreadsheet(SpreadsheetKind::Ods)),
            _ => Err(DecodeError::UnsupportedFormat(if extension.is_empty() {
                name.to_string()
            } else {
                extension
            })),
        }
    }
}

/// Extension including the leading dot, or `""`
fn extension_of(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(pos) => &base[pos..],
    }
}

/// An uploaded file: name, contents and format hint
#[derive(Debug, Clone)]
pub struct RawFile {
    name: String,
    bytes: Vec<u8>,
    format: FileFormat,
}

impl RawFile {
    /// Wrap a buffer, failing with `UnsupportedFormat` for unknown extensions
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let format = FileFormat::from_name(&name)?;
        Ok(Self {
            name,
            bytes,
            format,
        })
    }

    /// Read a file from disk
    ///
    /// The extension is checked before the file is opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let format = FileFormat::from_name(&name)?;
        let bytes = fs::read(path)?;

        Ok(Self {
            name,
            bytes,
            format,
        })
    }

    /// Declared file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File contents
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format hint derived from the name
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Size in KiB
    pub fn size_kib(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }

    /// Name for an exported copy with a new extension
    ///
    /// `report.xlsx` becomes `report.csv`.
    pub fn output_name(&self, extension: &str) -> String {
        output_file_name(&self.name, extension)
    }
}

/// Replace the extension of `name` with `extension` (given without a dot)
pub fn output_file_name(name: &str, extension: &str) -> String {
    let current = extension_of(name);
    let stem = &name[..name.len() - current.len()];
    format!("{}.{}", stem, extension.trim_start_matches('.'))
}
