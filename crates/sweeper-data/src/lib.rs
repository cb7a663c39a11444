//! # sweeper-data
//!
//! Tabular ingestion for Data Sweeper - read CSV and spreadsheet files into a
//! typed table, clean it, and export it back to CSV.
//!
//! ## Features
//!
//! - **Encoding detection**: Guess a text file's character set from its first
//!   10,000 bytes, and fall back through Latin-1, Latin-9 and windows-1252
//!   when the guess turns out wrong
//! - **Spreadsheet Support**: Read the first sheet of `.xlsx`, `.xls` and
//!   `.ods` workbooks using `calamine`
//! - **Typed cells**: Numeric columns stay numeric, so later stages can pick
//!   them out
//! - **Cleaning**: Duplicate removal, mean filling, column selection
//!
//! ## Example
//!
//! ```rust,ignore
//! use sweeper_data::{DataSweeper, PipelineOptions};
//!
//! // Decode a single file
//! let table = DataSweeper::read_table("survey.csv")?;
//! println!("{} rows, numeric columns: {:?}", table.row_count(), table.numeric_columns());
//!
//! // Decode, clean and export to CSV
//! let options = PipelineOptions { remove_duplicates: true, ..Default::default() };
//! let written = DataSweeper::sweep_to_csv("survey.xlsx", options, "out/".as_ref())?;
//! ```

pub mod clean;
pub mod encoding;
pub mod error;
pub mod export;
pub mod file;
pub mod pipeline;
pub mod sources;
pub mod table;

use std::path::{Path, PathBuf};

// Re-exports
pub use clean::{drop_duplicates, fill_missing_with_mean, select_columns, value_counts};
pub use encoding::{
    detect_encoding, detect_encoding_from_reader, fallback_charsets, Charset, CharsetDetector,
    Confidence, DecodedEncoding, EncodingDetector, EncodingGuess, DETECTION_PREFIX_LEN,
};
pub use error::{DecodeError, Result, SweepError, TableError};
pub use export::{export_csv, to_csv};
pub use file::{output_file_name, FileFormat, RawFile};
pub use pipeline::{Decoder, FileOutcome, Pipeline, PipelineOptions};
pub use sources::{decode_spreadsheet, CsvDecoder, CsvOptions, SpreadsheetKind, TableSource};
pub use table::{CellValue, DecodedTable};

/// Convenience entry points over [`Pipeline`]
pub struct DataSweeper;

impl DataSweeper {
    /// Read a file from disk and decode it into a table
    ///
    /// # Arguments
    /// * `path` - Path to a CSV-family or spreadsheet-family file
    ///
    /// # Returns
    /// The decoded table, or the reason the file cannot be read
    pub fn read_table(path: impl AsRef<Path>) -> Result<DecodedTable> {
        let file = RawFile::open(path)?;
        Decoder::new().decode(&file)
    }

    /// Decode, clean and export one file as CSV
    ///
    /// # Arguments
    /// * `path` - Input file
    /// * `options` - Cleaning steps to apply
    /// * `output_dir` - Directory receiving `<stem>.csv`
    ///
    /// # Returns
    /// Path of the written file
    pub fn sweep_to_csv(
        path: impl AsRef<Path>,
        options: PipelineOptions,
        output_dir: &Path,
    ) -> std::result::Result<PathBuf, SweepError> {
        let file = RawFile::open(path)?;
        let table = Pipeline::new(options).process(&file)?;
        Ok(export_csv(&table, file.name(), output_dir, b',')?)
    }
}
