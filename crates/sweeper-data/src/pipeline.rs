//! Decode → clean → select, one file at a time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::clean::{drop_duplicates, fill_missing_with_mean, select_columns};
use crate::encoding::{CharsetDetector, DecodedEncoding, EncodingDetector};
use crate::error::{DecodeError, Result, SweepError, TableError};
use crate::file::{FileFormat, RawFile};
use crate::sources::{CsvDecoder, CsvOptions, TableSource};
use crate::table::DecodedTable;

/// Routes a file to the decoder for its format family
#[derive(Debug, Clone, Default)]
pub struct Decoder<D = CharsetDetector> {
    detector: D,
}

impl Decoder {
    /// Create a decoder using the default encoding detector
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: EncodingDetector> Decoder<D> {
    /// Create a decoder with a custom encoding detector
    pub fn with_detector(detector: D) -> Self {
        Self { detector }
    }

    /// Decode one file into a table
    pub fn decode(&self, file: &RawFile) -> Result<DecodedTable> {
        self.decode_with_encoding(file).map(|(table, _)| table)
    }

    /// Decode one file, also reporting the text encoding used
    ///
    /// Spreadsheets carry no text encoding and report `None`.
    pub fn decode_with_encoding(
        &self,
        file: &RawFile,
    ) -> Result<(DecodedTable, Option<DecodedEncoding>)> {
        match file.format() {
            FileFormat::Csv { delimiter } => {
                let options = CsvOptions {
                    delimiter,
                    ..Default::default()
                };
                let (table, encoding) = CsvDecoder::with_options(options)
                    .with_detector(&self.detector)
                    .decode_csv_with_encoding(file.bytes())?;
                Ok((table, Some(encoding)))
            }
            FileFormat::Spreadsheet(kind) => Ok((kind.decode(file.bytes())?, None)),
        }
    }
}

/// Cleaning steps applied after decoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Drop repeated rows
    pub remove_duplicates: bool,
    /// Fill gaps in numeric columns with the column mean
    pub fill_missing: bool,
    /// Columns to keep, in order (all columns when unset)
    pub columns: Option<Vec<String>>,
}

/// Result of processing one file of a batch
#[derive(Debug)]
pub struct FileOutcome {
    /// File name as given
    pub name: String,
    /// Size of the input in KiB, if it could be read
    pub size_kib: Option<f64>,
    /// The cleaned table, or why the file was skipped
    pub result: std::result::Result<DecodedTable, SweepError>,
}

impl FileOutcome {
    /// Whether the file was processed
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Explicit decode → clean → select pipeline
///
/// Each stage takes the table produced by the previous one and returns a new
/// table; nothing is shared between files.
#[derive(Debug, Clone, Default)]
pub struct Pipeline<D = CharsetDetector> {
    decoder: Decoder<D>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with the default decoder
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            decoder: Decoder::new(),
            options,
        }
    }
}

impl<D: EncodingDetector> Pipeline<D> {
    /// Apply the configured cleaning and selection stages
    pub fn run(&self, table: DecodedTable) -> std::result::Result<DecodedTable, TableError> {
        let mut table = table;

        if self.options.remove_duplicates {
            let before = table.row_count();
            table = drop_duplicates(&table);
            info!(removed = before - table.row_count(), "Duplicates removed");
        }

        if self.options.fill_missing {
            table = fill_missing_with_mean(&table);
            info!("Missing values filled");
        }

        if let Some(columns) = &self.options.columns {
            table = select_columns(&table, columns.as_slice())?;
        }

        Ok(table)
    }

    /// Decode and clean one file
    pub fn process(&self, file: &RawFile) -> std::result::Result<DecodedTable, SweepError> {
        let table = self.decoder.decode(file)?;
        info!(
            file = file.name(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Decoded file"
        );
        Ok(self.run(table)?)
    }

    /// Process files in order; a failing file never stops the rest
    pub fn process_batch<I>(&self, files: I) -> Vec<FileOutcome>
    where
        I: IntoIterator<Item = RawFile>,
    {
        files
            .into_iter()
            .map(|file| {
                let result = self.process(&file);
                outcome(file.name().to_string(), Some(file.size_kib()), result)
            })
            .collect()
    }

    /// Open and process files from disk in order
    ///
    /// Files with unsupported extensions or read errors become failed
    /// outcomes like any decode failure.
    pub fn process_paths<I, P>(&self, paths: I) -> Vec<FileOutcome>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                match RawFile::open(path) {
                    Ok(file) => {
                        let result = self.process(&file);
                        outcome(file.name().to_string(), Some(file.size_kib()), result)
                    }
                    Err(err) => outcome(path.display().to_string(), None, Err(err.into())),
                }
            })
            .collect()
    }
}

fn outcome(
    name: String,
    size_kib: Option<f64>,
    result: std::result::Result<DecodedTable, SweepError>,
) -> FileOutcome {
    match &result {
        Err(SweepError::Decode(err @ DecodeError::UnsupportedFormat(_))) => {
            warn!(file = %name, error = %err, "Skipping file");
        }
        Err(err) => error!(file = %name, error = %err, "Failed to process file"),
        Ok(_) => {}
    }
    FileOutcome {
        name,
        size_kib,
        result,
    }
}
