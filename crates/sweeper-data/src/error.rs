//! Error types for decoding and table operations.

use thiserror::Error;

/// Result type for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while turning raw bytes into a table
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File extension is neither CSV nor spreadsheet family
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// Bytes cannot be mapped under the given encoding
    ///
    /// Only used to drive the fallback chain.
    #[error("Bytes are not valid {0} text")]
    EncodingMismatch(String),

    /// The detected encoding and every fallback encoding failed
    #[error("All encoding attempts failed ({}); unable to read the CSV file", .attempted.join(", "))]
    AllEncodingsExhausted {
        /// Encodings tried, in order
        attempted: Vec<String>,
    },

    /// Spreadsheet container could not be read
    #[error("Error reading the spreadsheet: {0}")]
    SpreadsheetParse(String),

    /// A record's field count differs from the header's
    #[error("Row on line {line} has {found} fields, expected {expected}")]
    RaggedRow {
        /// 1-based line number of the offending record
        line: u64,
        /// Number of header columns
        expected: usize,
        /// Number of fields found
        found: usize,
    },

    /// No header row to build a table from
    #[error("File is empty: no columns to parse")]
    EmptyInput,

    /// Delimited text could not be parsed
    #[error("CSV parse error: {0}")]
    Csv(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Whether the fallback chain may try another encoding after this error
    pub fn is_encoding_mismatch(&self) -> bool {
        matches!(self, DecodeError::EncodingMismatch(_))
    }
}

/// Errors raised by table operations and export
#[derive(Debug, Error)]
pub enum TableError {
    /// Column name not present in the table
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Failed to serialize the table
    #[error("Export failed: {0}")]
    Export(String),
}

impl From<csv::Error> for TableError {
    fn from(err: csv::Error) -> Self {
        TableError::Export(err.to_string())
    }
}

/// Any failure while processing one file
#[derive(Debug, Error)]
pub enum SweepError {
    /// The file could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A cleaning or export step failed
    #[error(transparent)]
    Table(#[from] TableError),
}
