//! Table sources.
//!
//! This module contains decoders for the supported input families (delimited
//! text and spreadsheets).

pub mod csv;
pub mod spreadsheet;

pub use self::csv::{CsvDecoder, CsvOptions};
pub use spreadsheet::{decode_spreadsheet, SpreadsheetKind};

use crate::encoding::EncodingDetector;
use crate::error::Result;
use crate::table::DecodedTable;

/// Trait for decoders that turn a complete byte buffer into a table
pub trait TableSource {
    /// Decode the buffer, or fail with a definitive error
    fn decode(&self, bytes: &[u8]) -> Result<DecodedTable>;
}

impl<D: EncodingDetector> TableSource for CsvDecoder<D> {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedTable> {
        self.decode_csv_with_fallback(bytes)
    }
}

impl TableSource for SpreadsheetKind {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedTable> {
        decode_spreadsheet(bytes, *self)
    }
}
