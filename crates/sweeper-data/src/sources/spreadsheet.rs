//! Spreadsheet decoding using calamine.

use std::fmt::Display;
use std::io::Cursor;

use calamine::{Data, Ods, Range, Reader, Xls, Xlsx};
use tracing::debug;

use crate::error::{DecodeError, Result};
use crate::table::{CellValue, DecodedTable};

/// Spreadsheet container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    /// Office Open XML workbook (`.xlsx`, `.xlsm`)
    Xlsx,
    /// Legacy binary workbook (`.xls`)
    Xls,
    /// OpenDocument spreadsheet (`.ods`)
    Ods,
}

/// Decode the first worksheet of a workbook held in memory
///
/// The first row supplies the column names. There is a single attempt:
/// any container error is a [`DecodeError::SpreadsheetParse`].
pub fn decode_spreadsheet(bytes: &[u8], kind: SpreadsheetKind) -> Result<DecodedTable> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    let range = match kind {
        SpreadsheetKind::Xlsx => first_sheet::<Xlsx<_>>(bytes)?,
        SpreadsheetKind::Xls => first_sheet::<Xls<_>>(bytes)?,
        SpreadsheetKind::Ods => first_sheet::<Ods<_>>(bytes)?,
    };

    table_from_range(&range)
}

/// Open a workbook and read its first worksheet
fn first_sheet<'a, R>(bytes: &'a [u8]) -> Result<Range<Data>>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: Display,
{
    let mut workbook =
        R::new(Cursor::new(bytes)).map_err(|e| DecodeError::SpreadsheetParse(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DecodeError::SpreadsheetParse("Workbook has no sheets".to_string()))?;

    debug!(sheet = %sheet, "Reading worksheet");

    workbook
        .worksheet_range(&sheet)
        .map_err(|e| DecodeError::SpreadsheetParse(format!("{}: {}", sheet, e)))
}

/// Build a table from a worksheet range, first row as header
fn table_from_range(range: &Range<Data>) -> Result<DecodedTable> {
    let mut rows = range.rows();

    let header = rows.next().ok_or(DecodeError::EmptyInput)?;
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(index, cell)| match cell_to_value(cell) {
            CellValue::Empty => format!("Unnamed: {}", index),
            value => value.to_string(),
        })
        .collect();

    let rows: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    DecodedTable::new(columns, rows)
}

/// Convert a calamine cell to a typed value
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => {
            // Workbooks store whole numbers as floats
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                CellValue::Int(*f as i64)
            } else {
                CellValue::Float(*f)
            }
        }
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("#ERROR: {:?}", e)),
        Data::DateTime(dt) => CellValue::Text(format!("{}", dt)),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
