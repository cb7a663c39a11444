//! The decoded table and its cell values.

use std::fmt;

use serde::Serialize;

use crate::error::{DecodeError, Result, TableError};

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing value
    Empty,
    /// Whole number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Anything else, kept verbatim
    Text(String),
}

impl CellValue {
    /// Whether the cell holds a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }

    /// Whether the cell is missing
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric value as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Hashable identity used for duplicate detection
    pub(crate) fn key(&self) -> CellKey {
        match self {
            CellValue::Empty => CellKey::Empty,
            CellValue::Int(i) => CellKey::Int(*i),
            CellValue::Float(f) => CellKey::Float(f.to_bits()),
            CellValue::Bool(b) => CellKey::Bool(*b),
            CellValue::Text(s) => CellKey::Text(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => {
                // Keep a decimal point so the value reads back as a float
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Empty,
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

/// Column-typed view used when classifying raw text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

/// Type a column of raw text fields
///
/// Every non-empty field must agree for a column to be numeric or boolean;
/// a single stray value makes the whole column text.
pub(crate) fn infer_column(fields: Vec<String>) -> Vec<CellValue> {
    let kind = fields
        .iter()
        .filter(|s| !s.trim().is_empty())
        .fold(None, |kind, field| Some(widen(kind, classify(field))))
        .unwrap_or(ColumnKind::Text);

    fields
        .into_iter()
        .map(|field| {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                return CellValue::Empty;
            }
            match kind {
                ColumnKind::Int => trimmed
                    .parse()
                    .map(CellValue::Int)
                    .unwrap_or(CellValue::Text(field)),
                ColumnKind::Float => trimmed
                    .parse()
                    .map(CellValue::Float)
                    .unwrap_or(CellValue::Text(field)),
                ColumnKind::Bool => CellValue::Bool(trimmed.eq_ignore_ascii_case("true")),
                ColumnKind::Text => CellValue::Text(field),
            }
        })
        .collect()
}

fn classify(field: &str) -> ColumnKind {
    let trimmed = field.trim();
    if trimmed.parse::<i64>().is_ok() {
        ColumnKind::Int
    } else if is_finite_number(trimmed) {
        ColumnKind::Float
    } else if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

/// `f64` parsing also accepts `nan` and `inf`, which are words here
fn is_finite_number(field: &str) -> bool {
    field.parse::<f64>().is_ok_and(f64::is_finite)
}

fn widen(current: Option<ColumnKind>, next: ColumnKind) -> ColumnKind {
    match (current, next) {
        (None, kind) => kind,
        (Some(a), b) if a == b => a,
        (Some(ColumnKind::Int), ColumnKind::Float) | (Some(ColumnKind::Float), ColumnKind::Int) => {
            ColumnKind::Float
        }
        _ => ColumnKind::Text,
    }
}

/// Ordered column names with positionally aligned rows
///
/// Every row has exactly one cell per column; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl DecodedTable {
    /// Build a table, rejecting rows whose length differs from the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DecodeError::RaggedRow {
                // Header is line 1
                line: index as u64 + 2,
                expected: columns.len(),
                found: row.len(),
            });
        }

        let mut table = Self { columns, rows };
        table.unify_numeric_columns();
        Ok(table)
    }

    /// Build a table from a header and raw text rows, typing each column
    pub fn from_text_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let width = columns.len();
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(DecodeError::RaggedRow {
                line: index as u64 + 2,
                expected: width,
                found: row.len(),
            });
        }

        let height = rows.len();
        let mut by_column: Vec<Vec<String>> = vec![Vec::with_capacity(height); width];
        for row in rows {
            for (col, field) in row.into_iter().enumerate() {
                by_column[col].push(field);
            }
        }

        let mut typed: Vec<std::vec::IntoIter<CellValue>> = by_column
            .into_iter()
            .map(|fields| infer_column(fields).into_iter())
            .collect();

        let rows = (0..height)
            .map(|_| {
                typed
                    .iter_mut()
                    .map(|column| column.next().unwrap_or(CellValue::Empty))
                    .collect()
            })
            .collect();

        Self::new(columns, rows)
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of data rows (header excluded)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> std::result::Result<Vec<&CellValue>, TableError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Whether a column holds at least one number and nothing but numbers
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut saw_number = false;
        for row in &self.rows {
            match &row[index] {
                CellValue::Empty => {}
                value if value.is_numeric() => saw_number = true,
                _ => return false,
            }
        }
        saw_number
    }

    /// Names of the numeric columns, in table order
    pub fn numeric_columns(&self) -> Vec<&str> {
        (0..self.columns.len())
            .filter(|&i| self.is_numeric_column(i))
            .map(|i| self.columns[i].as_str())
            .collect()
    }

    /// The first `limit` numeric columns as a new table
    pub fn numeric_subset(&self, limit: usize) -> DecodedTable {
        let indices: Vec<usize> = (0..self.columns.len())
            .filter(|&i| self.is_numeric_column(i))
            .take(limit)
            .collect();
        self.project(&indices)
    }

    /// The first `n` rows as a new table
    pub fn head(&self, n: usize) -> DecodedTable {
        DecodedTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Rows rendered as strings, header first
    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.columns.clone())
            .chain(
                self.rows
                    .iter()
                    .map(|row| row.iter().map(ToString::to_string).collect()),
            )
            .collect()
    }

    /// Consume the table into its columns and rows
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }

    /// Same columns, new rows of the same width
    pub(crate) fn with_rows(&self, rows: Vec<Vec<CellValue>>) -> DecodedTable {
        debug_assert!(rows.iter().all(|row| row.len() == self.columns.len()));
        DecodedTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub(crate) fn project(&self, indices: &[usize]) -> DecodedTable {
        DecodedTable {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Promote integers to floats in columns that mix both
    fn unify_numeric_columns(&mut self) {
        for col in 0..self.columns.len() {
            let has_float = self
                .rows
                .iter()
                .any(|row| matches!(row[col], CellValue::Float(_)));
            if !has_float || !self.is_numeric_column(col) {
                continue;
            }
            for row in &mut self.rows {
                if let CellValue::Int(i) = row[col] {
                    row[col] = CellValue::Float(i as f64);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_short_row_rejected() {
        let result = DecodedTable::new(
            strings(&["a", "b"]),
            vec![
                vec![CellValue::Int(1), CellValue::Int(2)],
                vec![CellValue::Int(3)],
            ],
        );
        match result {
            Err(DecodeError::RaggedRow {
                line,
                expected,
                found,
            }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("Expected RaggedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_infer_int_column() {
        let cells = infer_column(strings(&["30", " 41", ""]));
        assert_eq!(
            cells,
            vec![CellValue::Int(30), CellValue::Int(41), CellValue::Empty]
        );
    }

    #[test]
    fn test_infer_float_column_upcasts_ints() {
        let cells = infer_column(strings(&["1", "2.5"]));
        assert_eq!(cells, vec![CellValue::Float(1.0), CellValue::Float(2.5)]);
    }

    #[test]
    fn test_infer_mixed_column_is_text() {
        let cells = infer_column(strings(&["1", "n/a"]));
        assert_eq!(
            cells,
            vec![
                CellValue::Text("1".to_string()),
                CellValue::Text("n/a".to_string())
            ]
        );
    }

    #[test]
    fn test_nan_and_infinity_are_text() {
        let cells = infer_column(strings(&["Nan", "inf", "Infinity"]));
        assert_eq!(
            cells,
            vec![
                CellValue::Text("Nan".to_string()),
                CellValue::Text("inf".to_string()),
                CellValue::Text("Infinity".to_string())
            ]
        );

        let table = DecodedTable::from_text_rows(
            vec!["name".to_string(), "score".to_string()],
            vec![
                vec!["Nan".to_string(), "1.5".to_string()],
                vec!["Bo".to_string(), "NaN".to_string()],
            ],
        )
        .unwrap();
        assert!(table.numeric_columns().is_empty());
        assert_eq!(
            table.to_string_rows(),
            vec![vec!["name", "score"], vec!["Nan", "1.5"], vec!["Bo", "NaN"]]
        );
    }

    #[test]
    fn test_infer_bool_column() {
        let cells = infer_column(strings(&["TRUE", "false"]));
        assert_eq!(cells, vec![CellValue::Bool(true), CellValue::Bool(false)]);
    }

    #[test]
    fn test_from_text_rows_types_columns() {
        let table = DecodedTable::from_text_rows(
            strings(&["name", "age"]),
            vec![strings(&["Ana", "30"]), strings(&["Bo", "41"])],
        )
        .unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][0], CellValue::Text("Ana".to_string()));
        assert_eq!(table.rows()[1][1], CellValue::Int(41));
        assert_eq!(table.numeric_columns(), vec!["age"]);
    }

    #[test]
    fn test_mixed_numeric_column_unified() {
        let table = DecodedTable::new(
            strings(&["x"]),
            vec![vec![CellValue::Int(1)], vec![CellValue::Float(1.5)]],
        )
        .unwrap();
        assert_eq!(table.rows()[0][0], CellValue::Float(1.0));
    }

    #[test]
    fn test_all_empty_column_not_numeric() {
        let table = DecodedTable::new(
            strings(&["x", "y"]),
            vec![vec![CellValue::Empty, CellValue::Int(1)]],
        )
        .unwrap();
        assert_eq!(table.numeric_columns(), vec!["y"]);
    }

    #[test]
    fn test_numeric_subset_takes_first_columns() {
        let table = DecodedTable::from_text_rows(
            strings(&["name", "a", "b", "c"]),
            vec![strings(&["x", "1", "2", "3"])],
        )
        .unwrap();

        let subset = table.numeric_subset(2);
        assert_eq!(subset.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(subset.rows()[0], vec![CellValue::Int(1), CellValue::Int(2)]);
    }

    #[test]
    fn test_to_string_rows() {
        let table = DecodedTable::from_text_rows(
            strings(&["name", "score"]),
            vec![strings(&["Ana", "1.5"]), strings(&["Bo", ""])],
        )
        .unwrap();
        assert_eq!(
            table.to_string_rows(),
            vec![
                strings(&["name", "score"]),
                strings(&["Ana", "1.5"]),
                strings(&["Bo", ""]),
            ]
        );
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(CellValue::Float(30.0).to_string(), "30.0");
        assert_eq!(CellValue::Float(3.25).to_string(), "3.25");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_column_lookup() {
        let table =
            DecodedTable::from_text_rows(strings(&["a"]), vec![strings(&["1"])]).unwrap();
        assert_eq!(table.column("a").unwrap(), vec![&CellValue::Int(1)]);
        assert!(matches!(
            table.column("missing"),
            Err(TableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_head() {
        let table = DecodedTable::from_text_rows(
            strings(&["a"]),
            vec![strings(&["1"]), strings(&["2"]), strings(&["3"])],
        )
        .unwrap();
        assert_eq!(table.head(2).row_count(), 2);
        assert_eq!(table.head(10).row_count(), 3);
    }
}
