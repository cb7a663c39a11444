//! Cleaning and reshaping operations.
//!
//! Every operation takes a table by reference and returns a new one.

use std::collections::{HashMap, HashSet};

use crate::error::TableError;
use crate::table::{CellValue, DecodedTable};

/// Remove repeated rows, keeping the first occurrence
pub fn drop_duplicates(table: &DecodedTable) -> DecodedTable {
    let mut seen = HashSet::new();
    let rows: Vec<Vec<CellValue>> = table
        .rows()
        .iter()
        .filter(|row| seen.insert(row.iter().map(CellValue::key).collect::<Vec<_>>()))
        .cloned()
        .collect();

    table.with_rows(rows)
}

/// Fill missing cells of numeric columns with the column mean
///
/// A filled column becomes a float column. Text columns and columns with no
/// numbers are left untouched.
pub fn fill_missing_with_mean(table: &DecodedTable) -> DecodedTable {
    let mut rows = table.rows().to_vec();

    for col in 0..table.column_count() {
        if !table.is_numeric_column(col) || !rows.iter().any(|row| row[col].is_empty()) {
            continue;
        }

        let values: Vec<f64> = rows.iter().filter_map(|row| row[col].as_f64()).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        for row in &mut rows {
            row[col] = match &row[col] {
                CellValue::Empty => CellValue::Float(mean),
                value => CellValue::Float(value.as_f64().unwrap_or(mean)),
            };
        }
    }

    table.with_rows(rows)
}

/// Keep only the named columns, in the order given
pub fn select_columns<S: AsRef<str>>(
    table: &DecodedTable,
    names: &[S],
) -> Result<DecodedTable, TableError> {
    let indices = names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            table
                .column_index(name)
                .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(table.project(&indices))
}

/// Count occurrences of each non-empty value in a column
///
/// Most frequent first; equal counts keep first-seen order.
pub fn value_counts(table: &DecodedTable, column: &str) -> Result<Vec<(String, usize)>, TableError> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for cell in table.column(column)? {
        if cell.is_empty() {
            continue;
        }
        let value = cell.to_string();
        match counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                counts.insert(value.clone(), 1);
                order.push(value);
            }
        }
    }

    let mut result: Vec<(String, usize)> = order
        .into_iter()
        .map(|value| {
            let count = counts[&value];
            (value, count)
        })
        .collect();
    // Stable sort keeps first-seen order among ties
    result.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(result)
}
