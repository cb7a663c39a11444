//! sweeper CLI - Command-line interface library
//!
//! This library provides the CLI functionality for Data Sweeper, including:
//! - Inspect: Show encoding, shape and a preview of CSV and spreadsheet files
//! - Clean: Remove duplicates, fill gaps, select columns and export as CSV
//! - Counts: Count the values of one column
//!
//! # Library Usage
//!
//! ```ignore
//! use sweeper_cli::{clean_command, inspect_command, CleanArgs, OutputFormat};
//!
//! inspect_command(&["data/*.csv".to_string()], OutputFormat::Json, 5)?;
//!
//! let args = CleanArgs { dedupe: true, ..Default::default() };
//! clean_command(&["survey.xlsx".to_string()], &args)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Inspect every CSV file in a directory
//! sweeper inspect 'data/*.csv'
//!
//! # Clean a workbook and write output/survey.csv
//! sweeper clean survey.xlsx --dedupe --fill-missing --columns name,score
//!
//! # Count the values of a column
//! sweeper counts votes.csv --column party --format json
//! ```

pub mod app;
pub mod config;

// Re-export main entry point and types
pub use app::{
    clean_command, count_values, counts_command, expand_inputs, inspect_command, inspect_file,
};
pub use app::{run_cli, CleanArgs, EncodingReport, FileReport, OutputFormat, TableReport};
pub use config::{CleaningSettings, ExportSettings, Settings};
