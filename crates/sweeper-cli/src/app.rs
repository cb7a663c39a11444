//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use serde::Serialize;
use tracing::{error, info};

use sweeper_data::{
    export_csv, value_counts, CellValue, Confidence, DecodedEncoding, Decoder, Pipeline, RawFile,
};

use crate::config::Settings;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "sweeper")]
#[command(author, version, about = "Read, clean and export messy CSV and spreadsheet files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show file info, detected encoding, shape and a preview of each input
    Inspect {
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Number of preview rows
        #[arg(short = 'n', long, default_value_t = 5)]
        rows: usize,
    },

    /// Clean inputs and export them as CSV
    Clean {
        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Remove duplicate rows
        #[arg(long)]
        dedupe: bool,

        /// Fill missing numeric values with the column mean
        #[arg(long)]
        fill_missing: bool,

        /// Columns to keep, comma separated
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Count the values of one column
    Counts {
        /// Input file
        input: PathBuf,

        /// Column to count
        #[arg(long)]
        column: String,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            inputs,
            format,
            rows,
        } => inspect_command(&inputs, format, rows),
        Commands::Clean {
            inputs,
            dedupe,
            fill_missing,
            columns,
            output,
            config,
        } => {
            let args = CleanArgs {
                dedupe,
                fill_missing,
                columns,
                output,
                config,
            };
            clean_command(&inputs, &args)
        }
        Commands::Counts {
            input,
            column,
            format,
        } => counts_command(&input, &column, format),
    }
}

/// Expand glob patterns into file paths
///
/// Plain paths and patterns without matches are passed through unchanged so
/// that a missing file is reported like any other failure.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let mut matched: Vec<PathBuf> = glob(input)
            .with_context(|| format!("Invalid glob pattern: {}", input))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    eprintln!("Warning: Could not read {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();

        if matched.is_empty() {
            paths.push(PathBuf::from(input));
        } else {
            matched.sort();
            paths.append(&mut matched);
        }
    }

    Ok(paths)
}

/// Summary of one inspected file
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// File name
    pub file: String,
    /// Size in KiB, when the file could be read
    pub size_kib: Option<f64>,
    /// Encoding that decoded delimited text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingReport>,
    /// Table summary on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableReport>,
    /// Error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Encoding of a text file
#[derive(Debug, Serialize)]
pub struct EncodingReport {
    /// Encoding the table was decoded with
    pub name: String,
    /// Encoding tried first
    pub detected: String,
    pub from_bom: bool,
    /// Whether the detected encoding failed and a fallback was used
    pub fallback: bool,
}

impl From<DecodedEncoding> for EncodingReport {
    fn from(encoding: DecodedEncoding) -> Self {
        Self {
            name: encoding.charset.name().to_string(),
            detected: encoding.primary().name().to_string(),
            from_bom: encoding
                .guess
                .is_some_and(|guess| guess.confidence == Confidence::ByteOrderMark),
            fallback: encoding.is_fallback(),
        }
    }
}

/// Shape and preview of a decoded table
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub rows: usize,
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub preview: Vec<Vec<CellValue>>,
}

impl FileReport {
    /// Whether the file decoded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Decode one file and summarize it
pub fn inspect_file(path: &Path, preview_rows: usize) -> FileReport {
    let file = match RawFile::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!(file = %path.display(), error = %e, "Failed to open file");
            return FileReport {
                file: path.display().to_string(),
                size_kib: None,
                encoding: None,
                table: None,
                error: Some(e.to_string()),
            };
        }
    };

    let mut report = FileReport {
        file: file.name().to_string(),
        size_kib: Some(file.size_kib()),
        encoding: None,
        table: None,
        error: None,
    };

    match Decoder::new().decode_with_encoding(&file) {
        Ok((table, encoding)) => {
            report.encoding = encoding.map(EncodingReport::from);
            report.table = Some(TableReport {
                rows: table.row_count(),
                columns: table.columns().to_vec(),
                numeric_columns: table
                    .numeric_columns()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                preview: table.head(preview_rows).into_parts().1,
            });
        }
        Err(e) => {
            error!(file = file.name(), error = %e, "Failed to decode file");
            report.error = Some(e.to_string());
        }
    }

    report
}

/// Execute the inspect command
pub fn inspect_command(inputs: &[String], format: OutputFormat, preview_rows: usize) -> Result<()> {
    let paths = expand_inputs(inputs)?;
    let reports: Vec<FileReport> = paths
        .iter()
        .map(|path| inspect_file(path, preview_rows))
        .collect();
    let failed = reports.iter().filter(|r| !r.is_ok()).count();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports)
                .context("Failed to serialize inspect report")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for report in &reports {
                print_report(report);
            }
        }
    }

    finish_batch(reports.len(), failed)
}

fn print_report(report: &FileReport) {
    match report.size_kib {
        Some(size) => println!("File: {} ({:.2} KiB)", report.file, size),
        None => println!("File: {}", report.file),
    }

    if let Some(encoding) = &report.encoding {
        if encoding.fallback {
            println!(
                "  Encoding: {} (fallback, {} failed)",
                encoding.name, encoding.detected
            );
        } else if encoding.from_bom {
            println!("  Encoding: {} (byte order mark)", encoding.name);
        } else {
            println!("  Encoding: {} (detected)", encoding.name);
        }
    }

    if let Some(error) = &report.error {
        eprintln!("Error processing {}: {}", report.file, error);
        println!();
        return;
    }

    if let Some(table) = &report.table {
        println!(
            "  Shape: {} rows x {} columns",
            table.rows,
            table.columns.len()
        );
        if table.numeric_columns.is_empty() {
            println!("  Numeric columns: none");
        } else {
            println!("  Numeric columns: {}", table.numeric_columns.join(", "));
        }
        println!("  Preview:");
        println!("    {}", table.columns.join(" | "));
        for row in &table.preview {
            let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
            println!("    {}", cells.join(" | "));
        }
    }
    println!();
}

/// Options of the clean command given on the command line
#[derive(Debug, Clone, Default)]
pub struct CleanArgs {
    pub dedupe: bool,
    pub fill_missing: bool,
    pub columns: Vec<String>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Execute the clean command
///
/// Every input is processed even when some fail; the command fails afterwards
/// if any input did.
pub fn clean_command(inputs: &[String], args: &CleanArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;

    let mut options = settings.pipeline_options();
    if args.dedupe {
        options.remove_duplicates = true;
    }
    if args.fill_missing {
        options.fill_missing = true;
    }
    if !args.columns.is_empty() {
        options.columns = Some(args.columns.clone());
    }

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.export.output_dir));
    let delimiter = settings.export.delimiter_byte()?;

    let paths = expand_inputs(inputs)?;
    info!(files = paths.len(), output = %output_dir.display(), "Cleaning files");

    let pipeline = Pipeline::new(options);
    let outcomes = pipeline.process_paths(&paths);

    let mut failed = 0;
    for outcome in &outcomes {
        let table = match &outcome.result {
            Ok(table) => table,
            Err(e) => {
                eprintln!("Error processing {}: {}", outcome.name, e);
                failed += 1;
                continue;
            }
        };

        match export_csv(table, &outcome.name, &output_dir, delimiter) {
            Ok(path) => println!(
                "Cleaned: {} ({:.2} KiB) -> {} ({} rows)",
                outcome.name,
                outcome.size_kib.unwrap_or_default(),
                path.display(),
                table.row_count()
            ),
            Err(e) => {
                error!(file = %outcome.name, error = %e, "Failed to export file");
                eprintln!("Error processing {}: {}", outcome.name, e);
                failed += 1;
            }
        }
    }

    finish_batch(outcomes.len(), failed)
}

/// Decode a file and count the values of one column
pub fn count_values(input: &Path, column: &str) -> Result<Vec<(String, usize)>> {
    let file = RawFile::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let table = Decoder::new()
        .decode(&file)
        .with_context(|| format!("Failed to decode {}", file.name()))?;
    let counts = value_counts(&table, column)
        .with_context(|| format!("Failed to count values in {}", file.name()))?;
    Ok(counts)
}

#[derive(Serialize)]
struct ValueCount<'a> {
    value: &'a str,
    count: usize,
}

/// Execute the counts command
pub fn counts_command(input: &Path, column: &str, format: OutputFormat) -> Result<()> {
    let counts = count_values(input, column)?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<ValueCount<'_>> = counts
                .iter()
                .map(|(value, count)| ValueCount {
                    value,
                    count: *count,
                })
                .collect();
            let json =
                serde_json::to_string_pretty(&entries).context("Failed to serialize counts")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("Value counts for '{}' in {}:", column, input.display());
            let width = counts.iter().map(|(v, _)| v.chars().count()).max().unwrap_or(0);
            for (value, count) in &counts {
                println!("  {:<width$}  {}", value, count, width = width);
            }
        }
    }

    Ok(())
}

/// Print the batch summary and fail if any file failed
fn finish_batch(total: usize, failed: usize) -> Result<()> {
    eprintln!(
        "All files processed: {} succeeded, {} failed",
        total - failed,
        failed
    );

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, total);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parse_inspect() {
        let args = vec!["sweeper", "inspect", "a.csv", "b.xlsx"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Inspect {
                inputs,
                format,
                rows,
            } => {
                assert_eq!(inputs, vec!["a.csv", "b.xlsx"]);
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(rows, 5);
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_parse_inspect_json() {
        let args = vec!["sweeper", "inspect", "data/*.csv", "--format", "json", "-n", "2"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Inspect { format, rows, .. } => {
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(rows, 2);
            }
            _ => panic!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_parse_clean() {
        let args = vec![
            "sweeper",
            "clean",
            "survey.csv",
            "--dedupe",
            "--columns",
            "name,score",
            "-o",
            "cleaned",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Clean {
                inputs,
                dedupe,
                fill_missing,
                columns,
                output,
                config,
            } => {
                assert_eq!(inputs, vec!["survey.csv"]);
                assert!(dedupe);
                assert!(!fill_missing);
                assert_eq!(columns, vec!["name", "score"]);
                assert_eq!(output, Some(PathBuf::from("cleaned")));
                assert!(config.is_none());
            }
            _ => panic!("Expected Clean command"),
        }
    }

    #[test]
    fn test_cli_parse_counts() {
        let args = vec!["sweeper", "counts", "votes.xlsx", "--column", "party"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Counts {
                input,
                column,
                format,
            } => {
                assert_eq!(input, PathBuf::from("votes.xlsx"));
                assert_eq!(column, "party");
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("Expected Counts command"),
        }
    }

    #[test]
    fn test_cli_requires_inputs() {
        assert!(Cli::try_parse_from(vec!["sweeper", "clean"]).is_err());
        assert!(Cli::try_parse_from(vec!["sweeper", "counts", "a.csv"]).is_err());
    }

    #[test]
    fn test_expand_inputs_glob() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("c.txt"), "x\n1\n").unwrap();

        let pattern = dir.path().join("*.csv").display().to_string();
        let paths = expand_inputs(&[pattern]).unwrap();

        assert_eq!(
            paths,
            vec![dir.path().join("a.csv"), dir.path().join("b.csv")]
        );
    }

    #[test]
    fn test_expand_inputs_passthrough() {
        let dir = TempDir::new().unwrap();
        let unmatched = dir.path().join("*.xlsx").display().to_string();

        let paths = expand_inputs(&["plain.csv".to_string(), unmatched.clone()]).unwrap();

        assert_eq!(
            paths,
            vec![PathBuf::from("plain.csv"), PathBuf::from(unmatched)]
        );
    }

    #[test]
    fn test_finish_batch() {
        assert!(finish_batch(3, 0).is_ok());
        assert!(finish_batch(3, 1).is_err());
    }
}
