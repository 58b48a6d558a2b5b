//! Command-line interface for recorddiff

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "recorddiff")]
#[command(about = "Row-level diff of tables across two database engines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare tables between engine1 and engine2
    Compare {
        /// Run configuration file (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Tables to compare, replacing the configured list: "table" or "engine1_table:engine2_table"
        tables: Vec<String>,

        /// Column to ignore in every table (repeatable)
        #[arg(long = "ignore-all")]
        ignore_all: Vec<String>,

        /// Columns to ignore in one table: "table=col1,col2" (repeatable)
        #[arg(long = "ignore", value_parser = IgnoreSpec::parse)]
        ignore: Vec<IgnoreSpec>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Differing rows listed per side in pretty output (0 lists all)
        #[arg(long, default_value_t = crate::DEFAULT_MAX_ROWS_SHOWN)]
        max_rows: usize,

        /// Rows per staging batch (must be > 0)
        #[arg(long, default_value_t = crate::DEFAULT_BATCH_SIZE, value_parser = validate_batch_size)]
        batch_size: usize,

        /// Hide the staging progress bar
        #[arg(long)]
        no_progress: bool,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Connect both engines and describe the configured tables
    Check {
        /// Run configuration file (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Per-table ignore given on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct IgnoreSpec {
    pub table: String,
    pub columns: Vec<String>,
}

impl IgnoreSpec {
    pub fn parse(s: &str) -> Result<Self, String> {
        let (table, columns) = s
            .split_once('=')
            .ok_or_else(|| format!("Invalid ignore spec: '{}'. Use 'table=col1,col2'", s))?;

        let table = table.trim();
        if table.is_empty() {
            return Err(format!("Invalid ignore spec: '{}'. Table name is empty", s));
        }

        let columns: Vec<String> = columns
            .split(',')
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .map(str::to_string)
            .collect();
        if columns.is_empty() {
            return Err(format!("Invalid ignore spec: '{}'. No columns given", s));
        }

        Ok(Self {
            table: table.to_string(),
            columns,
        })
    }
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Log level for the `--verbose` flag
pub fn log_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Validate that batch size is greater than 0
fn validate_batch_size(s: &str) -> Result<usize, String> {
    let batch_size: usize = s
        .parse()
        .map_err(|_| format!("Invalid batch size: '{}'. Must be a positive integer.", s))?;

    if batch_size == 0 {
        return Err("Batch size must be greater than 0".to_string());
    }

    Ok(batch_size)
}
