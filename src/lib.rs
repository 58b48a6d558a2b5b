//! # recorddiff
//!
//! Row-level comparison of tables across two database engines. Reports the
//! rows found on only one side, as counts, percentages and the rows themselves.

pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod duckdb_engine;
pub mod engine;
pub mod error;
pub mod hash;
pub mod ignore;
pub mod materialize;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod table_spec;
pub mod timer;
pub mod value;

pub use duckdb_engine::DuckDbEngine;
pub use engine::Engine;
pub use error::{RecorddiffError, Result};
pub use ignore::{IgnoreColumns, IgnoreColumnsMap};
pub use orchestrator::{recorddiff, CompareOptions, RecordDiff, RunReport, TableOutcome, TableReport};
pub use table_spec::TableEntry;

/// Default number of rows per staging batch
pub const DEFAULT_BATCH_SIZE: usize = 10000;

/// Default number of differing rows listed per side in pretty output
pub const DEFAULT_MAX_ROWS_SHOWN: usize = 5;
