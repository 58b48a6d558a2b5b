//! Command implementations for recorddiff CLI

use crate::cli::{Commands, IgnoreSpec, OutputFormat};
use crate::config::RunConfig;
use crate::duckdb_engine::DuckDbEngine;
use crate::engine::{Engine, Relabeled};
use crate::error::{RecorddiffError, Result};
use crate::orchestrator::{CompareOptions, RecordDiff};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::table_spec::TableEntry;
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Compare {
            config,
            tables,
            ignore_all,
            ignore,
            format,
            max_rows,
            batch_size,
            no_progress,
            output,
        } => compare_command(
            &config,
            &tables,
            &ignore_all,
            &ignore,
            &format,
            max_rows,
            CompareOptions {
                batch_size,
                show_progress: !no_progress,
            },
            output.as_deref(),
        ),
        Commands::Check { config, format } => check_command(&config, &format),
    }
}

/// Engines opened from a run configuration
pub enum OpenedEngines {
    /// engine1 and engine2 describe the same database: one session serves both
    Shared {
        engine: DuckDbEngine,
        label1: String,
        label2: String,
    },
    Separate(DuckDbEngine, DuckDbEngine),
}

impl OpenedEngines {
    pub fn open(config: &RunConfig) -> Result<Self> {
        if config.engines_identical() {
            log::info!("engine1 and engine2 are identical, comparing within one session");
            let label1 = config.engine1.label.clone().unwrap_or_else(|| "engine1".to_string());
            let label2 = config.engine2.label.clone().unwrap_or_else(|| "engine2".to_string());
            let engine = DuckDbEngine::from_config(&config.engine1, &label1)?;
            Ok(Self::Shared {
                engine,
                label1,
                label2,
            })
        } else {
            let engine1 = DuckDbEngine::from_config(&config.engine1, "engine1")?;
            let engine2 = DuckDbEngine::from_config(&config.engine2, "engine2")?;
            Ok(Self::Separate(engine1, engine2))
        }
    }

    /// Hand both sides to `body`
    pub fn with_pair<T>(&self, body: impl FnOnce(&dyn Engine, &dyn Engine) -> Result<T>) -> Result<T> {
        match self {
            Self::Shared {
                engine,
                label1,
                label2,
            } => {
                let engine1 = Relabeled::new(engine, label1.as_str());
                let engine2 = Relabeled::new(engine, label2.as_str());
                body(&engine1, &engine2)
            }
            Self::Separate(engine1, engine2) => body(engine1, engine2),
        }
    }
}

/// Compare the configured tables
#[allow(clippy::too_many_arguments)]
fn compare_command(
    config_path: &Path,
    tables: &[String],
    ignore_all: &[String],
    ignore: &[IgnoreSpec],
    format: &str,
    max_rows: usize,
    options: CompareOptions,
    output: Option<&Path>,
) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(RecorddiffError::invalid_input)?;

    let mut config = RunConfig::load(config_path)?;
    if !tables.is_empty() {
        config.tables = tables.iter().map(|table| TableEntry::parse_cli(table)).collect();
    }
    config.ignore_all.extend(ignore_all.iter().cloned());
    if config.tables.is_empty() {
        return Err(RecorddiffError::invalid_input(
            "No tables to compare. List them in the config file or on the command line",
        ));
    }

    let engines = OpenedEngines::open(&config)?;
    let printer = PrettyPrinter::new(max_rows);

    let rendered = engines.with_pair(|engine1, engine2| {
        let mut run = RecordDiff::new(engine1, engine2)
            .tables(config.tables.iter().cloned())
            .ignore_all(config.ignore_all.iter().cloned())
            .ignore_cols(config.ignore_cols.clone())
            .options(options);
        for spec in ignore {
            let columns: Vec<&str> = spec.columns.iter().map(String::as_str).collect();
            run = run.ignore_table_columns(&spec.table, &columns);
        }

        match (output_format, output) {
            // print each table as soon as it is done
            (OutputFormat::Pretty, None) => {
                let mut print_error = None;
                let report = run.run_with(|outcome| {
                    if let Err(e) = printer.print_table_outcome(outcome) {
                        print_error.get_or_insert(e);
                    }
                })?;
                if let Some(e) = print_error {
                    return Err(e);
                }
                PrettyPrinter::print_run_summary(&report);
                Ok(None)
            }
            (OutputFormat::Pretty, Some(_)) => Ok(Some(printer.render_run(&run.run()?)?)),
            (OutputFormat::Json, _) => Ok(Some(JsonFormatter::format_run_report(&run.run()?)?)),
        }
    })?;

    if let Some(rendered) = rendered {
        write_output(&rendered, output)?;
    }
    Ok(())
}

/// Connect both engines and describe the configured tables
fn check_command(config_path: &Path, format: &str) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(RecorddiffError::invalid_input)?;
    let config = RunConfig::load(config_path)?;
    let engines = OpenedEngines::open(&config)?;

    let rendered = engines.with_pair(|engine1, engine2| {
        let checks = RecordDiff::new(engine1, engine2)
            .tables(config.tables.iter().cloned())
            .check()?;
        match output_format {
            OutputFormat::Pretty => Ok(PrettyPrinter::render_check_results(
                engine1.label(),
                engine2.label(),
                &checks,
            )),
            OutputFormat::Json => {
                JsonFormatter::format_check_results(engine1.label(), engine2.label(), &checks)
            }
        }
    })?;

    write_output(&rendered, None)
}

/// Print to stdout or write to a file
fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("📄 Report written to {}", display_path(path).display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn display_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
