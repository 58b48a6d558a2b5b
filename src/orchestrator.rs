//! Runs the comparison over a table list

use crate::diff::{DiffEngine, DiffResult};
use crate::engine::Engine;
use crate::error::Result;
use crate::ignore::{IgnoreColumns, IgnoreColumnsMap, IgnorePlan};
use crate::materialize::RowMaterializer;
use crate::output::{format_count, format_percentage};
use crate::table_spec::{TableEntry, TableResolver};
use crate::timer::RunTimer;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Knobs for a run
#[derive(Debug, Clone, Copy)]
pub struct CompareOptions {
    /// Rows per staging batch
    pub batch_size: usize,
    pub show_progress: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            batch_size: crate::DEFAULT_BATCH_SIZE,
            show_progress: false,
        }
    }
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Result of comparing one table pair
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub label: String,
    pub engine1_label: String,
    pub engine2_label: String,
    pub engine1_table: String,
    pub engine2_table: String,
    pub staged: bool,
    pub excluded_columns: Vec<String>,
    pub diff: DiffResult,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

impl TableReport {
    /// `"<t2>: N newly appear in <engine2> (P% of T rows)"`
    pub fn appear_line(&self) -> String {
        format!(
            "{}: {} newly appear in {} ({} of {} rows)",
            self.engine2_table,
            format_count(self.diff.only_in_engine2.len() as u64),
            self.engine2_label,
            format_percentage(self.diff.percent_only_in_engine2()),
            format_count(self.diff.total_rows_engine2)
        )
    }

    /// `"<t1>: N disappear from <engine1> (P% of T rows)"`
    pub fn disappear_line(&self) -> String {
        format!(
            "{}: {} disappear from {} ({} of {} rows)",
            self.engine1_table,
            format_count(self.diff.only_in_engine1.len() as u64),
            self.engine1_label,
            format_percentage(self.diff.percent_only_in_engine1()),
            format_count(self.diff.total_rows_engine1)
        )
    }
}

/// A table that could not be compared
#[derive(Debug, Clone, Serialize)]
pub struct TableFailure {
    pub label: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Compared(TableReport),
    Failed(TableFailure),
}

impl TableOutcome {
    pub fn label(&self) -> &str {
        match self {
            Self::Compared(report) => &report.label,
            Self::Failed(failure) => &failure.label,
        }
    }

    pub fn report(&self) -> Option<&TableReport> {
        match self {
            Self::Compared(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TableFailure> {
        match self {
            Self::Compared(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Outcomes for every requested table, in input order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tables: Vec<TableOutcome>,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn compared(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter_map(TableOutcome::report)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TableFailure> {
        self.tables.iter().filter_map(TableOutcome::failure)
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Outcome for a table label
    pub fn get(&self, label: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|outcome| outcome.label() == label)
    }
}

/// Column counts of one configured table on both engines
#[derive(Debug, Clone, Serialize)]
pub struct TableCheck {
    pub label: String,
    pub engine1_columns: Option<usize>,
    pub engine2_columns: Option<usize>,
    pub error: Option<String>,
}

/// Builder for a comparison run
pub struct RecordDiff<'a> {
    engine1: &'a dyn Engine,
    engine2: &'a dyn Engine,
    tables: Vec<TableEntry>,
    ignore_all: Vec<String>,
    ignore_cols: IgnoreColumnsMap,
    options: CompareOptions,
}

impl<'a> RecordDiff<'a> {
    pub fn new(engine1: &'a dyn Engine, engine2: &'a dyn Engine) -> Self {
        Self {
            engine1,
            engine2,
            tables: Vec::new(),
            ignore_all: Vec::new(),
            ignore_cols: IgnoreColumnsMap::new(),
            options: CompareOptions::default(),
        }
    }

    pub fn tables<I, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TableEntry>,
    {
        self.tables.extend(tables.into_iter().map(Into::into));
        self
    }

    pub fn ignore_all<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_all.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn ignore_cols(mut self, ignore_cols: IgnoreColumnsMap) -> Self {
        for (table, columns) in ignore_cols {
            let names: Vec<&str> = columns.names();
            self = self.ignore_table_columns(&table, &names);
        }
        self
    }

    /// Add columns ignored for one table, keeping any already configured
    pub fn ignore_table_columns(mut self, table: &str, columns: &[&str]) -> Self {
        let mut names: Vec<String> = self
            .ignore_cols
            .get(table)
            .map(|existing| existing.names().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        names.extend(columns.iter().map(|column| column.to_string()));
        self.ignore_cols.insert(table.to_string(), IgnoreColumns::Many(names));
        self
    }

    pub fn options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(&self) -> Result<RunReport> {
        self.run_with(|_| {})
    }

    /// Run the comparison, handing each table's outcome to `on_outcome` as it completes.
    ///
    /// Connection failures abort the run; every other failure is recorded
    /// against its table and the run moves on.
    pub fn run_with(&self, mut on_outcome: impl FnMut(&TableOutcome)) -> Result<RunReport> {
        let mut timer = RunTimer::start();

        self.engine1.ping()?;
        self.engine2.ping()?;

        let plan = IgnorePlan::new(&self.ignore_all, &self.ignore_cols);
        let materializer = RowMaterializer::new(self.engine1, self.engine2)
            .with_batch_size(self.options.batch_size)
            .with_progress(self.options.show_progress);

        let mut outcomes = Vec::with_capacity(self.tables.len());
        for entry in &self.tables {
            timer.start_lap();
            let outcome = match self.compare_table(entry, &plan, &materializer, &mut timer) {
                Ok(report) => {
                    log::info!(
                        "{}: {} only in {}, {} only in {}",
                        report.label,
                        report.diff.only_in_engine2.len(),
                        report.engine2_label,
                        report.diff.only_in_engine1.len(),
                        report.engine1_label
                    );
                    TableOutcome::Compared(report)
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("{}: {}", entry.display_label(), e);
                    TableOutcome::Failed(TableFailure {
                        label: entry.display_label(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    })
                }
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        Ok(RunReport {
            tables: outcomes,
            elapsed: timer.elapsed(),
        })
    }

    fn compare_table(
        &self,
        entry: &TableEntry,
        plan: &IgnorePlan,
        materializer: &RowMaterializer<'_>,
        timer: &mut RunTimer,
    ) -> Result<TableReport> {
        let table = TableResolver::resolve(entry)?;
        log::info!("Comparing {}", table.label);

        let exclusions = plan.columns_for(&table);
        let pair = materializer.materialize(&table, &exclusions)?;
        let diff = DiffEngine::compute(&table.label, &pair.engine1, &pair.engine2)?;

        Ok(TableReport {
            label: table.label.clone(),
            engine1_label: self.engine1.label().to_string(),
            engine2_label: self.engine2.label().to_string(),
            engine1_table: table.engine1.to_string(),
            engine2_table: table.engine2.to_string(),
            staged: pair.staged,
            excluded_columns: pair.excluded,
            diff,
            elapsed: timer.end_lap(),
        })
    }

    /// Ping both engines and describe every table without comparing rows
    pub fn check(&self) -> Result<Vec<TableCheck>> {
        self.engine1.ping()?;
        self.engine2.ping()?;

        let mut checks = Vec::with_capacity(self.tables.len());
        for entry in &self.tables {
            let mut check = TableCheck {
                label: entry.display_label(),
                engine1_columns: None,
                engine2_columns: None,
                error: None,
            };

            let described = TableResolver::resolve(entry).and_then(|table| {
                check.engine1_columns = Some(self.engine1.describe_table(&table.engine1)?.len());
                check.engine2_columns = Some(self.engine2.describe_table(&table.engine2)?.len());
                Ok(())
            });
            match described {
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => check.error = Some(e.to_string()),
                Ok(()) => {}
            }
            checks.push(check);
        }
        Ok(checks)
    }
}

/// Compare `tables` between two engines
pub fn recorddiff(
    engine1: &dyn Engine,
    engine2: &dyn Engine,
    tables: &[TableEntry],
    ignore_all: &[String],
    ignore_cols: &IgnoreColumnsMap,
) -> Result<RunReport> {
    RecordDiff::new(engine1, engine2)
        .tables(tables.iter().cloned())
        .ignore_all(ignore_all.iter().cloned())
        .ignore_cols(ignore_cols.clone())
        .run()
}
