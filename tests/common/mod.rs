//! Common test utilities and helpers

use recorddiff::engine::{ColumnInfo, Engine, ProjectedColumn};
use recorddiff::table_spec::QualifiedName;
use recorddiff::value::{Row, Value};
use recorddiff::{DuckDbEngine, RecorddiffError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// In-memory DuckDB engine seeded with `sql`
pub fn engine_with(label: &str, sql: &str) -> DuckDbEngine {
    let engine = DuckDbEngine::open_in_memory(label).expect("Should open in-memory engine");
    engine.execute_batch(sql).expect("Fixture SQL should run");
    engine
}

/// Number of temporary tables alive in the engine's session
pub fn temp_table_count(engine: &DuckDbEngine) -> i64 {
    engine
        .connection()
        .query_row("SELECT COUNT(*) FROM duckdb_tables() WHERE temporary", [], |row| row.get(0))
        .expect("Should query duckdb_tables()")
}

/// Build a row from `(column, value)` pairs
pub fn row<V: Into<Value> + Clone>(values: &[(&str, V)]) -> Row {
    values.iter().map(|(column, value)| (*column, value.clone())).collect()
}

/// The usps_cityzip pair: 189 rows on engine1, 184 on engine2.
///
/// 183 rows match once objectid and cityname are ignored; engine1 has 6
/// more rows, engine2 has one row of its own.
pub fn usps_cityzip_engines() -> (DuckDbEngine, DuckDbEngine) {
    let schema = "CREATE TABLE usps_cityzip (objectid INTEGER, zip VARCHAR, cityname VARCHAR, state VARCHAR);";
    let engine1 = engine_with(
        "engine1",
        &format!(
            "{schema}
             INSERT INTO usps_cityzip
             SELECT range, lpad(range::VARCHAR, 5, '0'), 'City ' || range, 'CA' FROM range(189);"
        ),
    );
    let engine2 = engine_with(
        "engine2",
        &format!(
            "{schema}
             INSERT INTO usps_cityzip
             SELECT range + 1000, lpad(range::VARCHAR, 5, '0'), 'Renamed ' || range, 'CA' FROM range(183);
             INSERT INTO usps_cityzip VALUES (9999, '00500', 'City 500', 'CA');"
        ),
    );
    (engine1, engine2)
}

type FakeTable = (Vec<ColumnInfo>, Vec<Row>);

/// Scriptable engine for capability and failure cases
pub struct FakeEngine {
    label: String,
    session_id: String,
    tables: RefCell<HashMap<String, FakeTable>>,
    reachable: Cell<bool>,
    temp_tables: bool,
    fail_inserts: bool,
    drop_on_describe: bool,
    pub created: RefCell<Vec<String>>,
    pub dropped: RefCell<Vec<String>>,
}

impl FakeEngine {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            session_id: format!("fake-{}", label),
            tables: RefCell::new(HashMap::new()),
            reachable: Cell::new(true),
            temp_tables: true,
            fail_inserts: false,
            drop_on_describe: false,
            created: RefCell::new(Vec::new()),
            dropped: RefCell::new(Vec::new()),
        }
    }

    pub fn with_table(self, name: &str, columns: &[(&str, &str)], rows: Vec<Row>) -> Self {
        let columns = columns
            .iter()
            .map(|(name, data_type)| ColumnInfo::new(*name, *data_type))
            .collect();
        self.tables.borrow_mut().insert(name.to_string(), (columns, rows));
        self
    }

    /// Every call fails with a connection error
    pub fn unreachable(self) -> Self {
        self.reachable.set(false);
        self
    }

    /// Answers pings, then loses the connection on the first describe
    pub fn dropping_connection(mut self) -> Self {
        self.drop_on_describe = true;
        self
    }

    pub fn without_temp_tables(mut self) -> Self {
        self.temp_tables = false;
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.borrow().contains_key(name)
    }

    fn check_reachable(&self) -> Result<()> {
        if self.reachable.get() {
            Ok(())
        } else {
            Err(RecorddiffError::connection(&self.label, "connection refused"))
        }
    }

    fn table(&self, table: &QualifiedName) -> Result<FakeTable> {
        self.tables
            .borrow()
            .get(&table.to_string())
            .cloned()
            .ok_or_else(|| RecorddiffError::table_not_found(table.to_string(), &self.label))
    }
}

impl Engine for FakeEngine {
    fn label(&self) -> &str {
        &self.label
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn ping(&self) -> Result<()> {
        self.check_reachable()
    }

    fn describe_table(&self, table: &QualifiedName) -> Result<Vec<ColumnInfo>> {
        self.check_reachable()?;
        if self.drop_on_describe {
            self.reachable.set(false);
            return Err(RecorddiffError::connection(&self.label, "server closed the connection"));
        }
        Ok(self.table(table)?.0)
    }

    fn count_rows(&self, table: &QualifiedName) -> Result<u64> {
        self.check_reachable()?;
        Ok(self.table(table)?.1.len() as u64)
    }

    fn scan_rows(
        &self,
        table: &QualifiedName,
        projection: &[ProjectedColumn],
        batch_size: usize,
        sink: &mut dyn FnMut(Vec<Row>) -> Result<()>,
    ) -> Result<u64> {
        self.check_reachable()?;
        let (_, rows) = self.table(table)?;

        let projected: Vec<Row> = rows
            .iter()
            .map(|row| {
                projection
                    .iter()
                    .map(|column| {
                        let value = row.get(&column.source).cloned().unwrap_or(Value::Null);
                        (column.alias.clone(), value)
                    })
                    .collect()
            })
            .collect();

        for batch in projected.chunks(batch_size.max(1)) {
            sink(batch.to_vec())?;
        }
        Ok(projected.len() as u64)
    }

    fn supports_temporary_tables(&self) -> bool {
        self.temp_tables
    }

    fn create_temporary_table(&self, name: &str, columns: &[ColumnInfo]) -> Result<QualifiedName> {
        self.check_reachable()?;
        if !self.temp_tables {
            return Err(RecorddiffError::unsupported_temporary_table(&self.label));
        }
        self.tables
            .borrow_mut()
            .insert(name.to_string(), (columns.to_vec(), Vec::new()));
        self.created.borrow_mut().push(name.to_string());
        Ok(QualifiedName::bare(name))
    }

    fn insert_rows(&self, table: &QualifiedName, columns: &[ColumnInfo], rows: &[Row]) -> Result<usize> {
        self.check_reachable()?;
        if self.fail_inserts {
            return Err(RecorddiffError::data_processing("insert rejected"));
        }

        let mut tables = self.tables.borrow_mut();
        let (_, stored) = tables
            .get_mut(&table.to_string())
            .ok_or_else(|| RecorddiffError::table_not_found(table.to_string(), &self.label))?;
        for row in rows {
            stored.push(
                columns
                    .iter()
                    .map(|column| {
                        let value = row.get(&column.name).cloned().unwrap_or(Value::Null);
                        (column.name.clone(), value)
                    })
                    .collect(),
            );
        }
        Ok(rows.len())
    }

    fn drop_table(&self, table: &QualifiedName) -> Result<()> {
        self.tables.borrow_mut().remove(&table.to_string());
        self.dropped.borrow_mut().push(table.to_string());
        Ok(())
    }
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    temp_dir: TempDir,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a DuckDB database file next to the config and seed it
    pub fn create_database(&self, name: &str, sql: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        let engine = DuckDbEngine::open(&path, name)?;
        engine.execute_batch(sql)?;
        Ok(path)
    }

    /// Write `run.toml` and return its path
    pub fn write_config(&self, contents: &str) -> Result<PathBuf> {
        let path = self.root().join("run.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Run a recorddiff command and return the result
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use recorddiff::cli::Cli;
        use recorddiff::commands::execute_command;

        let mut cmd_args = vec!["recorddiff"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| RecorddiffError::invalid_input(e.to_string()))?;
        execute_command(cli.command)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        self.run_command(args).expect("Command should succeed");
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> RecorddiffError {
        self.run_command(args).expect_err("Command should fail")
    }
}
