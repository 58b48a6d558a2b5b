//! The narrow capability interface the comparison core calls through

use crate::error::Result;
use crate::table_spec::QualifiedName;
use crate::value::{Row, RowSet};
use serde::{Deserialize, Serialize};

/// Column information as reported by an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }
}

/// Case-folded column name, the one rule used for case-insensitive matching
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// A column to read, renamed to `alias` in the produced rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub source: String,
    pub alias: String,
}

impl ProjectedColumn {
    pub fn renamed(source: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: alias.into(),
        }
    }

    /// Project every column under its own name
    pub fn identity(columns: &[ColumnInfo]) -> Vec<Self> {
        columns
            .iter()
            .map(|column| Self::renamed(&column.name, &column.name))
            .collect()
    }
}

/// A connected database engine.
///
/// Implementations are expected to be connected and authenticated already.
/// Connection failures must surface as `RecorddiffError::Connection`, missing
/// tables as `RecorddiffError::TableNotFound`.
pub trait Engine {
    /// Human-readable name used in reports (host, alias...)
    fn label(&self) -> &str;

    /// Identifies one session; two handles with the same id can see each other's tables
    fn session_id(&self) -> &str;

    /// Check the engine is reachable
    fn ping(&self) -> Result<()>;

    /// Columns of a table, in table order
    fn describe_table(&self, table: &QualifiedName) -> Result<Vec<ColumnInfo>>;

    fn count_rows(&self, table: &QualifiedName) -> Result<u64>;

    /// Read the projected columns of every row, handing them to `sink` in
    /// batches of at most `batch_size`. Returns the number of rows read.
    fn scan_rows(
        &self,
        table: &QualifiedName,
        projection: &[ProjectedColumn],
        batch_size: usize,
        sink: &mut dyn FnMut(Vec<Row>) -> Result<()>,
    ) -> Result<u64>;

    /// Whether this engine can host session-scoped temporary tables
    fn supports_temporary_tables(&self) -> bool;

    /// Create a session-scoped temporary table
    fn create_temporary_table(&self, name: &str, columns: &[ColumnInfo]) -> Result<QualifiedName>;

    /// Insert rows keyed by `columns` names. Returns the number inserted.
    fn insert_rows(&self, table: &QualifiedName, columns: &[ColumnInfo], rows: &[Row]) -> Result<usize>;

    fn drop_table(&self, table: &QualifiedName) -> Result<()>;
}

/// An engine reported under another name.
///
/// Lets one session serve as both engine1 and engine2 while the reports
/// still name two sides.
pub struct Relabeled<'a> {
    inner: &'a dyn Engine,
    label: String,
}

impl<'a> Relabeled<'a> {
    pub fn new(inner: &'a dyn Engine, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }
}

impl Engine for Relabeled<'_> {
    fn label(&self) -> &str {
        &self.label
    }

    fn session_id(&self) -> &str {
        self.inner.session_id()
    }

    fn ping(&self) -> Result<()> {
        self.inner.ping()
    }

    fn describe_table(&self, table: &QualifiedName) -> Result<Vec<ColumnInfo>> {
        self.inner.describe_table(table)
    }

    fn count_rows(&self, table: &QualifiedName) -> Result<u64> {
        self.inner.count_rows(table)
    }

    fn scan_rows(
        &self,
        table: &QualifiedName,
        projection: &[ProjectedColumn],
        batch_size: usize,
        sink: &mut dyn FnMut(Vec<Row>) -> Result<()>,
    ) -> Result<u64> {
        self.inner.scan_rows(table, projection, batch_size, sink)
    }

    fn supports_temporary_tables(&self) -> bool {
        self.inner.supports_temporary_tables()
    }

    fn create_temporary_table(&self, name: &str, columns: &[ColumnInfo]) -> Result<QualifiedName> {
        self.inner.create_temporary_table(name, columns)
    }

    fn insert_rows(&self, table: &QualifiedName, columns: &[ColumnInfo], rows: &[Row]) -> Result<usize> {
        self.inner.insert_rows(table, columns, rows)
    }

    fn drop_table(&self, table: &QualifiedName) -> Result<()> {
        self.inner.drop_table(table)
    }
}

/// Whether both handles share one session, so a table on one is visible from the other
pub fn same_session(a: &dyn Engine, b: &dyn Engine) -> bool {
    a.session_id() == b.session_id()
}

/// Read a whole projected table into a row set
pub fn read_row_set(
    engine: &dyn Engine,
    table: &QualifiedName,
    projection: &[ProjectedColumn],
    batch_size: usize,
) -> Result<RowSet> {
    let mut rows = Vec::new();
    engine.scan_rows(table, projection, batch_size, &mut |batch| {
        rows.extend(batch);
        Ok(())
    })?;

    let columns = projection.iter().map(|column| column.alias.clone()).collect();
    RowSet::new(columns, rows)
}
