//! Engine implementation backed by an embedded DuckDB connection

use crate::config::EngineConfig;
use crate::engine::{ColumnInfo, Engine, ProjectedColumn};
use crate::error::{RecorddiffError, Result};
use crate::table_spec::{quote_ident, QualifiedName};
use crate::value::{Row, Value};
use chrono::{DateTime, NaiveTime};
use duckdb::types::{TimeUnit, Value as DuckValue, ValueRef};
use duckdb::{params_from_iter, Connection};
use std::path::Path;

/// A DuckDB connection exposed through the `Engine` capability.
///
/// Through `ATTACH` the connection can front a PostgreSQL, MySQL or SQLite
/// database; temporary tables always live in DuckDB's own temp catalog.
pub struct DuckDbEngine {
    connection: Connection,
    label: String,
    session_id: String,
    allow_staging: bool,
}

impl DuckDbEngine {
    /// Open an in-memory database
    pub fn open_in_memory(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let connection = Connection::open_in_memory()
            .map_err(|e| RecorddiffError::connection(&label, e.to_string()))?;
        Self::with_connection(connection, label)
    }

    /// Open (or create) a database file
    pub fn open(path: &Path, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let connection = Connection::open(path).map_err(|e| {
            RecorddiffError::connection(&label, format!("{}: {}", path.display(), e))
        })?;
        Self::with_connection(connection, label)
    }

    /// Wrap an existing connection
    pub fn with_connection(connection: Connection, label: impl Into<String>) -> Result<Self> {
        connection.execute("SET enable_progress_bar=false", [])?;

        Ok(Self {
            connection,
            label: label.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            allow_staging: true,
        })
    }

    /// Open an engine from configuration, attaching the external database if any
    pub fn from_config(config: &EngineConfig, default_label: &str) -> Result<Self> {
        let label = config
            .label
            .clone()
            .unwrap_or_else(|| default_label.to_string());

        let mut engine = match &config.database {
            Some(path) => Self::open(path, label)?,
            None => Self::open_in_memory(label)?,
        };
        engine.allow_staging = config.allow_staging;

        if let Some(attach) = &config.attach {
            let statement = attach.attach_statement()?;
            log::debug!("{}: attaching {} database as {}", engine.label, attach.kind, attach.alias);
            engine
                .connection
                .execute_batch(&statement)
                .map_err(|e| RecorddiffError::connection(&engine.label, e.to_string()))?;
            engine
                .connection
                .execute_batch(&format!("USE {}", quote_ident(&attach.alias)))
                .map_err(|e| RecorddiffError::connection(&engine.label, e.to_string()))?;
        }

        for statement in &config.init_sql {
            log::debug!("{}: {}", engine.label, statement);
            engine.connection.execute_batch(statement)?;
        }

        Ok(engine)
    }

    /// Allow or forbid staging tables on this engine
    pub fn with_staging(mut self, allow: bool) -> Self {
        self.allow_staging = allow;
        self
    }

    /// Run arbitrary SQL, e.g. to seed fixtures
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection.execute_batch(sql)?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Convert DuckDB errors to the failure kinds the orchestrator understands
    fn convert_duckdb_error(&self, error: duckdb::Error, table: &QualifiedName) -> RecorddiffError {
        let error_msg = error.to_string();

        if error_msg.contains("does not exist") && error_msg.contains("Catalog Error") {
            RecorddiffError::table_not_found(table.to_string(), &self.label)
        } else if error_msg.contains("Connection Error")
            || error_msg.contains("could not connect")
            || error_msg.contains("Connection refused")
            || error_msg.contains("server closed the connection")
        {
            RecorddiffError::connection(&self.label, error_msg)
        } else {
            RecorddiffError::DuckDb(error)
        }
    }

    fn transaction<T>(&self, body: impl FnOnce() -> Result<T>) -> Result<T> {
        self.connection.execute_batch("BEGIN TRANSACTION")?;
        match body() {
            Ok(value) => {
                self.connection.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.connection.execute_batch("ROLLBACK") {
                    log::warn!("{}: rollback failed: {}", self.label, rollback_error);
                }
                Err(e)
            }
        }
    }
}

impl Engine for DuckDbEngine {
    fn label(&self) -> &str {
        &self.label
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn ping(&self) -> Result<()> {
        self.connection
            .query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
            .map(|_| ())
            .map_err(|e| RecorddiffError::connection(&self.label, e.to_string()))
    }

    fn describe_table(&self, table: &QualifiedName) -> Result<Vec<ColumnInfo>> {
        let sql = format!("DESCRIBE {}", table.sql_identifier());
        log::debug!("{}: {}", self.label, sql);

        let mut stmt = self
            .connection
            .prepare(&sql)
            .map_err(|e| self.convert_duckdb_error(e, table))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get::<_, String>(0)?,      // column_name
                    data_type: row.get::<_, String>(1)?, // column_type
                    nullable: row
                        .get::<_, Option<String>>(2)?
                        .map(|null| null.eq_ignore_ascii_case("YES"))
                        .unwrap_or(true),
                })
            })
            .map_err(|e| self.convert_duckdb_error(e, table))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(|e| self.convert_duckdb_error(e, table))?);
        }

        Ok(columns)
    }

    fn count_rows(&self, table: &QualifiedName) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.sql_identifier());
        let count: i64 = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| self.convert_duckdb_error(e, table))?;
        Ok(count.max(0) as u64)
    }

    fn scan_rows(
        &self,
        table: &QualifiedName,
        projection: &[ProjectedColumn],
        batch_size: usize,
        sink: &mut dyn FnMut(Vec<Row>) -> Result<()>,
    ) -> Result<u64> {
        if projection.is_empty() {
            return Err(RecorddiffError::invalid_input(format!(
                "No columns to read from {}",
                table
            )));
        }

        let select_list = projection
            .iter()
            .map(|column| {
                if column.source == column.alias {
                    quote_ident(&column.source)
                } else {
                    format!("{} AS {}", quote_ident(&column.source), quote_ident(&column.alias))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select_list, table.sql_identifier());
        log::debug!("{}: {}", self.label, sql);

        let mut stmt = self
            .connection
            .prepare(&sql)
            .map_err(|e| self.convert_duckdb_error(e, table))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| self.convert_duckdb_error(e, table))?;

        let batch_size = batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size.min(crate::DEFAULT_BATCH_SIZE));
        let mut total = 0u64;

        while let Some(row) = rows.next().map_err(|e| self.convert_duckdb_error(e, table))? {
            let mut record = Row::with_capacity(projection.len());
            for (index, column) in projection.iter().enumerate() {
                let value = value_from_ref(row.get_ref(index)?);
                record.insert(column.alias.clone(), value);
            }
            batch.push(record);
            total += 1;

            if batch.len() >= batch_size {
                sink(std::mem::take(&mut batch))?;
            }
        }

        if !batch.is_empty() {
            sink(batch)?;
        }

        Ok(total)
    }

    fn supports_temporary_tables(&self) -> bool {
        self.allow_staging
    }

    fn create_temporary_table(&self, name: &str, columns: &[ColumnInfo]) -> Result<QualifiedName> {
        if !self.allow_staging {
            return Err(RecorddiffError::unsupported_temporary_table(&self.label));
        }

        let column_defs = columns
            .iter()
            .map(|column| format!("{} {}", quote_ident(&column.name), column.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("CREATE TEMPORARY TABLE {} ({})", quote_ident(name), column_defs);
        log::debug!("{}: {}", self.label, sql);

        self.connection.execute_batch(&sql)?;
        Ok(QualifiedName::bare(name))
    }

    fn insert_rows(&self, table: &QualifiedName, columns: &[ColumnInfo], rows: &[Row]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let column_list = columns
            .iter()
            .map(|column| quote_ident(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = columns
            .iter()
            .map(|column| format!("CAST(? AS {})", column.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.sql_identifier(),
            column_list,
            placeholders
        );

        self.transaction(|| {
            let mut stmt = self.connection.prepare(&sql)?;
            for row in rows {
                let mut params = Vec::with_capacity(columns.len());
                for column in columns {
                    let value = row.get(&column.name).ok_or_else(|| {
                        RecorddiffError::data_processing(format!(
                            "Row for {} is missing column \"{}\"",
                            table, column.name
                        ))
                    })?;
                    params.push(to_duckdb_value(value, &column.data_type)?);
                }
                stmt.execute(params_from_iter(params))?;
            }
            Ok(rows.len())
        })
    }

    fn drop_table(&self, table: &QualifiedName) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {}", table.sql_identifier());
        log::debug!("{}: {}", self.label, sql);
        self.connection.execute_batch(&sql)?;
        Ok(())
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Convert a DuckDB cell into a comparable value
pub fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Boolean(b),
        ValueRef::TinyInt(i) => Value::Integer(i.into()),
        ValueRef::SmallInt(i) => Value::Integer(i.into()),
        ValueRef::Int(i) => Value::Integer(i.into()),
        ValueRef::BigInt(i) => Value::Integer(i.into()),
        ValueRef::HugeInt(i) => Value::Integer(i),
        ValueRef::UTinyInt(i) => Value::Integer(i.into()),
        ValueRef::USmallInt(i) => Value::Integer(i.into()),
        ValueRef::UInt(i) => Value::Integer(i.into()),
        ValueRef::UBigInt(i) => Value::Integer(i.into()),
        ValueRef::Float(f) => Value::Float(f.into()),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => Value::Decimal(d.to_string()),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        ValueRef::Date32(days) => DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| Value::Date(dt.date_naive()))
            .unwrap_or_else(|| Value::Unsupported("DATE out of range".to_string())),
        ValueRef::Time64(unit, t) => {
            let micros = to_micros(unit, t);
            let secs = micros.div_euclid(1_000_000);
            let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            u32::try_from(secs)
                .ok()
                .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos))
                .map(Value::Time)
                .unwrap_or_else(|| Value::Unsupported("TIME out of range".to_string()))
        }
        ValueRef::Timestamp(unit, ts) => {
            let micros = to_micros(unit, ts);
            let secs = micros.div_euclid(1_000_000);
            let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            DateTime::from_timestamp(secs, nanos)
                .map(|dt| Value::Timestamp(dt.naive_utc()))
                .unwrap_or_else(|| Value::Unsupported("TIMESTAMP out of range".to_string()))
        }
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => Value::Interval {
            months,
            days,
            nanos,
        },
        // enum labels compare as text
        ValueRef::Enum(..) => match DuckValue::from(value) {
            DuckValue::Enum(label) => Value::Text(label),
            _ => Value::Unsupported("ENUM".to_string()),
        },
        // lists, structs, maps, unions
        _ => Value::Unsupported("nested".to_string()),
    }
}

/// Convert a value into a parameter for `CAST(? AS data_type)`
fn to_duckdb_value(value: &Value, data_type: &str) -> Result<DuckValue> {
    let converted = match value {
        Value::Null => DuckValue::Null,
        Value::Boolean(b) => DuckValue::Boolean(*b),
        Value::Integer(i) => match i64::try_from(*i) {
            Ok(small) => DuckValue::BigInt(small),
            Err(_) => DuckValue::HugeInt(*i),
        },
        Value::Float(f) => DuckValue::Double(*f),
        Value::Decimal(s) | Value::Text(s) => DuckValue::Text(s.clone()),
        Value::Date(d) => DuckValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => DuckValue::Text(t.format("%H:%M:%S%.f").to_string()),
        Value::Timestamp(ts) => {
            let mut text = ts.format("%Y-%m-%d %H:%M:%S%.f").to_string();
            if data_type.to_uppercase().contains("TIME ZONE") {
                text.push_str("+00:00");
            }
            DuckValue::Text(text)
        }
        Value::Interval { .. } => DuckValue::Text(value.interval_text().unwrap_or_default()),
        Value::Blob(bytes) => DuckValue::Blob(bytes.clone()),
        Value::Unsupported(type_name) => {
            return Err(RecorddiffError::data_processing(format!(
                "Cannot stage a {} value as {}",
                type_name, data_type
            )))
        }
    };
    Ok(converted)
}
