//! Error types for recorddiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecorddiffError>;

#[derive(Error, Debug)]
pub enum RecorddiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid table spec '{spec}': {message}")]
    InvalidTableSpec { spec: String, message: String },

    #[error("Cannot connect to {engine}: {message}")]
    Connection { engine: String, message: String },

    #[error("Table \"{table}\" not found in {engine}")]
    TableNotFound { table: String, engine: String },

    #[error(
        "{engine} does not support session-scoped temporary tables, which are needed to stage \
         rows for comparison. Use a different engine2 or enable staging on it"
    )]
    UnsupportedTemporaryTable { engine: String },

    #[error("Cannot compare {table}: {message}")]
    ComparisonSchemaMismatch { table: String, message: String },

    #[error(
        "Column \"{column}\" of {table} holds {data_type} values, which cannot be compared. \
         Add it to ignore_all or ignore_cols"
    )]
    UnsupportedValue {
        table: String,
        column: String,
        data_type: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Data processing error: {message}")]
    DataProcessing { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl RecorddiffError {
    pub fn invalid_table_spec(spec: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidTableSpec {
            spec: spec.into(),
            message: msg.into(),
        }
    }

    pub fn connection(engine: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connection {
            engine: engine.into(),
            message: msg.into(),
        }
    }

    pub fn table_not_found(table: impl Into<String>, engine: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
            engine: engine.into(),
        }
    }

    pub fn unsupported_temporary_table(engine: impl Into<String>) -> Self {
        Self::UnsupportedTemporaryTable {
            engine: engine.into(),
        }
    }

    pub fn schema_mismatch(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ComparisonSchemaMismatch {
            table: table.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn data_processing(msg: impl Into<String>) -> Self {
        Self::DataProcessing {
            message: msg.into(),
        }
    }

    /// Stable snake_case name of the failure, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::DuckDb(_) => "engine",
            Self::Toml(_) => "config",
            Self::InvalidTableSpec { .. } => "invalid_table_spec",
            Self::Connection { .. } => "connection_error",
            Self::TableNotFound { .. } => "table_not_found",
            Self::UnsupportedTemporaryTable { .. } => "unsupported_temporary_table",
            Self::ComparisonSchemaMismatch { .. } => "comparison_schema_mismatch",
            Self::UnsupportedValue { .. } => "unsupported_value",
            Self::Config { .. } => "config",
            Self::InvalidInput { .. } => "invalid_input",
            Self::DataProcessing { .. } => "data_processing",
            Self::Generic(_) => "generic",
        }
    }

    /// Whether the error aborts the whole run rather than a single table
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Config { .. } | Self::Toml(_)
        )
    }
}
