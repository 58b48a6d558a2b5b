//! Run configuration loaded from a TOML file

use crate::error::{RecorddiffError, Result};
use crate::ignore::IgnoreColumnsMap;
use crate::table_spec::TableEntry;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed for one comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub tables: Vec<TableEntry>,

    /// Columns dropped from every table
    #[serde(default)]
    pub ignore_all: Vec<String>,

    /// Columns dropped from specific tables
    #[serde(default)]
    pub ignore_cols: IgnoreColumnsMap,

    pub engine1: EngineConfig,
    pub engine2: EngineConfig,
}

/// How to open one DuckDB-backed engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name shown in reports
    pub label: Option<String>,

    /// DuckDB database file; in-memory when omitted
    pub database: Option<PathBuf>,

    /// External database to attach and use as the default catalog
    pub attach: Option<AttachConfig>,

    /// Whether staging tables may be created on this engine
    #[serde(default = "default_allow_staging")]
    pub allow_staging: bool,

    /// Statements run right after connecting
    #[serde(default)]
    pub init_sql: Vec<String>,
}

impl EngineConfig {
    fn resolve_database_path(&mut self, base: &Path) {
        if let Some(database) = &self.database {
            if database.is_relative() {
                self.database = Some(base.join(database));
            }
        }
    }
}

fn default_allow_staging() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            label: None,
            database: None,
            attach: None,
            allow_staging: true,
            init_sql: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachKind {
    Postgres,
    Mysql,
    Sqlite,
    Duckdb,
}

impl fmt::Display for AttachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Duckdb => "duckdb",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachConfig {
    pub kind: AttachKind,

    /// Connection string or file path; `{VAR}` placeholders come from the environment
    pub connection: String,

    #[serde(default = "default_attach_alias")]
    pub alias: String,

    #[serde(default)]
    pub read_only: bool,
}

fn default_attach_alias() -> String {
    "source".to_string()
}

impl AttachConfig {
    /// Build the `ATTACH` statement, substituting environment variables
    pub fn attach_statement(&self) -> Result<String> {
        let connection = substitute_env_vars(&self.connection)?;
        let mut options = Vec::new();
        if self.kind != AttachKind::Duckdb {
            options.push(format!("TYPE {}", self.kind));
        }
        if self.read_only {
            options.push("READ_ONLY".to_string());
        }

        let mut statement = format!(
            "ATTACH '{}' AS {}",
            connection.replace('\'', "''"),
            crate::table_spec::quote_ident(&self.alias)
        );
        if !options.is_empty() {
            statement.push_str(&format!(" ({})", options.join(", ")));
        }
        Ok(statement)
    }
}

impl RunConfig {
    /// Load a run configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RecorddiffError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            RecorddiffError::Toml(inner) => RecorddiffError::config(format!(
                "Invalid config file '{}': {}",
                path.display(),
                inner
            )),
            other => other,
        })?;

        // database files are relative to the config file
        if let Some(base) = path.parent() {
            config.engine1.resolve_database_path(base);
            config.engine2.resolve_database_path(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        log::debug!("Loaded configuration with {} table(s)", config.tables.len());
        Ok(config)
    }

    /// Whether both sides describe the same engine, so one session can serve both.
    ///
    /// Labels are not compared.
    pub fn engines_identical(&self) -> bool {
        EngineConfig {
            label: None,
            ..self.engine1.clone()
        } == EngineConfig {
            label: None,
            ..self.engine2.clone()
        }
    }
}

/// Substitute `{VAR_NAME}` placeholders from the environment
pub fn substitute_env_vars(connection_string: &str) -> Result<String> {
    let mut result = connection_string.to_string();

    let mut start = 0;
    while let Some(open_pos) = result[start..].find('{') {
        let open_pos = start + open_pos;
        if let Some(close_pos) = result[open_pos..].find('}') {
            let close_pos = open_pos + close_pos;
            let var_name = &result[open_pos + 1..close_pos];

            let var_value = env::var(var_name).map_err(|_| {
                RecorddiffError::config(format!(
                    "Environment variable '{}' referenced in a connection string is not set",
                    var_name
                ))
            })?;

            result.replace_range(open_pos..=close_pos, &var_value);
            start = open_pos + var_value.len();
        } else {
            start = open_pos + 1;
        }
    }

    Ok(result)
}
