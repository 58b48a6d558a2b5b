//! Table spec resolution across the two engines

use crate::error::{RecorddiffError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// One entry of the caller's table list, as written in config or on the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableEntry {
    /// Same name on both engines
    Name(String),
    /// `[engine1_name, engine2_name]`; any other length is rejected on resolve
    Names(Vec<String>),
    /// Anything else found in a config file
    Other(serde_json::Value),
}

impl TableEntry {
    pub fn single(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn pair(engine1: impl Into<String>, engine2: impl Into<String>) -> Self {
        Self::Names(vec![engine1.into(), engine2.into()])
    }

    /// Parse the CLI form: `table` or `engine1_table:engine2_table`
    pub fn parse_cli(s: &str) -> Self {
        if s.contains(':') {
            Self::Names(s.split(':').map(str::to_string).collect())
        } else {
            Self::Name(s.to_string())
        }
    }

    /// Label used when the entry cannot be resolved
    pub fn display_label(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Names(names) => names.join(" → "),
            Self::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for TableEntry {
    fn from(s: &str) -> Self {
        Self::single(s)
    }
}

impl From<String> for TableEntry {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

impl From<(&str, &str)> for TableEntry {
    fn from((engine1, engine2): (&str, &str)) -> Self {
        Self::pair(engine1, engine2)
    }
}

/// A table name with an optional schema qualifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub table: String,
}

impl QualifiedName {
    /// Unqualified name
    pub fn bare(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    /// Parse `table` or `schema.table`
    pub fn parse(s: &str) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(?:(?P<schema>\w+)\.)?(?P<table>\w+)$").expect("valid table name pattern")
        });

        if s.is_empty() {
            return Err(RecorddiffError::invalid_table_spec(s, "table name is empty"));
        }
        if s.matches('.').count() > 1 {
            return Err(RecorddiffError::invalid_table_spec(
                s,
                "expected 'table' or 'schema.table', found more than one '.'",
            ));
        }

        let captures = pattern.captures(s).ok_or_else(|| {
            RecorddiffError::invalid_table_spec(
                s,
                "names may only contain letters, digits and underscores",
            )
        })?;

        Ok(Self {
            schema: captures.name("schema").map(|m| m.as_str().to_string()),
            table: captures["table"].to_string(),
        })
    }

    /// SQL identifier with each part double-quoted
    pub fn sql_identifier(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.table),
            None => write!(f, "{}", self.table),
        }
    }
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A resolved table pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    pub label: String,
    pub engine1: QualifiedName,
    pub engine2: QualifiedName,
    /// Names as written in the table list, engine1 side first
    pub spec_names: Vec<String>,
}

impl TableReference {
    /// Keys to try in `ignore_cols`: the names as written plus their bare forms
    pub fn lookup_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .spec_names
            .iter()
            .cloned()
            .chain([self.engine1.table.clone(), self.engine2.table.clone()]);
        for name in candidates {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Resolves table list entries into table references
pub struct TableResolver;

impl TableResolver {
    /// Resolve one entry
    pub fn resolve(entry: &TableEntry) -> Result<TableReference> {
        match entry {
            TableEntry::Name(name) => {
                let qualified = QualifiedName::parse(name)?;
                Ok(TableReference {
                    label: name.clone(),
                    engine1: qualified.clone(),
                    engine2: qualified,
                    spec_names: vec![name.clone()],
                })
            }
            TableEntry::Names(names) => {
                let [name1, name2] = names.as_slice() else {
                    return Err(RecorddiffError::invalid_table_spec(
                        entry.display_label(),
                        format!("expected a pair of table names, found {}", names.len()),
                    ));
                };
                Ok(TableReference {
                    label: format!("{} → {}", name1, name2),
                    engine1: QualifiedName::parse(name1)?,
                    engine2: QualifiedName::parse(name2)?,
                    spec_names: vec![name1.clone(), name2.clone()],
                })
            }
            TableEntry::Other(value) => Err(RecorddiffError::invalid_table_spec(
                value.to_string(),
                "must be a table name or a pair of table names",
            )),
        }
    }

    /// Resolve every entry, keeping input order and per-entry failures
    pub fn resolve_all(entries: &[TableEntry]) -> Vec<Result<TableReference>> {
        entries.iter().map(Self::resolve).collect()
    }
}
