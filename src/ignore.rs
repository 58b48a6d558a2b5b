//! Column exclusion planning

use crate::engine::{fold_name, ColumnInfo};
use crate::table_spec::TableReference;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Columns ignored for one table: a single name or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IgnoreColumns {
    One(String),
    Many(Vec<String>),
}

impl IgnoreColumns {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for IgnoreColumns {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<Vec<&str>> for IgnoreColumns {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for IgnoreColumns {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

/// Table name → columns ignored only for that table
pub type IgnoreColumnsMap = BTreeMap<String, IgnoreColumns>;

/// Ignore configuration for a whole run.
///
/// Column names are stored lower-cased; engines disagree on identifier case.
#[derive(Debug, Clone, Default)]
pub struct IgnorePlan {
    global_columns: BTreeSet<String>,
    per_table_columns: HashMap<String, BTreeSet<String>>,
}

impl IgnorePlan {
    pub fn new(ignore_all: &[String], ignore_cols: &IgnoreColumnsMap) -> Self {
        let mut plan = Self::default();
        for column in ignore_all {
            plan.global_columns.insert(fold_name(column));
        }
        for (table, columns) in ignore_cols {
            plan.add_table_columns(table, columns.names());
        }
        plan
    }

    pub fn add_table_columns<'a>(&mut self, table: &str, columns: impl IntoIterator<Item = &'a str>) {
        self.per_table_columns
            .entry(table.to_string())
            .or_default()
            .extend(columns.into_iter().map(fold_name));
    }

    /// Columns to exclude for a table, unioning matches on either side's name
    pub fn columns_for(&self, table: &TableReference) -> ExclusionSet {
        let mut columns = self.global_columns.clone();
        for name in table.lookup_names() {
            if let Some(table_columns) = self.per_table_columns.get(&name) {
                columns.extend(table_columns.iter().cloned());
            }
        }
        ExclusionSet(columns)
    }
}

/// Resolved set of excluded columns for one table comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(&fold_name(column))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Drop excluded columns. Names that don't exist are simply never matched.
    pub fn apply(&self, columns: &[ColumnInfo]) -> Vec<ColumnInfo> {
        columns
            .iter()
            .filter(|column| !self.contains(&column.name))
            .cloned()
            .collect()
    }

    /// Excluded names that actually appear in `columns`, in table order
    pub fn present_in(&self, columns: &[ColumnInfo]) -> Vec<String> {
        columns
            .iter()
            .filter(|column| self.contains(&column.name))
            .map(|column| column.name.clone())
            .collect()
    }
}
