//! Scalar values, rows and row sets

use crate::error::{RecorddiffError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::hash::{Hash, Hasher};

/// A single scalar read from an engine
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    /// Every integer width, signed or not
    Integer(i128),
    Float(f64),
    /// Decimal rendered at the column's declared scale
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Calendar interval, kept as its three components without normalizing
    Interval { months: i32, days: i32, nanos: i64 },
    Blob(Vec<u8>),
    /// Marker for values that are not safely comparable (lists, structs, geometry...)
    Unsupported(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Value::Unsupported(_))
    }

    /// `"<m> months <d> days <us> microseconds"`, which DuckDB casts back to INTERVAL
    pub fn interval_text(&self) -> Option<String> {
        match self {
            Value::Interval { months, days, nanos } => Some(format!(
                "{} months {} days {} microseconds",
                months,
                days,
                nanos / 1_000
            )),
            _ => None,
        }
    }

    /// Float bits with `-0.0` folded into `0.0` and a single NaN
    fn float_bits(f: f64) -> u64 {
        if f.is_nan() {
            f64::NAN.to_bits()
        } else if f == 0.0 {
            0.0f64.to_bits()
        } else {
            f.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => Self::float_bits(*a) == Self::float_bits(*b),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (
                Value::Interval { months, days, nanos },
                Value::Interval {
                    months: m,
                    days: d,
                    nanos: n,
                },
            ) => months == m && days == d && nanos == n,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::Unsupported(a), Value::Unsupported(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => Self::float_bits(*f).hash(state),
            Value::Decimal(s) | Value::Text(s) | Value::Unsupported(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Time(t) => t.hash(state),
            Value::Timestamp(ts) => ts.hash(state),
            Value::Interval { months, days, nanos } => (months, days, nanos).hash(state),
            Value::Blob(b) => b.hash(state),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => match i64::try_from(*i) {
                Ok(small) => serializer.serialize_i64(small),
                Err(_) => serializer.serialize_i128(*i),
            },
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Decimal(s) | Value::Text(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(d),
            Value::Time(t) => serializer.collect_str(t),
            Value::Timestamp(ts) => serializer.collect_str(ts),
            Value::Interval { .. } => serializer.collect_str(&self.interval_text().unwrap_or_default()),
            Value::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                serializer.serialize_str(&format!("\\x{}", hex))
            }
            Value::Unsupported(type_name) => {
                serializer.serialize_str(&format!("<unsupported: {}>", type_name))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i as i128)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i128)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered mapping from column name to value.
///
/// Rows have no identity beyond their content. Equality ignores field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First column holding an unsupported value, with the marker's type name
    pub fn first_unsupported(&self) -> Option<(&str, &str)> {
        self.0.iter().find_map(|(column, value)| match value {
            Value::Unsupported(type_name) => Some((column.as_str(), type_name.as_str())),
            _ => None,
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Multiset of rows sharing one column list
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowSet {
    /// Build a row set, checking that every row carries exactly `columns`
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        for (index, row) in rows.iter().enumerate() {
            let matches = row.len() == columns.len()
                && columns.iter().all(|column| row.contains_column(column));
            if !matches {
                return Err(RecorddiffError::data_processing(format!(
                    "Row {} has columns [{}], expected [{}]",
                    index,
                    row.columns().collect::<Vec<_>>().join(", "),
                    columns.join(", ")
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
