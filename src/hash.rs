//! Content hashing of rows

use crate::value::{Row, Value};
use blake3::Hasher;
use rayon::prelude::*;

/// Content hash of a row
pub type RowDigest = blake3::Hash;

/// Hashes rows over a fixed column order
pub struct RowHasher<'a> {
    columns: &'a [String],
}

impl<'a> RowHasher<'a> {
    pub fn new(columns: &'a [String]) -> Self {
        Self { columns }
    }

    /// Hash the row's values in column order.
    ///
    /// Columns the row lacks hash as a distinct "absent" marker, not as null.
    pub fn hash_row(&self, row: &Row) -> RowDigest {
        let mut hasher = Hasher::new();
        for column in self.columns {
            match row.get(column) {
                Some(value) => update_value(&mut hasher, value),
                None => {
                    hasher.update(&[0xff]);
                }
            }
        }
        hasher.finalize()
    }

    /// Hash all rows in parallel, preserving order
    pub fn hash_rows(&self, rows: &[Row]) -> Vec<RowDigest> {
        rows.par_iter().map(|row| self.hash_row(row)).collect()
    }
}

/// Length-prefix variable data so adjacent values cannot run together
fn update_bytes(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Feed a tagged, unambiguous encoding of a value
fn update_value(hasher: &mut Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(&[0]);
        }
        Value::Boolean(b) => {
            hasher.update(&[1, *b as u8]);
        }
        Value::Integer(i) => {
            hasher.update(&[2]);
            hasher.update(&i.to_le_bytes());
        }
        Value::Float(f) => {
            hasher.update(&[3]);
            // same folding as Value's equality: -0.0 == 0.0, one NaN
            let bits = if f.is_nan() {
                f64::NAN.to_bits()
            } else if *f == 0.0 {
                0.0f64.to_bits()
            } else {
                f.to_bits()
            };
            hasher.update(&bits.to_le_bytes());
        }
        Value::Decimal(s) => {
            hasher.update(&[4]);
            update_bytes(hasher, s.as_bytes());
        }
        Value::Text(s) => {
            hasher.update(&[5]);
            update_bytes(hasher, s.as_bytes());
        }
        Value::Date(d) => {
            hasher.update(&[6]);
            update_bytes(hasher, d.to_string().as_bytes());
        }
        Value::Time(t) => {
            hasher.update(&[7]);
            update_bytes(hasher, t.to_string().as_bytes());
        }
        Value::Timestamp(ts) => {
            hasher.update(&[8]);
            update_bytes(hasher, ts.to_string().as_bytes());
        }
        Value::Interval { months, days, nanos } => {
            hasher.update(&[11]);
            hasher.update(&months.to_le_bytes());
            hasher.update(&days.to_le_bytes());
            hasher.update(&nanos.to_le_bytes());
        }
        Value::Blob(bytes) => {
            hasher.update(&[9]);
            update_bytes(hasher, bytes);
        }
        Value::Unsupported(type_name) => {
            hasher.update(&[10]);
            update_bytes(hasher, type_name.as_bytes());
        }
    }
}
