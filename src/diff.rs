//! Multiset difference between two row sets

use crate::error::{RecorddiffError, Result};
use crate::hash::{RowDigest, RowHasher};
use crate::value::{Row, RowSet};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Rows present on only one side, with each side's total
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub table_label: String,
    pub only_in_engine2: Vec<Row>,
    pub only_in_engine1: Vec<Row>,
    pub total_rows_engine1: u64,
    pub total_rows_engine2: u64,
}

impl DiffResult {
    /// Share of engine2's rows that newly appear, in percent
    pub fn percent_only_in_engine2(&self) -> f64 {
        percentage(self.only_in_engine2.len(), self.total_rows_engine2)
    }

    /// Share of engine1's rows that disappear, in percent
    pub fn percent_only_in_engine1(&self) -> f64 {
        percentage(self.only_in_engine1.len(), self.total_rows_engine1)
    }

    pub fn has_differences(&self) -> bool {
        !self.only_in_engine1.is_empty() || !self.only_in_engine2.is_empty()
    }
}

/// `count / total * 100`, or 0 for an empty table
pub fn percentage(count: usize, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Distinct rows with their multiplicities, bucketed by content hash
struct RowCounts<'a> {
    /// Distinct rows in first-seen order
    entries: Vec<(&'a Row, usize)>,
    /// Digest → indices into `entries`; more than one only on a hash collision
    buckets: HashMap<RowDigest, Vec<usize>>,
    digests: Vec<RowDigest>,
}

impl<'a> RowCounts<'a> {
    fn build(rows: &'a [Row], digests: Vec<RowDigest>) -> Self {
        let mut entries: Vec<(&'a Row, usize)> = Vec::new();
        let mut buckets: HashMap<RowDigest, Vec<usize>> = HashMap::new();
        let mut entry_digests = Vec::new();

        for (row, digest) in rows.iter().zip(digests) {
            let bucket = buckets.entry(digest).or_default();
            let existing = bucket.iter().copied().find(|&index| entries[index].0 == row);
            match existing {
                Some(index) => entries[index].1 += 1,
                None => {
                    bucket.push(entries.len());
                    entries.push((row, 1));
                    entry_digests.push(digest);
                }
            }
        }

        Self {
            entries,
            buckets,
            digests: entry_digests,
        }
    }

    fn count(&self, digest: &RowDigest, row: &Row) -> usize {
        self.buckets
            .get(digest)
            .and_then(|bucket| {
                bucket
                    .iter()
                    .find(|&&index| self.entries[index].0 == row)
                    .map(|&index| self.entries[index].1)
            })
            .unwrap_or(0)
    }

    /// Rows occurring more often here than in `other`, repeated by the excess
    fn excess_over(&self, other: &RowCounts<'_>) -> Vec<Row> {
        let mut excess = Vec::new();
        for ((row, count), digest) in self.entries.iter().zip(&self.digests) {
            let other_count = other.count(digest, row);
            for _ in other_count..*count {
                excess.push((*row).clone());
            }
        }
        excess
    }
}

/// Computes symmetric multiset differences
pub struct DiffEngine;

impl DiffEngine {
    /// Diff engine1's rows against engine2's.
    ///
    /// Both sets must carry the same columns; order may differ.
    pub fn compute(table_label: &str, engine1: &RowSet, engine2: &RowSet) -> Result<DiffResult> {
        let columns1: BTreeSet<&str> = engine1.columns().iter().map(String::as_str).collect();
        let columns2: BTreeSet<&str> = engine2.columns().iter().map(String::as_str).collect();
        if columns1 != columns2 {
            return Err(RecorddiffError::schema_mismatch(
                table_label,
                format!(
                    "column sets differ: only in engine1 [{}], only in engine2 [{}]",
                    columns1.difference(&columns2).cloned().collect::<Vec<_>>().join(", "),
                    columns2.difference(&columns1).cloned().collect::<Vec<_>>().join(", ")
                ),
            ));
        }

        // one column order for both sides
        let hasher = RowHasher::new(engine2.columns());
        let counts1 = RowCounts::build(engine1.rows(), hasher.hash_rows(engine1.rows()));
        let counts2 = RowCounts::build(engine2.rows(), hasher.hash_rows(engine2.rows()));

        let only_in_engine2 = counts2.excess_over(&counts1);
        let only_in_engine1 = counts1.excess_over(&counts2);

        log::debug!(
            "{}: {} distinct rows in engine1, {} in engine2",
            table_label,
            counts1.entries.len(),
            counts2.entries.len()
        );

        Ok(DiffResult {
            table_label: table_label.to_string(),
            only_in_engine2,
            only_in_engine1,
            total_rows_engine1: engine1.len() as u64,
            total_rows_engine2: engine2.len() as u64,
        })
    }
}
