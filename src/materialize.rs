//! Produce comparable row sets for a table pair

use crate::engine::{fold_name, read_row_set, same_session, ColumnInfo, Engine, ProjectedColumn};
use crate::error::{RecorddiffError, Result};
use crate::ignore::ExclusionSet;
use crate::progress::TransferProgress;
use crate::table_spec::{QualifiedName, TableReference};
use crate::value::{Row, RowSet};

/// Both sides of one table comparison, in engine2's column names and order
#[derive(Debug)]
pub struct MaterializedPair {
    pub engine1: RowSet,
    pub engine2: RowSet,
    /// Whether engine1's rows went through a staging table on engine2
    pub staged: bool,
    /// Excluded columns that were actually present on either side
    pub excluded: Vec<String>,
}

/// Temporary table on engine2, dropped when the guard goes out of scope
pub struct StagedTable<'a> {
    engine: &'a dyn Engine,
    name: QualifiedName,
}

impl<'a> StagedTable<'a> {
    pub fn create(engine: &'a dyn Engine, name: &str, columns: &[ColumnInfo]) -> Result<Self> {
        let name = engine.create_temporary_table(name, columns)?;
        log::debug!("{}: created staging table {}", engine.label(), name);
        Ok(Self { engine, name })
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }
}

impl Drop for StagedTable<'_> {
    fn drop(&mut self) {
        match self.engine.drop_table(&self.name) {
            Ok(()) => log::debug!("{}: dropped staging table {}", self.engine.label(), self.name),
            Err(e) => log::warn!(
                "{}: failed to drop staging table {}: {}",
                self.engine.label(),
                self.name,
                e
            ),
        }
    }
}

/// `recorddiff_<table>_<8 hex>`
pub fn staging_table_name(table: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("recorddiff_{}_{}", table.to_lowercase(), &suffix[..8])
}

/// Reads both sides of a table pair, staging engine1's rows when needed
pub struct RowMaterializer<'a> {
    engine1: &'a dyn Engine,
    engine2: &'a dyn Engine,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> RowMaterializer<'a> {
    pub fn new(engine1: &'a dyn Engine, engine2: &'a dyn Engine) -> Self {
        Self {
            engine1,
            engine2,
            batch_size: crate::DEFAULT_BATCH_SIZE,
            show_progress: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Whether both sides can be read without staging
    pub fn is_direct(&self) -> bool {
        same_session(self.engine1, self.engine2)
    }

    pub fn materialize(&self, table: &TableReference, exclusions: &ExclusionSet) -> Result<MaterializedPair> {
        let columns1 = self.engine1.describe_table(&table.engine1)?;
        let columns2 = self.engine2.describe_table(&table.engine2)?;

        let mut excluded = exclusions.present_in(&columns2);
        for name in exclusions.present_in(&columns1) {
            if !excluded.iter().any(|seen| fold_name(seen) == fold_name(&name)) {
                excluded.push(name);
            }
        }

        let kept1 = exclusions.apply(&columns1);
        let kept2 = exclusions.apply(&columns2);
        let projection1 = reconcile_columns(&table.label, &kept1, &kept2)?;
        let projection2 = ProjectedColumn::identity(&kept2);

        // engine1's declared types under engine2's names
        let declared1: Vec<ColumnInfo> = projection1
            .iter()
            .filter_map(|column| {
                kept1
                    .iter()
                    .find(|info| info.name == column.source)
                    .map(|info| ColumnInfo {
                        name: column.alias.clone(),
                        ..info.clone()
                    })
            })
            .collect();

        let (rows1, rows2, staged) = if self.is_direct() {
            log::debug!("{}: direct mode on {}", table.label, self.engine2.label());
            let rows1 = read_row_set(self.engine1, &table.engine1, &projection1, self.batch_size)?;
            ensure_comparable(&table.engine1, rows1.rows(), &declared1)?;
            let rows2 = read_row_set(self.engine2, &table.engine2, &projection2, self.batch_size)?;
            (rows1, rows2, false)
        } else {
            let (rows1, rows2) = self.read_staged(table, &projection1, &declared1, &kept2, &projection2)?;
            (rows1, rows2, true)
        };
        ensure_comparable(&table.engine2, rows2.rows(), &kept2)?;

        Ok(MaterializedPair {
            engine1: rows1,
            engine2: rows2,
            staged,
            excluded,
        })
    }

    fn read_staged(
        &self,
        table: &TableReference,
        projection1: &[ProjectedColumn],
        declared1: &[ColumnInfo],
        kept2: &[ColumnInfo],
        projection2: &[ProjectedColumn],
    ) -> Result<(RowSet, RowSet)> {
        if !self.engine2.supports_temporary_tables() {
            return Err(RecorddiffError::unsupported_temporary_table(self.engine2.label()));
        }

        let staging = StagedTable::create(
            self.engine2,
            &staging_table_name(&table.engine2.table),
            kept2,
        )?;

        let mut progress = if self.show_progress {
            let total = self.engine1.count_rows(&table.engine1)?;
            TransferProgress::new(total, &format!("Staging {}", table.engine1))
        } else {
            TransferProgress::hidden()
        };

        self.engine1.scan_rows(&table.engine1, projection1, self.batch_size, &mut |batch| {
            ensure_comparable(&table.engine1, &batch, declared1)?;
            let inserted = self.engine2.insert_rows(staging.name(), kept2, &batch)?;
            log::debug!("{}: staged {} rows into {}", table.label, inserted, staging.name());
            progress.inc(inserted as u64);
            Ok(())
        })?;
        progress.finish(&format!("Staged {} rows", progress.transferred()));

        let rows1 = read_row_set(self.engine2, staging.name(), projection2, self.batch_size)?;
        let rows2 = read_row_set(self.engine2, &table.engine2, projection2, self.batch_size)?;
        Ok((rows1, rows2))
    }
}

/// Pair engine1's remaining columns with engine2's.
///
/// Exact names pair first, then the rest by case-folded name. A folded name
/// shared by several unpaired columns on one side is ambiguous and fails.
/// Returns engine1's projection in engine2's order, aliased to engine2's names.
fn reconcile_columns(
    label: &str,
    kept1: &[ColumnInfo],
    kept2: &[ColumnInfo],
) -> Result<Vec<ProjectedColumn>> {
    let exact_in = |columns: &[ColumnInfo], name: &str| columns.iter().any(|c| c.name == name);

    let mut unpaired1: Vec<&ColumnInfo> = kept1
        .iter()
        .filter(|column| !exact_in(kept2, &column.name))
        .collect();
    let unpaired2: Vec<&ColumnInfo> = kept2
        .iter()
        .filter(|column| !exact_in(kept1, &column.name))
        .collect();

    let mut ambiguous = Vec::new();
    for (side, unpaired) in [("engine1", &unpaired1), ("engine2", &unpaired2)] {
        for (i, column) in unpaired.iter().enumerate() {
            let folded = fold_name(&column.name);
            let clash = unpaired
                .iter()
                .skip(i + 1)
                .find(|other| fold_name(&other.name) == folded);
            if let Some(other) = clash {
                ambiguous.push(format!("{} has both \"{}\" and \"{}\"", side, column.name, other.name));
            }
        }
    }
    if !ambiguous.is_empty() {
        return Err(RecorddiffError::schema_mismatch(
            label,
            format!(
                "column names differ only by case and cannot be paired: {}",
                ambiguous.join("; ")
            ),
        ));
    }

    let mut projection = Vec::with_capacity(kept2.len());
    let mut only_in_engine2 = Vec::new();
    for column in kept2 {
        if exact_in(kept1, &column.name) {
            projection.push(ProjectedColumn::renamed(&column.name, &column.name));
            continue;
        }
        let folded = fold_name(&column.name);
        match unpaired1.iter().position(|source| fold_name(&source.name) == folded) {
            Some(index) => {
                let source = unpaired1.remove(index);
                projection.push(ProjectedColumn::renamed(&source.name, &column.name));
            }
            None => only_in_engine2.push(column.name.clone()),
        }
    }

    let only_in_engine1: Vec<String> = unpaired1.iter().map(|column| column.name.clone()).collect();

    if !only_in_engine1.is_empty() || !only_in_engine2.is_empty() {
        return Err(RecorddiffError::schema_mismatch(
            label,
            format!(
                "column sets differ after exclusions: only in engine1 [{}], only in engine2 [{}]",
                only_in_engine1.join(", "),
                only_in_engine2.join(", ")
            ),
        ));
    }
    if projection.is_empty() {
        return Err(RecorddiffError::schema_mismatch(
            label,
            "no columns left to compare after exclusions",
        ));
    }

    Ok(projection)
}

/// Fail on the first value that cannot take part in equality
fn ensure_comparable(table: &QualifiedName, rows: &[Row], columns: &[ColumnInfo]) -> Result<()> {
    for row in rows {
        if let Some((column, _)) = row.first_unsupported() {
            let data_type = columns
                .iter()
                .find(|info| info.name == column)
                .map(|info| info.data_type.clone())
                .unwrap_or_else(|| "unsupported".to_string());
            return Err(RecorddiffError::UnsupportedValue {
                table: table.to_string(),
                column: column.to_string(),
                data_type,
            });
        }
    }
    Ok(())
}
