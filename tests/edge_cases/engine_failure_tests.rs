//! Engine capability and connection failures

use crate::common::{row, FakeEngine};
use recorddiff::value::Value;
use recorddiff::{RecordDiff, RecorddiffError};

const COLUMNS: &[(&str, &str)] = &[("id", "INTEGER"), ("name", "VARCHAR")];

fn people(engine: FakeEngine, ids: &[i64]) -> FakeEngine {
    let rows = ids
        .iter()
        .map(|id| row(&[("id", Value::from(*id)), ("name", Value::from(format!("p{}", id)))]))
        .collect();
    engine.with_table("people", COLUMNS, rows)
}

#[test]
fn test_unreachable_engine_aborts_before_any_table() {
    let engine1 = people(FakeEngine::new("engine1"), &[1]);
    let engine2 = people(FakeEngine::new("engine2"), &[1]).unreachable();

    let mut seen = 0;
    let result = RecordDiff::new(&engine1, &engine2)
        .tables(["people"])
        .run_with(|_| seen += 1);

    match result {
        Err(e @ RecorddiffError::Connection { .. }) => assert!(e.is_fatal()),
        other => panic!("expected connection error, got {:?}", other.map(|r| r.tables.len())),
    }
    assert_eq!(seen, 0);
}

#[test]
fn test_connection_lost_mid_run_aborts() {
    let engine1 = people(FakeEngine::new("engine1"), &[1]).dropping_connection();
    let engine2 = people(FakeEngine::new("engine2"), &[1]);

    let result = RecordDiff::new(&engine1, &engine2).tables(["people", "people"]).run();
    assert!(matches!(result, Err(RecorddiffError::Connection { .. })));
}

#[test]
fn test_engine2_without_temporary_tables() {
    let engine1 = people(FakeEngine::new("engine1"), &[1, 2]);
    let engine2 = people(FakeEngine::new("engine2"), &[1, 2]).without_temp_tables();

    let report = RecordDiff::new(&engine1, &engine2).tables(["people"]).run().unwrap();
    let failure = report.tables[0].failure().expect("table should fail");
    assert_eq!(failure.kind, "unsupported_temporary_table");
    assert!(failure.message.contains("different engine2"));
    assert!(engine2.created.borrow().is_empty());
}

#[test]
fn test_staging_table_dropped_when_inserts_fail() {
    let engine1 = people(FakeEngine::new("engine1"), &[1, 2, 3]);
    let engine2 = people(FakeEngine::new("engine2"), &[1]).failing_inserts();

    let report = RecordDiff::new(&engine1, &engine2).tables(["people"]).run().unwrap();
    assert_eq!(report.tables[0].failure().unwrap().kind, "data_processing");

    let created = engine2.created.borrow();
    assert_eq!(created.len(), 1);
    assert!(created[0].starts_with("recorddiff_people_"));
    assert_eq!(*engine2.dropped.borrow(), *created);
    assert!(!engine2.has_table(&created[0]));
}

#[test]
fn test_staged_comparison_through_fake_engines() {
    let engine1 = people(FakeEngine::new("engine1"), &[1, 2, 3]);
    let engine2 = people(FakeEngine::new("engine2"), &[2, 3, 4, 4]);

    let report = RecordDiff::new(&engine1, &engine2).tables(["people"]).run().unwrap();
    let table = report.tables[0].report().unwrap();

    assert!(table.staged);
    assert_eq!(table.diff.only_in_engine1.len(), 1);
    assert_eq!(table.diff.only_in_engine2.len(), 2);
    assert_eq!(table.appear_line(), "people: 2 newly appear in engine2 (50.0% of 4 rows)");
    assert_eq!(engine2.dropped.borrow().len(), 1);
}

#[test]
fn test_table_missing_on_one_side_names_that_engine() {
    let engine1 = people(FakeEngine::new("engine1"), &[1]);
    let engine2 = FakeEngine::new("engine2");

    let report = RecordDiff::new(&engine1, &engine2).tables(["people"]).run().unwrap();
    let failure = report.tables[0].failure().unwrap();
    assert_eq!(failure.kind, "table_not_found");
    assert!(failure.message.contains("engine2"));
}

#[test]
fn test_identical_tables_with_case_variant_columns() {
    let columns: &[(&str, &str)] = &[("ID", "INTEGER"), ("id", "INTEGER")];
    let rows = || vec![row(&[("ID", Value::from(1i64)), ("id", Value::from(2i64))])];
    let engine1 = FakeEngine::new("engine1").with_table("t", columns, rows());
    let engine2 = FakeEngine::new("engine2").with_table("t", columns, rows());

    let report = RecordDiff::new(&engine1, &engine2).tables(["t"]).run().unwrap();
    let table = report.tables[0]
        .report()
        .unwrap_or_else(|| panic!("t should be compared: {:?}", report.tables[0].failure()));
    assert!(!table.diff.has_differences());
}

#[test]
fn test_non_ascii_column_names_pair_case_insensitively() {
    let engine1 = FakeEngine::new("engine1").with_table(
        "t",
        &[("Äb", "INTEGER")],
        vec![row(&[("Äb", Value::from(7i64))])],
    );
    let engine2 = FakeEngine::new("engine2").with_table(
        "t",
        &[("äb", "INTEGER")],
        vec![row(&[("äb", Value::from(7i64))])],
    );

    let report = RecordDiff::new(&engine1, &engine2).tables(["t"]).run().unwrap();
    let table = report.tables[0]
        .report()
        .unwrap_or_else(|| panic!("t should be compared: {:?}", report.tables[0].failure()));
    assert!(!table.diff.has_differences());
}
