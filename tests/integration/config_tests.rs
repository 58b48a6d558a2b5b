//! Integration tests for run configuration and engine setup

use crate::common::CliTestRunner;
use recorddiff::commands::OpenedEngines;
use recorddiff::config::RunConfig;
use recorddiff::engine::same_session;
use recorddiff::{DuckDbEngine, Engine, RecorddiffError};

#[test]
fn test_identical_engines_share_one_session() {
    let runner = CliTestRunner::new().unwrap();
    runner
        .create_database("gis.duckdb", "CREATE TABLE t (n INTEGER);")
        .unwrap();
    let config_path = runner
        .write_config(
            r#"
tables = ["t"]
[engine1]
label = "before"
database = "gis.duckdb"
[engine2]
label = "after"
database = "gis.duckdb"
"#,
        )
        .unwrap();

    let config = RunConfig::load(&config_path).unwrap();
    let engines = OpenedEngines::open(&config).unwrap();
    assert!(matches!(engines, OpenedEngines::Shared { .. }));

    engines
        .with_pair(|engine1, engine2| {
            assert_eq!(engine1.label(), "before");
            assert_eq!(engine2.label(), "after");
            assert!(same_session(engine1, engine2));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_different_engines_are_separate() {
    let runner = CliTestRunner::new().unwrap();
    runner.create_database("a.duckdb", "CREATE TABLE t (n INTEGER);").unwrap();
    runner.create_database("b.duckdb", "CREATE TABLE t (n INTEGER);").unwrap();
    let config_path = runner
        .write_config(
            r#"
[engine1]
database = "a.duckdb"
[engine2]
database = "b.duckdb"
"#,
        )
        .unwrap();

    let config = RunConfig::load(&config_path).unwrap();
    let engines = OpenedEngines::open(&config).unwrap();
    engines
        .with_pair(|engine1, engine2| {
            assert_eq!(engine1.label(), "engine1");
            assert_eq!(engine2.label(), "engine2");
            assert!(!same_session(engine1, engine2));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_attach_duckdb_file_as_default_catalog() {
    let runner = CliTestRunner::new().unwrap();
    let attached = runner
        .create_database("source.duckdb", "CREATE TABLE zips (zip VARCHAR); INSERT INTO zips VALUES ('90210');")
        .unwrap();

    let config = RunConfig::from_toml_str(&format!(
        r#"
[engine1]
[engine2]
label = "warehouse"
[engine2.attach]
kind = "duckdb"
connection = "{}"
alias = "src"
read_only = true
"#,
        attached.display()
    ))
    .unwrap();

    let engine = DuckDbEngine::from_config(&config.engine2, "engine2").unwrap();
    assert_eq!(engine.label(), "warehouse");
    let table = recorddiff::table_spec::QualifiedName::bare("zips");
    assert_eq!(engine.count_rows(&table).unwrap(), 1);
}

#[test]
fn test_unreachable_attach_is_a_connection_error() {
    let runner = CliTestRunner::new().unwrap();
    let missing_dir = runner.root().join("no_such_dir").join("x.duckdb");
    let config = RunConfig::from_toml_str(&format!(
        r#"
[engine1]
[engine2]
[engine2.attach]
kind = "duckdb"
connection = "{}"
read_only = true
"#,
        missing_dir.display()
    ))
    .unwrap();

    let result = DuckDbEngine::from_config(&config.engine2, "engine2");
    assert!(matches!(result, Err(RecorddiffError::Connection { .. })));
}

#[test]
fn test_init_sql_runs_after_connect() {
    let config = RunConfig::from_toml_str(
        r#"
[engine1]
init_sql = ["CREATE TABLE seeded AS SELECT 42 AS answer"]
[engine2]
"#,
    )
    .unwrap();

    let engine = DuckDbEngine::from_config(&config.engine1, "engine1").unwrap();
    let table = recorddiff::table_spec::QualifiedName::bare("seeded");
    assert_eq!(engine.count_rows(&table).unwrap(), 1);
}

#[test]
fn test_staging_flag_is_honoured() {
    let config = RunConfig::from_toml_str(
        r#"
[engine1]
[engine2]
allow_staging = false
"#,
    )
    .unwrap();

    let engine = DuckDbEngine::from_config(&config.engine2, "engine2").unwrap();
    assert!(!engine.supports_temporary_tables());
}
