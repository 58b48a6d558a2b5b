//! Integration tests for the compare and check commands

use crate::common::CliTestRunner;
use recorddiff::RecorddiffError;
use std::fs;

const ENGINE1_SQL: &str = "
    CREATE TABLE orders (id INTEGER, amount DECIMAL(10,2), updated_at TIMESTAMP);
    INSERT INTO orders VALUES
        (1, 10.00, TIMESTAMP '2024-01-01 00:00:00'),
        (2, 20.00, TIMESTAMP '2024-01-01 00:00:00'),
        (3, 30.00, TIMESTAMP '2024-01-01 00:00:00');
    CREATE TABLE customers (id INTEGER, name VARCHAR);
    INSERT INTO customers VALUES (1, 'Ada'), (2, 'Grace');
";

const ENGINE2_SQL: &str = "
    CREATE TABLE orders (id INTEGER, amount DECIMAL(10,2), updated_at TIMESTAMP);
    INSERT INTO orders VALUES
        (1, 10.00, TIMESTAMP '2024-02-01 00:00:00'),
        (2, 25.00, TIMESTAMP '2024-02-01 00:00:00'),
        (4, 40.00, TIMESTAMP '2024-02-01 00:00:00');
    CREATE TABLE customers (id INTEGER, name VARCHAR);
    INSERT INTO customers VALUES (1, 'Ada'), (2, 'Grace');
";

fn setup() -> CliTestRunner {
    let runner = CliTestRunner::new().unwrap();
    runner.create_database("legacy.duckdb", ENGINE1_SQL).unwrap();
    runner.create_database("warehouse.duckdb", ENGINE2_SQL).unwrap();
    runner
        .write_config(
            r#"
tables = ["orders", "customers"]

[ignore_cols]
orders = "updated_at"

[engine1]
label = "legacy"
database = "legacy.duckdb"

[engine2]
label = "warehouse"
database = "warehouse.duckdb"
"#,
        )
        .unwrap();
    runner
}

fn config_arg(runner: &CliTestRunner) -> String {
    runner.root().join("run.toml").display().to_string()
}

#[test]
fn test_compare_writes_json_report() {
    let runner = setup();
    let config = config_arg(&runner);
    let report_path = runner.root().join("report.json");
    let report = report_path.display().to_string();

    runner.expect_success(&[
        "compare", "--config", &config, "--format", "json", "--no-progress", "--output", &report,
    ]);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 2);

    let orders = &tables[0];
    assert_eq!(orders["status"], "compared");
    assert_eq!(orders["label"], "orders");
    assert_eq!(orders["staged"], true);
    assert_eq!(orders["excluded_columns"], serde_json::json!(["updated_at"]));
    assert_eq!(orders["diff"]["only_in_engine2"].as_array().unwrap().len(), 2);
    assert_eq!(orders["diff"]["only_in_engine1"].as_array().unwrap().len(), 2);
    assert_eq!(orders["diff"]["total_rows_engine1"], 3);
    assert!(orders["diff"]["only_in_engine2"][0].get("updated_at").is_none());

    let customers = &tables[1];
    assert_eq!(customers["status"], "compared");
    assert_eq!(customers["diff"]["only_in_engine2"].as_array().unwrap().len(), 0);
}

#[test]
fn test_compare_pretty_report_to_file() {
    let runner = setup();
    let config = config_arg(&runner);
    let report_path = runner.root().join("report.txt");
    let report = report_path.display().to_string();

    runner.expect_success(&["compare", "--config", &config, "--no-progress", "--output", &report]);

    let text = fs::read_to_string(&report_path).unwrap();
    assert!(text.contains("orders: 2 newly appear in warehouse (66.7% of 3 rows)"));
    assert!(text.contains("orders: 2 disappear from legacy (66.7% of 3 rows)"));
    assert!(text.contains("customers: 0 newly appear in warehouse (0.0% of 2 rows)"));
    assert!(text.contains("Total time:"));
}

#[test]
fn test_cli_tables_and_ignores_override_config() {
    let runner = setup();
    let config = config_arg(&runner);
    let report_path = runner.root().join("report.json");
    let report = report_path.display().to_string();

    runner.expect_success(&[
        "compare", "--config", &config, "orders", "--ignore", "orders=amount", "--format", "json",
        "--no-progress", "--output", &report,
    ]);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);

    // only id is left: 1, 2 on both sides, 3 vs 4
    let diff = &tables[0]["diff"];
    assert_eq!(diff["only_in_engine2"], serde_json::json!([{"id": 4}]));
    assert_eq!(diff["only_in_engine1"], serde_json::json!([{"id": 3}]));
}

#[test]
fn test_compare_prints_to_stdout() {
    let runner = setup();
    let config = config_arg(&runner);
    runner.expect_success(&["compare", "--config", &config, "--no-progress", "--max-rows", "1"]);
}

#[test]
fn test_missing_table_does_not_fail_the_command() {
    let runner = setup();
    let config = config_arg(&runner);
    let report_path = runner.root().join("report.json");
    let report = report_path.display().to_string();

    runner.expect_success(&[
        "compare", "--config", &config, "nope", "orders", "--format", "json", "--no-progress",
        "--output", &report,
    ]);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["tables"][0]["status"], "failed");
    assert_eq!(json["tables"][0]["kind"], "table_not_found");
    assert_eq!(json["tables"][1]["status"], "compared");
}

#[test]
fn test_fatal_errors_fail_the_command() {
    let runner = CliTestRunner::new().unwrap();

    let missing = runner.root().join("missing.toml").display().to_string();
    let error = runner.expect_failure(&["compare", "--config", &missing]);
    assert!(matches!(error, RecorddiffError::Config { .. }));

    let config = runner.write_config("tables = []\n[engine1]\n[engine2]\n").unwrap();
    let config = config.display().to_string();
    let error = runner.expect_failure(&["compare", "--config", &config]);
    assert!(matches!(error, RecorddiffError::InvalidInput { .. }));

    let error = runner.expect_failure(&["compare", "--config", &config, "t", "--format", "xml"]);
    assert!(matches!(error, RecorddiffError::InvalidInput { .. }));
}

#[test]
fn test_check_command() {
    let runner = setup();
    let config = config_arg(&runner);
    runner.expect_success(&["check", "--config", &config]);
    runner.expect_success(&["check", "--config", &config, "--format", "json"]);
}
