//! Output formatting utilities

use crate::error::Result;
use crate::orchestrator::{RunReport, TableCheck, TableOutcome, TableReport};
use crate::timer::format_elapsed;
use crate::value::Row;
use std::fmt::Write;

/// Pretty printer for recorddiff output
pub struct PrettyPrinter {
    /// Rows listed per side; 0 lists all
    max_rows: usize,
}

impl PrettyPrinter {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// Render one table's block
    pub fn render_table_outcome(&self, outcome: &TableOutcome) -> Result<String> {
        match outcome {
            TableOutcome::Compared(report) => self.render_table_report(report),
            TableOutcome::Failed(failure) => Ok(format!(
                "❌ {}\n└─ {}: {}\n",
                failure.label, failure.kind, failure.message
            )),
        }
    }

    fn render_table_report(&self, report: &TableReport) -> Result<String> {
        let mut out = String::new();
        let mode = if report.staged { "staged" } else { "direct" };
        let marker = if report.diff.has_differences() { "🔍" } else { "✅" };
        writeln!(
            out,
            "{} {} ({} → {}, {})",
            marker, report.label, report.engine1_label, report.engine2_label, mode
        )
        .ok();

        if !report.excluded_columns.is_empty() {
            writeln!(out, "├─ Excluded columns: {}", report.excluded_columns.join(", ")).ok();
        }

        writeln!(out, "├─ {}", report.appear_line()).ok();
        self.render_rows(&mut out, &report.diff.only_in_engine2)?;
        writeln!(out, "├─ {}", report.disappear_line()).ok();
        self.render_rows(&mut out, &report.diff.only_in_engine1)?;
        writeln!(out, "└─ Time: {}", format_elapsed(report.elapsed)).ok();

        Ok(out)
    }

    fn render_rows(&self, out: &mut String, rows: &[Row]) -> Result<()> {
        let shown = if self.max_rows == 0 {
            rows.len()
        } else {
            rows.len().min(self.max_rows)
        };
        let omitted = rows.len() - shown;

        for (i, row) in rows.iter().take(shown).enumerate() {
            let prefix = if i == shown - 1 && omitted == 0 { "└─" } else { "├─" };
            writeln!(out, "│  {} {}", prefix, serde_json::to_string(row)?).ok();
        }
        if omitted > 0 {
            writeln!(out, "│  └─ ... and {} more", format_count(omitted as u64)).ok();
        }
        Ok(())
    }

    /// Closing summary for the whole run
    pub fn render_run_summary(report: &RunReport) -> String {
        let compared = report.compared().count();
        let failed = report.failed().count();

        let mut out = String::new();
        if failed > 0 {
            writeln!(
                out,
                "📊 Compared {} of {} tables, {} failed",
                compared,
                report.tables.len(),
                failed
            )
            .ok();
        } else {
            writeln!(out, "📊 Compared {} tables", compared).ok();
        }
        writeln!(out, "└─ Total time: {}", format_elapsed(report.elapsed)).ok();
        out
    }

    /// Render the whole run: every table block then the summary
    pub fn render_run(&self, report: &RunReport) -> Result<String> {
        let mut out = String::new();
        for outcome in &report.tables {
            out.push_str(&self.render_table_outcome(outcome)?);
            out.push('\n');
        }
        out.push_str(&Self::render_run_summary(report));
        Ok(out)
    }

    pub fn print_table_outcome(&self, outcome: &TableOutcome) -> Result<()> {
        println!("{}", self.render_table_outcome(outcome)?);
        Ok(())
    }

    pub fn print_run_summary(report: &RunReport) {
        print!("{}", Self::render_run_summary(report));
    }

    /// Render `check` results
    pub fn render_check_results(engine1: &str, engine2: &str, checks: &[TableCheck]) -> String {
        let mut out = String::new();
        writeln!(out, "🔌 {} and {} are reachable", engine1, engine2).ok();

        if checks.is_empty() {
            writeln!(out, "└─ No tables configured").ok();
            return out;
        }

        for (i, check) in checks.iter().enumerate() {
            let prefix = if i == checks.len() - 1 { "└─" } else { "├─" };
            match &check.error {
                Some(error) => writeln!(out, "{} ❌ {}: {}", prefix, check.label, error).ok(),
                None => writeln!(
                    out,
                    "{} ✅ {}: {} columns in {}, {} columns in {}",
                    prefix,
                    check.label,
                    check.engine1_columns.unwrap_or(0),
                    engine1,
                    check.engine2_columns.unwrap_or(0),
                    engine2
                )
                .ok(),
            };
        }
        out
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_run_report(report: &RunReport) -> Result<String> {
        Self::format(report)
    }

    pub fn format_check_results(engine1: &str, engine2: &str, checks: &[TableCheck]) -> Result<String> {
        let json = serde_json::json!({
            "engine1": engine1,
            "engine2": engine2,
            "tables": checks,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// Format a count with thousands separators
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a percentage with one decimal place
pub fn format_percentage(percent: f64) -> String {
    format!("{:.1}%", percent)
}
