//! Human-readable and JSON output for run reports

pub mod table;

use crate::error::CliResult;
use dscred::{ApplyReport, InventoryReport, OutcomeStatus};
use serde::Serialize;
use std::path::Path;

/// Check if color output is enabled
fn use_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

/// Print a success message (green checkmark)
pub fn print_success(message: &str) {
    if use_color() {
        println!("\x1b[32m✓\x1b[0m {}", message);
    } else {
        println!("OK: {}", message);
    }
}

/// Print a warning message (yellow)
pub fn print_warning(message: &str) {
    if use_color() {
        eprintln!("\x1b[33mWarning:\x1b[0m {}", message);
    } else {
        eprintln!("Warning: {}", message);
    }
}

/// Status word, coloured by outcome.
pub fn status_label(status: OutcomeStatus) -> String {
    match status {
        OutcomeStatus::Applied => paint("32", "applied"),
        OutcomeStatus::Skipped => paint("90", "skipped"),
        OutcomeStatus::Failed => paint("31", "failed"),
        OutcomeStatus::Pending => paint("33", "pending"),
    }
}

/// Pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write a report as pretty JSON.
pub fn write_report<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn print_inventory_summary(report: &InventoryReport) {
    let destination = report.destination.as_deref().unwrap_or("snapshot");
    print_success(&format!(
        "Wrote {} row(s) for {} data source(s) across {} site(s) to {}",
        report.row_count, report.datasource_count, report.tenant_count, destination
    ));
    if !report.is_complete() {
        print_warning(&format!(
            "{} site(s) could not be listed and are missing from the snapshot:",
            report.failed_tenants.len()
        ));
        table::print_failed_tenants(&report.failed_tenants);
    }
}

pub fn print_apply_summary(report: &ApplyReport) {
    if report.dry_run {
        println!("Dry run: no changes were made.\n");
    }
    if !report.outcomes.is_empty() {
        table::print_outcome_table(&report.outcomes);
        println!();
    }

    let summary = format!(
        "{} applied, {} skipped, {} failed, {} pending ({} row(s), {} ms)",
        report.applied_count,
        report.skipped_count,
        report.failed_count,
        report.pending_count,
        report.total,
        report.duration_ms
    );
    if report.has_failures() {
        print_warning(&summary);
    } else {
        print_success(&summary);
    }
    if report.interrupted {
        print_warning("Interrupted: rows after the interruption were not sent.");
    }
    if report.dry_run && report.pending_count > 0 {
        println!("\nRun without --dry-run to apply the pending rows.");
    }
}
