//! Table display helpers for run reports

use super::status_label;
use dscred::{OutcomeStatus, TenantFailure, UpdateOutcome};

const STATUS_WIDTH: usize = 9;

/// Truncate a string for table display, handling Unicode safely.
///
/// If the string exceeds `max_len` characters, it is cut and "..." appended.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn status_name(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Applied => "applied",
        OutcomeStatus::Skipped => "skipped",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Pending => "pending",
    }
}

/// What to show after the status: the new identity, or why the row was not applied.
pub fn outcome_detail(outcome: &UpdateOutcome) -> String {
    let identity = match (&outcome.username, &outcome.password_hint) {
        (Some(user), Some(hint)) => Some(format!("{user} / {hint}")),
        _ => None,
    };
    match (outcome.reason, &outcome.message, identity) {
        (Some(reason), Some(message), _) if outcome.status == OutcomeStatus::Failed => {
            format!("{reason}: {message}")
        }
        (Some(reason), _, Some(identity)) => format!("{identity} ({reason})"),
        (Some(reason), _, None) => reason.to_string(),
        (None, _, Some(identity)) => identity,
        (None, _, None) => String::new(),
    }
}

/// One line per snapshot row (1-based, as counted in the CSV body).
pub fn print_outcome_table(outcomes: &[UpdateOutcome]) {
    println!(
        "{:<5} {:<20} {:<28} {:<9} DETAIL",
        "ROW", "SITE", "DATA SOURCE", "STATUS"
    );
    println!("{}", "-".repeat(100));

    for outcome in outcomes {
        let name = status_name(outcome.status);
        let padding = " ".repeat(STATUS_WIDTH.saturating_sub(name.len()));
        println!(
            "{:<5} {:<20} {:<28} {}{} {}",
            outcome.index + 1,
            truncate(&outcome.tenant_name, 20),
            truncate(&outcome.datasource_name, 28),
            status_label(outcome.status),
            padding,
            truncate(&outcome_detail(outcome), 80)
        );
    }
}

pub fn print_failed_tenants(failures: &[TenantFailure]) {
    println!("{:<38} {:<20} {:<8} MESSAGE", "SITE ID", "SITE", "STAGE");
    println!("{}", "-".repeat(100));
    for failure in failures {
        let stage = match failure.stage {
            dscred::FailureStage::Scope => "scope",
            dscred::FailureStage::Listing => "listing",
        };
        println!(
            "{:<38} {:<20} {:<8} {}",
            failure.tenant_id,
            truncate(&failure.tenant_name, 20),
            stage,
            truncate(&failure.message, 80)
        );
    }
}
