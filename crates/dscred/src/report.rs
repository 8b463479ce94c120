//! Run reports
//!
//! An [`ApplyReport`] holds one [`UpdateOutcome`] per snapshot row, in row
//! order, plus the counters a caller needs to decide the exit status. An
//! [`InventoryReport`] summarises phase one.

use crate::inventory::{Inventory, TenantFailure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final state of one snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    Skipped,
    Failed,
    /// Eligible, but not sent (dry run or interrupted run).
    Pending,
}

/// Why a row was skipped or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeReason {
    /// Both updated fields are empty.
    Ineligible,
    /// Only one of the updated fields is filled in.
    IncompleteUpdate,
    /// The row's tenant could not be scoped.
    ScopeUnavailable,
    /// The data source or connection no longer exists.
    NotFound,
    /// The server refused the update.
    Rejected,
    Network,
    /// The run was interrupted before the row was reached.
    Interrupted,
}

impl std::fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            OutcomeReason::Ineligible => "no update requested",
            OutcomeReason::IncompleteUpdate => "incomplete update",
            OutcomeReason::ScopeUnavailable => "scope unavailable",
            OutcomeReason::NotFound => "not found",
            OutcomeReason::Rejected => "rejected",
            OutcomeReason::Network => "network error",
            OutcomeReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Result for one snapshot row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Position in the snapshot (0-based, header excluded).
    pub index: usize,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub datasource_id: Uuid,
    pub datasource_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<Uuid>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<OutcomeReason>,
    /// New username, for applied and pending rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Masked new password, for applied and pending rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hint: Option<String>,
    /// Server or transport message for failed rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdateOutcome {
    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// Ordered outcomes of an apply run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub applied_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    pub outcomes: Vec<UpdateOutcome>,
    pub duration_ms: u64,
    pub dry_run: bool,
    /// The run stopped early on Ctrl+C.
    pub interrupted: bool,
}

impl ApplyReport {
    pub fn new(total: usize, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            total,
            applied_count: 0,
            skipped_count: 0,
            failed_count: 0,
            pending_count: 0,
            outcomes: Vec::with_capacity(total),
            duration_ms: 0,
            dry_run,
            interrupted: false,
        }
    }

    pub fn push(&mut self, outcome: UpdateOutcome) {
        match outcome.status {
            OutcomeStatus::Applied => self.applied_count += 1,
            OutcomeStatus::Skipped => self.skipped_count += 1,
            OutcomeStatus::Failed => self.failed_count += 1,
            OutcomeStatus::Pending => self.pending_count += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Append outcomes gathered elsewhere and restore snapshot order.
    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = UpdateOutcome>) {
        for outcome in outcomes {
            self.push(outcome);
        }
        self.outcomes.sort_by_key(|o| o.index);
    }

    pub fn set_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn set_duration(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count > 0
    }

    /// Nothing failed and the run was not cut short.
    pub fn is_clean(&self) -> bool {
        !self.has_failures() && !self.interrupted
    }

    pub fn outcome(&self, index: usize) -> Option<&UpdateOutcome> {
        self.outcomes.iter().find(|o| o.index == index)
    }

    pub fn failed(&self) -> impl Iterator<Item = &UpdateOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn applied(&self) -> impl Iterator<Item = &UpdateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Applied)
    }
}

/// Summary of an inventory run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryReport {
    pub started_at: DateTime<Utc>,
    pub tenant_count: usize,
    pub row_count: usize,
    pub datasource_count: usize,
    pub failed_tenants: Vec<TenantFailure>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl InventoryReport {
    pub fn from_inventory(inventory: &Inventory, started_at: DateTime<Utc>) -> Self {
        let mut datasources: Vec<(Uuid, Uuid)> = inventory
            .records
            .iter()
            .map(|r| (r.tenant_id, r.datasource_id))
            .collect();
        datasources.sort_unstable();
        datasources.dedup();

        Self {
            started_at,
            tenant_count: inventory.tenant_count,
            row_count: inventory.records.len(),
            datasource_count: datasources.len(),
            failed_tenants: inventory.failed_tenants.clone(),
            duration_ms: (Utc::now() - started_at).num_milliseconds().max(0) as u64,
            destination: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed_tenants.is_empty()
    }
}

/// Show only the first and last character of a secret.
///
/// Secrets of three characters or fewer are fully masked.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => String::new(),
        1..=3 => "*".repeat(chars.len()),
        n => format!("{}{}{}", chars[0], "*".repeat(n - 2), chars[n - 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, status: OutcomeStatus, reason: Option<OutcomeReason>) -> UpdateOutcome {
        UpdateOutcome {
            index,
            tenant_id: Uuid::from_u128(1),
            tenant_name: "Default".into(),
            datasource_id: Uuid::from_u128(100 + index as u128),
            datasource_name: format!("ds{index}"),
            connection_id: None,
            status,
            reason,
            username: None,
            password_hint: None,
            message: None,
        }
    }

    #[test]
    fn test_counts() {
        let mut report = ApplyReport::new(4, false);
        report.push(outcome(0, OutcomeStatus::Skipped, Some(OutcomeReason::Ineligible)));
        report.push(outcome(1, OutcomeStatus::Applied, None));
        report.push(outcome(2, OutcomeStatus::Failed, Some(OutcomeReason::NotFound)));
        report.push(outcome(3, OutcomeStatus::Pending, None));

        assert_eq!(report.applied_count, 1);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.pending_count, 1);
        assert!(report.has_failures());
        assert!(!report.is_clean());
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.applied().next().unwrap().index, 1);
    }

    #[test]
    fn test_extend_restores_row_order() {
        let mut report = ApplyReport::new(3, false);
        report.push(outcome(1, OutcomeStatus::Applied, None));
        report.extend(vec![
            outcome(2, OutcomeStatus::Applied, None),
            outcome(0, OutcomeStatus::Skipped, Some(OutcomeReason::Ineligible)),
        ]);
        let order: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(report.applied_count, 2);
    }

    #[test]
    fn test_interrupted_is_not_clean() {
        let mut report = ApplyReport::new(0, false);
        assert!(report.is_clean());
        report.set_interrupted();
        assert!(!report.is_clean());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(OutcomeReason::ScopeUnavailable.to_string(), "scope unavailable");
        assert_eq!(OutcomeReason::IncompleteUpdate.to_string(), "incomplete update");
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(outcome(
            0,
            OutcomeStatus::Failed,
            Some(OutcomeReason::ScopeUnavailable),
        ))
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "scope_unavailable");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("newpass1"), "n******1");
        assert_eq!(mask_secret("pässwörd"), "p******d");
    }
}
