//! Batch applier
//!
//! Applies the edited rows of a snapshot. Rows are grouped by tenant in
//! first-appearance order; each group is scoped once and its eligible rows
//! are updated one by one. A failing row never stops the run, and a group
//! whose tenant cannot be scoped fails as a whole without touching the rest.

use crate::error::Error;
use crate::models::Connection;
use crate::report::{mask_secret, ApplyReport, OutcomeReason, OutcomeStatus, UpdateOutcome};
use crate::session::{Session, SessionManager};
use crate::snapshot::{PendingUpdate, SnapshotRecord};
use futures::{StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Options for an apply run.
///
/// How many tenant groups run at once is part of the server configuration
/// ([`ServerConfig::tenant_concurrency`](crate::ServerConfig)).
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Classify rows without calling the server.
    pub dry_run: bool,
}

/// Rows of one tenant, with their snapshot positions.
#[derive(Debug)]
pub struct TenantGroup<'a> {
    pub tenant_id: Uuid,
    pub rows: Vec<(usize, &'a SnapshotRecord)>,
}

impl TenantGroup<'_> {
    fn has_eligible(&self) -> bool {
        self.rows.iter().any(|(_, record)| record.is_eligible())
    }
}

/// Group rows by tenant id. Groups and the rows inside them keep snapshot order.
pub fn group_by_tenant(records: &[SnapshotRecord]) -> Vec<TenantGroup<'_>> {
    let mut groups: Vec<TenantGroup<'_>> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match groups.iter_mut().find(|g| g.tenant_id == record.tenant_id) {
            Some(group) => group.rows.push((index, record)),
            None => groups.push(TenantGroup {
                tenant_id: record.tenant_id,
                rows: vec![(index, record)],
            }),
        }
    }
    groups
}

/// Applies snapshot rows to the server.
pub struct BatchApplier {
    manager: SessionManager,
    options: ApplyOptions,
    interrupted: Arc<AtomicBool>,
}

impl BatchApplier {
    pub fn new(manager: SessionManager, options: ApplyOptions) -> Self {
        Self {
            manager,
            options,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an interrupt flag, typically set from a Ctrl+C handler.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Tenant groups applied at once. Above 1 each group gets its own session.
    pub fn concurrency(&self) -> usize {
        self.manager.config().tenant_concurrency.max(1)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Report what a run would do, without any network call.
    ///
    /// Eligible rows come back as `pending`.
    pub fn preview(&self, records: &[SnapshotRecord]) -> ApplyReport {
        let start = Instant::now();
        let mut report = ApplyReport::new(records.len(), true);
        for (index, record) in records.iter().enumerate() {
            report.push(classify(index, record).unwrap_or_else(|| {
                outcome(index, record, OutcomeStatus::Pending, None, None)
            }));
        }
        report.set_duration(start.elapsed().as_millis() as u64);
        report
    }

    /// Apply every eligible row using one session, re-scoped per tenant group.
    #[instrument(skip_all, fields(rows = records.len()))]
    pub async fn apply_updates(
        &self,
        session: &mut Session,
        records: &[SnapshotRecord],
    ) -> ApplyReport {
        let start = Instant::now();
        let mut report = ApplyReport::new(records.len(), false);

        for group in group_by_tenant(records) {
            let outcomes = self.apply_group(session, &group).await;
            report.extend(outcomes);
        }

        self.finish(report, start)
    }

    /// Apply tenant groups concurrently, each with its own session.
    ///
    /// A group whose session cannot be established fails like a group whose
    /// scope is unavailable.
    #[instrument(skip_all, fields(rows = records.len(), concurrency = self.concurrency()))]
    pub async fn apply_updates_concurrently(&self, records: &[SnapshotRecord]) -> ApplyReport {
        let start = Instant::now();
        let mut report = ApplyReport::new(records.len(), false);
        let concurrency = self.concurrency();

        let mut results = futures::stream::iter(group_by_tenant(records))
            .map(|group| async move {
                if !group.has_eligible() {
                    return skip_group(&group);
                }
                if self.is_interrupted() {
                    return interrupt_group(&group);
                }
                let mut session = match self.manager.authenticate().await {
                    Ok(session) => session,
                    Err(e) => {
                        warn!(tenant_id = %group.tenant_id, error = %e, "Could not open session for tenant group");
                        return fail_group(&group, OutcomeReason::ScopeUnavailable, &e);
                    }
                };
                let outcomes = self.apply_group(&mut session, &group).await;
                self.manager.sign_out(session).await;
                outcomes
            })
            .buffer_unordered(concurrency);

        while let Some(outcomes) = results.next().await {
            report.extend(outcomes);
        }

        self.finish(report, start)
    }

    fn finish(&self, mut report: ApplyReport, start: Instant) -> ApplyReport {
        if self.is_interrupted() {
            report.set_interrupted();
        }
        report.set_duration(start.elapsed().as_millis() as u64);
        info!(
            applied = report.applied_count,
            skipped = report.skipped_count,
            failed = report.failed_count,
            pending = report.pending_count,
            interrupted = report.interrupted,
            "Apply finished"
        );
        report
    }

    async fn apply_group(&self, session: &mut Session, group: &TenantGroup<'_>) -> Vec<UpdateOutcome> {
        if !group.has_eligible() {
            debug!(tenant_id = %group.tenant_id, "No eligible rows for tenant");
            return skip_group(group);
        }
        if self.is_interrupted() {
            return interrupt_group(group);
        }

        if session.tenant(group.tenant_id).is_none() {
            let e = Error::NotFound(format!(
                "tenant {} is not visible to the signed-in identity",
                group.tenant_id
            ));
            warn!(tenant_id = %group.tenant_id, "Unknown tenant, failing group");
            return fail_group(group, OutcomeReason::NotFound, &e);
        }
        if let Err(e) = self.manager.scope_to_tenant(session, group.tenant_id).await {
            warn!(tenant_id = %group.tenant_id, error = %e, "Tenant scope unavailable, failing group");
            return fail_group(group, OutcomeReason::ScopeUnavailable, &e);
        }
        info!(tenant_id = %group.tenant_id, rows = group.rows.len(), "Applying tenant group");

        let mut outcomes = Vec::with_capacity(group.rows.len());
        for &(index, record) in &group.rows {
            if let Some(skipped) = classify(index, record) {
                outcomes.push(skipped);
                continue;
            }
            if self.is_interrupted() {
                outcomes.push(outcome(
                    index,
                    record,
                    OutcomeStatus::Pending,
                    Some(OutcomeReason::Interrupted),
                    None,
                ));
                continue;
            }

            match self.apply_row(session, record).await {
                Ok(updated) => {
                    debug!(
                        datasource = %record.datasource_name,
                        connections = updated,
                        "Updated data source credentials"
                    );
                    outcomes.push(outcome(index, record, OutcomeStatus::Applied, None, None));
                }
                Err(failure) => {
                    warn!(
                        datasource = %record.datasource_name,
                        datasource_id = %record.datasource_id,
                        error = %failure.error,
                        updated = failure.updated,
                        "Credential update failed"
                    );
                    outcomes.push(outcome(
                        index,
                        record,
                        OutcomeStatus::Failed,
                        Some(failure_reason(&failure.error)),
                        Some(failure.message()),
                    ));
                }
            }
        }
        outcomes
    }

    /// Update one row; returns the number of connections changed.
    ///
    /// Without a connection id every connection of the data source is tried,
    /// even after one of them fails.
    async fn apply_row(
        &self,
        session: &Session,
        record: &SnapshotRecord,
    ) -> std::result::Result<usize, RowFailure> {
        let token = session.scoped_to(record.tenant_id)?;
        let client = self.manager.client();
        let update = record
            .connection_update(self.manager.config().embed_credentials)
            .ok_or_else(|| Error::Format("row is not eligible for update".to_string()))?;

        if let Some(connection_id) = record.connection_id {
            client
                .update_connection(
                    token,
                    record.tenant_id,
                    record.datasource_id,
                    connection_id,
                    &update,
                )
                .await?;
            return Ok(1);
        }

        let connections: Vec<Connection> = client
            .connections(token, record.tenant_id, record.datasource_id)
            .try_collect()
            .await?;
        if connections.is_empty() {
            return Err(Error::NotFound(format!(
                "data source {} has no connections",
                record.datasource_name
            ))
            .into());
        }

        let mut updated = 0;
        let mut first_error = None;
        for connection in &connections {
            let result = client
                .update_connection(
                    token,
                    record.tenant_id,
                    record.datasource_id,
                    connection.id,
                    &update,
                )
                .await;
            match result {
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!(connection_id = %connection.id, error = %e, "Connection update failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            None => Ok(updated),
            Some(error) => Err(RowFailure {
                error,
                updated,
                attempted: connections.len(),
            }),
        }
    }
}

/// A failed row, which may still have changed some of its connections.
struct RowFailure {
    error: Error,
    updated: usize,
    attempted: usize,
}

impl RowFailure {
    fn message(&self) -> String {
        if self.updated == 0 {
            self.error.to_string()
        } else {
            format!(
                "updated {} of {} connections before failing: {}",
                self.updated, self.attempted, self.error
            )
        }
    }
}

impl From<Error> for RowFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            updated: 0,
            attempted: 1,
        }
    }
}

/// Outcome for a row that needs no network call, or `None` if it is eligible.
fn classify(index: usize, record: &SnapshotRecord) -> Option<UpdateOutcome> {
    match record.pending_update() {
        PendingUpdate::Unchanged => Some(outcome(
            index,
            record,
            OutcomeStatus::Skipped,
            Some(OutcomeReason::Ineligible),
            None,
        )),
        PendingUpdate::Incomplete => Some(outcome(
            index,
            record,
            OutcomeStatus::Skipped,
            Some(OutcomeReason::IncompleteUpdate),
            Some("both updated_username and updated_password are required".to_string()),
        )),
        PendingUpdate::Complete { .. } => None,
    }
}

fn failure_reason(error: &Error) -> OutcomeReason {
    match error {
        Error::NotFound(_) => OutcomeReason::NotFound,
        Error::Network(_) => OutcomeReason::Network,
        Error::Scope { .. } => OutcomeReason::ScopeUnavailable,
        _ => OutcomeReason::Rejected,
    }
}

fn skip_group(group: &TenantGroup<'_>) -> Vec<UpdateOutcome> {
    group
        .rows
        .iter()
        .filter_map(|&(index, record)| classify(index, record))
        .collect()
}

fn fail_group(
    group: &TenantGroup<'_>,
    reason: OutcomeReason,
    error: &Error,
) -> Vec<UpdateOutcome> {
    group
        .rows
        .iter()
        .map(|&(index, record)| {
            outcome(
                index,
                record,
                OutcomeStatus::Failed,
                Some(reason),
                Some(error.to_string()),
            )
        })
        .collect()
}

fn interrupt_group(group: &TenantGroup<'_>) -> Vec<UpdateOutcome> {
    group
        .rows
        .iter()
        .map(|&(index, record)| {
            classify(index, record).unwrap_or_else(|| {
                outcome(
                    index,
                    record,
                    OutcomeStatus::Pending,
                    Some(OutcomeReason::Interrupted),
                    None,
                )
            })
        })
        .collect()
}

fn outcome(
    index: usize,
    record: &SnapshotRecord,
    status: OutcomeStatus,
    reason: Option<OutcomeReason>,
    message: Option<String>,
) -> UpdateOutcome {
    let echo = matches!(status, OutcomeStatus::Applied | OutcomeStatus::Pending);
    UpdateOutcome {
        index,
        tenant_id: record.tenant_id,
        tenant_name: record.tenant_name.clone(),
        datasource_id: record.datasource_id,
        datasource_name: record.datasource_name.clone(),
        connection_id: record.connection_id,
        status,
        reason,
        username: echo.then(|| record.updated_username.clone()),
        password_hint: echo.then(|| mask_secret(&record.updated_password)),
        message,
    }
}
