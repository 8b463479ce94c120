//! Run entry points
//!
//! The two phases only share the snapshot file. Each entry point signs in,
//! does its work, and signs out again.

use crate::applier::{ApplyOptions, BatchApplier};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::inventory::{build_inventory, Inventory};
use crate::report::{ApplyReport, InventoryReport};
use crate::session::SessionManager;
use crate::snapshot;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, instrument};

/// Phase one: list every tenant's data sources and write the snapshot.
///
/// A partial inventory is still written; check
/// [`InventoryReport::is_complete`].
#[instrument(skip(config), fields(server = %config.server_url))]
pub async fn build_inventory_to_path(
    config: ServerConfig,
    destination: &Path,
) -> Result<(Inventory, InventoryReport)> {
    let started_at = Utc::now();
    let manager = SessionManager::new(config)?;
    let mut session = manager.authenticate().await?;

    let tenants = session.tenants().to_vec();
    let inventory = build_inventory(&manager, &mut session, &tenants).await;
    manager.sign_out(session).await;

    snapshot::write_path(&inventory.records, destination)?;
    info!(
        path = %destination.display(),
        rows = inventory.records.len(),
        "Snapshot written"
    );

    let mut report = InventoryReport::from_inventory(&inventory, started_at);
    report.destination = Some(destination.display().to_string());
    Ok((inventory, report))
}

/// Phase two: read an edited snapshot and apply its eligible rows.
///
/// The snapshot is read before signing in, so a malformed file fails without
/// any network traffic. A dry run never signs in.
pub async fn apply_updates_from_path(
    config: ServerConfig,
    source: &Path,
    options: ApplyOptions,
) -> Result<ApplyReport> {
    apply_updates_with_interrupt(config, source, options, Arc::new(AtomicBool::new(false))).await
}

/// [`apply_updates_from_path`] with an externally owned interrupt flag.
#[instrument(skip(config, options, interrupted), fields(server = %config.server_url, dry_run = options.dry_run))]
pub async fn apply_updates_with_interrupt(
    config: ServerConfig,
    source: &Path,
    options: ApplyOptions,
    interrupted: Arc<AtomicBool>,
) -> Result<ApplyReport> {
    let records = snapshot::read_path(source)?;
    info!(rows = records.len(), "Snapshot read");

    let manager = SessionManager::new(config)?;
    let applier = BatchApplier::new(manager.clone(), options).with_interrupt_flag(interrupted);

    if applier.options().dry_run {
        return Ok(applier.preview(&records));
    }

    // Authenticate up front so bad credentials abort before any tenant work.
    let mut session = manager.authenticate().await?;
    let report = if applier.concurrency() > 1 {
        manager.sign_out(session).await;
        applier.apply_updates_concurrently(&records).await
    } else {
        let report = applier.apply_updates(&mut session, &records).await;
        manager.sign_out(session).await;
        report
    };
    Ok(report)
}
