//! Inventory builder
//!
//! Walks every tenant, lists its data sources and their connections, and
//! turns them into snapshot rows with the updated columns left empty. A
//! tenant that cannot be scoped or listed contributes no rows and is recorded
//! in [`Inventory::failed_tenants`] instead; the walk carries on.

use crate::error::{Error, Result};
use crate::models::{Connection, DataSource, Tenant};
use crate::session::{Session, SessionManager};
use crate::snapshot::SnapshotRecord;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Step at which a tenant dropped out of the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Scope,
    Listing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantFailure {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Snapshot rows plus the manifest of tenants that could not be listed.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub records: Vec<SnapshotRecord>,
    pub failed_tenants: Vec<TenantFailure>,
    /// Tenants attempted, including failed ones.
    pub tenant_count: usize,
}

impl Inventory {
    /// True when every tenant was listed.
    pub fn is_complete(&self) -> bool {
        self.failed_tenants.is_empty()
    }
}

/// List data sources and connections for every tenant, in tenant order.
#[instrument(skip_all, fields(tenants = tenants.len()))]
pub async fn build_inventory(
    manager: &SessionManager,
    session: &mut Session,
    tenants: &[Tenant],
) -> Inventory {
    let mut inventory = Inventory {
        tenant_count: tenants.len(),
        ..Default::default()
    };

    for tenant in tenants {
        if let Err(e) = manager.scope_to_tenant(session, tenant.id).await {
            warn!(tenant = %tenant.name, error = %e, "Skipping tenant: scope failed");
            inventory.failed_tenants.push(TenantFailure {
                tenant_id: tenant.id,
                tenant_name: tenant.name.clone(),
                stage: FailureStage::Scope,
                message: e.to_string(),
            });
            continue;
        }

        match list_tenant(manager, session, tenant).await {
            Ok(rows) => {
                info!(tenant = %tenant.name, rows = rows.len(), "Listed tenant");
                inventory.records.extend(rows);
            }
            Err(e) => {
                warn!(tenant = %tenant.name, error = %e, "Skipping tenant: listing failed");
                inventory.failed_tenants.push(TenantFailure {
                    tenant_id: tenant.id,
                    tenant_name: tenant.name.clone(),
                    stage: FailureStage::Listing,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        rows = inventory.records.len(),
        failed_tenants = inventory.failed_tenants.len(),
        "Inventory built"
    );
    inventory
}

/// Rows for one tenant. Any error discards the whole tenant.
async fn list_tenant(
    manager: &SessionManager,
    session: &Session,
    tenant: &Tenant,
) -> Result<Vec<SnapshotRecord>> {
    let token = session.scoped_to(tenant.id)?;
    let client = manager.client();

    let datasources: Vec<DataSource> = client.datasources(token, tenant.id).try_collect().await?;
    debug!(tenant = %tenant.name, count = datasources.len(), "Listed data sources");

    let mut rows = Vec::with_capacity(datasources.len());
    for datasource in &datasources {
        let connections: Vec<Connection> = client
            .connections(token, tenant.id, datasource.id)
            .try_collect()
            .await
            .map_err(|e| match e {
                Error::NotFound(message) => Error::NotFound(format!(
                    "data source {} disappeared while listing: {message}",
                    datasource.name
                )),
                other => other,
            })?;

        if connections.is_empty() {
            rows.push(SnapshotRecord::from_listing(tenant, datasource, None));
        } else {
            rows.extend(
                connections
                    .iter()
                    .map(|c| SnapshotRecord::from_listing(tenant, datasource, Some(c))),
            );
        }
    }
    Ok(rows)
}
