//! Tenant (site) enumeration

use crate::client::RestClient;
use crate::error::Result;
use crate::models::Tenant;
use crate::session::{Session, SessionManager};
use futures::TryStreamExt;
use tracing::debug;

/// List every site reachable with `token`, across all pages.
pub(crate) async fn fetch_tenants(client: &RestClient, token: &str) -> Result<Vec<Tenant>> {
    let tenants: Vec<Tenant> = client.sites(token).try_collect().await?;
    debug!(count = tenants.len(), "Listed sites");
    Ok(tenants)
}

/// List the tenants visible to the session's identity.
///
/// An empty list is a valid answer: the identity simply has no sites.
pub async fn list_tenants(manager: &SessionManager, session: &Session) -> Result<Vec<Tenant>> {
    manager.list_tenants(session).await
}
