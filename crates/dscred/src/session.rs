//! Authenticated sessions and tenant scoping
//!
//! The server evaluates every call in the context of one site. A [`Session`]
//! therefore carries a token together with the site it is scoped to, and the
//! [`SessionManager`] is the only thing that moves a session between sites.
//! Data calls go through [`Session::scoped_to`], which refuses to hand out a
//! token for a site other than the current one.

use crate::client::RestClient;
use crate::config::{ScopeMode, ServerConfig};
use crate::error::{Error, Result};
use crate::models::{SignedIn, Tenant};
use crate::tenants;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// An authenticated context scoped to at most one tenant.
pub struct Session {
    token: String,
    user_id: Option<Uuid>,
    scope: Option<Uuid>,
    tenants: Vec<Tenant>,
    index: HashMap<Uuid, usize>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("scope", &self.scope)
            .field("tenants", &self.tenants.len())
            .finish()
    }
}

impl Session {
    fn new(signed_in: SignedIn, tenants: Vec<Tenant>) -> Self {
        let index = tenants
            .iter()
            .enumerate()
            .map(|(i, tenant)| (tenant.id, i))
            .collect();
        Self {
            token: signed_in.token,
            user_id: signed_in.user_id,
            scope: Some(signed_in.site_id),
            tenants,
            index,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    /// Tenants visible to the identity, in server order.
    pub fn tenants(&self) -> &[Tenant] {
        &self.tenants
    }

    /// Handle for a tenant id, if the identity can see it.
    pub fn tenant(&self, tenant_id: Uuid) -> Option<&Tenant> {
        self.index.get(&tenant_id).map(|&i| &self.tenants[i])
    }

    /// The tenant the session is currently scoped to.
    pub fn current_tenant(&self) -> Option<&Tenant> {
        self.scope.and_then(|id| self.tenant(id))
    }

    /// Token for calls inside `tenant_id`; fails unless the session is scoped there.
    pub fn scoped_to(&self, tenant_id: Uuid) -> Result<&str> {
        match self.scope {
            Some(current) if current == tenant_id => Ok(&self.token),
            Some(current) => Err(Error::scope(
                tenant_id.to_string(),
                format!("session is scoped to {current}"),
            )),
            None => Err(Error::scope(
                tenant_id.to_string(),
                "session has no active tenant scope",
            )),
        }
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

/// Creates sessions and moves them between tenants.
#[derive(Debug, Clone)]
pub struct SessionManager {
    client: RestClient,
}

impl SessionManager {
    pub fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(config)?,
        })
    }

    pub fn from_client(client: RestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn config(&self) -> &ServerConfig {
        self.client.config()
    }

    /// Sign in and load the tenant handles for the identity.
    ///
    /// The session starts scoped to the configured initial site. Any failure
    /// here is an [`Error::Auth`].
    #[instrument(skip(self), fields(server = %self.config().server_url, user = %self.config().username))]
    pub async fn authenticate(&self) -> Result<Session> {
        let signed_in = self.client.sign_in(&self.config().site_content_url).await?;
        let tenants = tenants::fetch_tenants(&self.client, &signed_in.token)
            .await
            .map_err(|e| match e {
                Error::Auth(message) => Error::Auth(message),
                other => Error::Auth(format!("could not list sites after sign in: {other}")),
            })?;

        info!(tenants = tenants.len(), "Signed in");
        Ok(Session::new(signed_in, tenants))
    }

    /// Re-fetch the tenants visible to the session's identity.
    pub async fn list_tenants(&self, session: &Session) -> Result<Vec<Tenant>> {
        tenants::fetch_tenants(&self.client, session.token()).await
    }

    /// Point the session at another tenant.
    ///
    /// The previous scope is dropped before the switch is attempted, so a
    /// failed switch leaves the session unscoped rather than pointing at the
    /// old tenant.
    #[instrument(skip(self, session))]
    pub async fn scope_to_tenant(&self, session: &mut Session, tenant_id: Uuid) -> Result<()> {
        if session.scope == Some(tenant_id) {
            debug!("Session already scoped to tenant");
            return Ok(());
        }
        session.scope = None;

        let tenant = session.tenant(tenant_id).cloned().ok_or_else(|| {
            Error::scope(
                tenant_id.to_string(),
                "tenant is not visible to the signed-in identity",
            )
        })?;

        let signed_in = match self.config().scope_mode {
            ScopeMode::Switch => self
                .client
                .switch_site(&session.token, &tenant.content_url)
                .await
                .map_err(|e| Error::scope(&tenant.name, e.to_string()))?,
            ScopeMode::SignIn => {
                let signed_in = self
                    .client
                    .sign_in(&tenant.content_url)
                    .await
                    .map_err(|e| Error::scope(&tenant.name, e.to_string()))?;
                if let Err(e) = self.client.sign_out(&session.token).await {
                    debug!(error = %e, "Sign out of previous site token failed");
                }
                signed_in
            }
        };

        session.token = signed_in.token;
        if signed_in.site_id != tenant.id {
            return Err(Error::scope(
                &tenant.name,
                format!("server scoped the session to {} instead", signed_in.site_id),
            ));
        }
        session.scope = Some(tenant.id);
        debug!(tenant = %tenant.name, "Session scoped to tenant");
        Ok(())
    }

    /// End the session on the server. Failures are only logged.
    pub async fn sign_out(&self, session: Session) {
        match self.client.sign_out(&session.token).await {
            Ok(()) => debug!("Signed out"),
            Err(e) => warn!(error = %e, "Sign out failed"),
        }
    }
}
