//! HTTP client for the server's REST API
//!
//! Thin wrapper around `reqwest` that knows the endpoint layout, the auth
//! header, and how to turn error bodies into [`Error`] values. It holds no
//! session state; tokens are passed in by the caller.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::models::{
    Connection, ConnectionListResponse, ConnectionUpdate, DataSource, DataSourceListResponse,
    ErrorResponse, Page, PageRequest, Paged, SignInCredentials, SignInRequest, SignInResponse,
    SignedIn, SiteListResponse, SiteRef, SwitchSiteRequest, Tenant, UpdateConnectionRequest,
    UpdateConnectionResponse,
};
use crate::pagination::paginate;
use futures::Stream;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

/// Header carrying the session token.
pub const AUTH_HEADER: &str = "X-Tableau-Auth";

/// REST API client. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    config: Arc<ServerConfig>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .finish()
    }
}

impl RestClient {
    /// Create a client for a validated configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_root(), path)
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header(header::ACCEPT, "application/json")
            .header(AUTH_HEADER, token)
    }

    async fn send(&self, method: &str, url: &str, builder: RequestBuilder) -> Result<Response> {
        let started = Instant::now();
        debug!(method, url, "Sending REST request");
        let response = builder.send().await?;
        debug!(
            method,
            url,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received REST response"
        );
        Ok(response)
    }

    /// Pass successful responses through, convert the rest into errors.
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        trace!(status = status.as_u16(), body = %body, "Error response body");
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message())
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound(format!("{what}: {message}")),
            _ => Error::Api {
                status: status.as_u16(),
                message: format!("{what}: {message}"),
            },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Network(format!("invalid {what} response: {e}")))
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in to the site with the given content URL.
    ///
    /// Any failure, including an unreachable server, is an [`Error::Auth`].
    pub async fn sign_in(&self, site_content_url: &str) -> Result<SignedIn> {
        let url = self.url("auth/signin");
        let body = SignInRequest {
            credentials: SignInCredentials {
                name: &self.config.username,
                password: &self.config.password,
                site: SiteRef {
                    content_url: site_content_url,
                },
            },
        };
        let builder = self
            .http
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&body);

        let response = self
            .send("POST", &url, builder)
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        let response = Self::check(response, "sign in").await.map_err(|e| match e {
            Error::Api { status, message } => Error::Auth(format!("{message} (HTTP {status})")),
            other => Error::Auth(other.to_string()),
        })?;
        let signed_in: SignInResponse = Self::decode(response, "sign in")
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        Ok(signed_in.into())
    }

    /// Move an existing token to another site.
    pub async fn switch_site(&self, token: &str, site_content_url: &str) -> Result<SignedIn> {
        let url = self.url("auth/switchSite");
        let body = SwitchSiteRequest {
            site: SiteRef {
                content_url: site_content_url,
            },
        };
        let builder = self.authed(self.http.post(&url), token).json(&body);
        let response = self.send("POST", &url, builder).await?;
        let response = Self::check(response, "switch site").await?;
        let signed_in: SignInResponse = Self::decode(response, "switch site").await?;
        Ok(signed_in.into())
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        let url = self.url("auth/signout");
        let builder = self.authed(self.http.post(&url), token);
        let response = self.send("POST", &url, builder).await?;
        Self::check(response, "sign out").await?;
        Ok(())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    async fn get_page<E>(
        &self,
        url: String,
        token: &str,
        page: PageRequest,
        what: &str,
    ) -> Result<Page<E::Item>>
    where
        E: DeserializeOwned + Paged,
    {
        let builder = self.authed(self.http.get(&url), token).query(&[
            ("pageSize", page.size.to_string()),
            ("pageNumber", page.number.to_string()),
        ]);
        let response = self.send("GET", &url, builder).await?;
        let response = Self::check(response, what).await?;
        let body: E = Self::decode(response, what).await?;
        Ok(body.into_page())
    }

    /// Every site the token's identity can see.
    pub fn sites<'a>(&'a self, token: &'a str) -> impl Stream<Item = Result<Tenant>> + 'a {
        let url = self.url("sites");
        paginate(self.config.page_size, move |page| {
            self.get_page::<SiteListResponse>(url.clone(), token, page, "list sites")
        })
    }

    /// Every data source of a site. The token must be scoped to that site.
    pub fn datasources<'a>(
        &'a self,
        token: &'a str,
        site_id: Uuid,
    ) -> impl Stream<Item = Result<DataSource>> + 'a {
        let url = self.url(&format!("sites/{site_id}/datasources"));
        paginate(self.config.page_size, move |page| {
            self.get_page::<DataSourceListResponse>(url.clone(), token, page, "list data sources")
        })
    }

    /// Every connection of a data source.
    pub fn connections<'a>(
        &'a self,
        token: &'a str,
        site_id: Uuid,
        datasource_id: Uuid,
    ) -> impl Stream<Item = Result<Connection>> + 'a {
        let url = self.url(&format!(
            "sites/{site_id}/datasources/{datasource_id}/connections"
        ));
        paginate(self.config.page_size, move |page| {
            self.get_page::<ConnectionListResponse>(url.clone(), token, page, "list connections")
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replace the username and password stored on a connection.
    pub async fn update_connection(
        &self,
        token: &str,
        site_id: Uuid,
        datasource_id: Uuid,
        connection_id: Uuid,
        update: &ConnectionUpdate,
    ) -> Result<Connection> {
        let url = self.url(&format!(
            "sites/{site_id}/datasources/{datasource_id}/connections/{connection_id}"
        ));
        let builder = self
            .authed(self.http.put(&url), token)
            .json(&UpdateConnectionRequest::from(update));
        let response = self.send("PUT", &url, builder).await?;
        let response = Self::check(response, "update connection").await?;
        let body: UpdateConnectionResponse = Self::decode(response, "update connection").await?;

        body.connection.ok_or_else(|| Error::Api {
            status: 200,
            message: "update connection: response did not include the connection".to_string(),
        })
    }
}
