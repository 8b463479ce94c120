//! Server object models and REST API wire types
//!
//! Domain types (`Tenant`, `DataSource`, `Connection`) are what the rest of
//! the crate works with. The `*Response` / `*Request` types mirror the JSON
//! bodies of the REST API and are converted at the client boundary.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A site on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// Site slug used by sign in and site switch; empty for the default site.
    #[serde(default)]
    pub content_url: String,
}

/// A published data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub content_url: Option<String>,
}

/// One connection of a data source, with its embedded username if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    #[serde(rename = "type", default)]
    pub connection_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub server_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub server_port: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_name: Option<String>,
}

/// Username/password replacement for a connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub username: String,
    pub password: String,
    pub embed: bool,
}

impl std::fmt::Debug for ConnectionUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionUpdate")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("embed", &self.embed)
            .finish()
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Position of a page request (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn first(size: u32) -> Self {
        Self { number: 1, size }
    }

    pub fn next(self) -> Self {
        Self {
            number: self.number + 1,
            size: self.size,
        }
    }
}

/// One page of results plus what the server said about the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_available: Option<u64>,
    /// Set when the response was not paginated at all.
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_available: Option<u64>) -> Self {
        Self {
            items,
            total_available,
            last: false,
        }
    }

    /// A complete, unpaginated listing.
    pub fn only(items: Vec<T>) -> Self {
        Self {
            total_available: Some(items.len() as u64),
            items,
            last: true,
        }
    }

    /// Whether another page should be requested after `request`.
    ///
    /// With a total, stop once the pages seen cover it. Without one, a
    /// short page ends the sequence. An empty or unpaginated page always
    /// ends it.
    pub fn has_more(&self, request: PageRequest) -> bool {
        if self.last || self.items.is_empty() {
            return false;
        }
        match self.total_available {
            Some(total) => u64::from(request.number) * u64::from(request.size) < total,
            None => self.items.len() as u64 >= u64::from(request.size),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(deserialize_with = "lenient_u64")]
    pub total_available: u64,
}

/// A list response that can be unpacked into a [`Page`].
pub trait Paged {
    type Item;

    fn into_page(self) -> Page<Self::Item>;
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Serialize)]
pub struct SignInRequest<'a> {
    pub credentials: SignInCredentials<'a>,
}

#[derive(Serialize)]
pub struct SignInCredentials<'a> {
    pub name: &'a str,
    pub password: &'a str,
    pub site: SiteRef<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRef<'a> {
    pub content_url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SwitchSiteRequest<'a> {
    pub site: SiteRef<'a>,
}

#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub credentials: IssuedCredentials,
}

#[derive(Debug, Deserialize)]
pub struct IssuedCredentials {
    pub token: String,
    pub site: IssuedSite,
    #[serde(default)]
    pub user: Option<IssuedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSite {
    pub id: Uuid,
    #[serde(default)]
    pub content_url: String,
}

#[derive(Debug, Deserialize)]
pub struct IssuedUser {
    pub id: Uuid,
}

/// Token and site returned by sign in or site switch.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub token: String,
    pub site_id: Uuid,
    pub site_content_url: String,
    pub user_id: Option<Uuid>,
}

impl std::fmt::Debug for SignedIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedIn")
            .field("token", &"[REDACTED]")
            .field("site_id", &self.site_id)
            .field("site_content_url", &self.site_content_url)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl From<SignInResponse> for SignedIn {
    fn from(response: SignInResponse) -> Self {
        let credentials = response.credentials;
        Self {
            token: credentials.token,
            site_id: credentials.site.id,
            site_content_url: credentials.site.content_url,
            user_id: credentials.user.map(|u| u.id),
        }
    }
}

// =============================================================================
// Lists
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SiteListResponse {
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub sites: SiteList,
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteList {
    #[serde(default)]
    pub site: Vec<Tenant>,
}

impl Paged for SiteListResponse {
    type Item = Tenant;

    fn into_page(self) -> Page<Tenant> {
        Page::new(self.sites.site, self.pagination.map(|p| p.total_available))
    }
}

#[derive(Debug, Deserialize)]
pub struct DataSourceListResponse {
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub datasources: DataSourceList,
}

#[derive(Debug, Default, Deserialize)]
pub struct DataSourceList {
    #[serde(default)]
    pub datasource: Vec<DataSource>,
}

impl Paged for DataSourceListResponse {
    type Item = DataSource;

    fn into_page(self) -> Page<DataSource> {
        Page::new(
            self.datasources.datasource,
            self.pagination.map(|p| p.total_available),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectionListResponse {
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub connections: ConnectionList,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectionList {
    #[serde(default)]
    pub connection: Vec<Connection>,
}

impl Paged for ConnectionListResponse {
    type Item = Connection;

    fn into_page(self) -> Page<Connection> {
        // The connections endpoint usually answers in one unpaginated body.
        match self.pagination {
            Some(p) => Page::new(self.connections.connection, Some(p.total_available)),
            None => Page::only(self.connections.connection),
        }
    }
}

// =============================================================================
// Connection update
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UpdateConnectionRequest<'a> {
    pub connection: UpdateConnectionBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConnectionBody<'a> {
    pub user_name: &'a str,
    pub password: &'a str,
    pub embed_password: bool,
}

impl std::fmt::Debug for UpdateConnectionBody<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateConnectionBody")
            .field("user_name", &self.user_name)
            .field("password", &"[REDACTED]")
            .field("embed_password", &self.embed_password)
            .finish()
    }
}

impl<'a> From<&'a ConnectionUpdate> for UpdateConnectionRequest<'a> {
    fn from(update: &'a ConnectionUpdate) -> Self {
        Self {
            connection: UpdateConnectionBody {
                user_name: &update.username,
                password: &update.password,
                embed_password: update.embed,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateConnectionResponse {
    pub connection: Option<Connection>,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        let text = match (&self.summary, &self.detail) {
            (Some(summary), Some(detail)) => format!("{summary}: {detail}"),
            (Some(summary), None) => summary.clone(),
            (None, Some(detail)) => detail.clone(),
            (None, None) => "no details".to_string(),
        };
        match &self.code {
            Some(code) => format!("{text} (code {code})"),
            None => text,
        }
    }
}

// =============================================================================
// Lenient scalars
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Accept `"12"` as well as `12`; the API renders counters as strings.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Int(n) => Ok(n),
        Scalar::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Scalar::Float(_) | Scalar::Bool(_) => Err(serde::de::Error::custom(
            "expected an integer or an integer string",
        )),
    }
}

/// Read a string-ish field that may arrive as a number or null.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Text(s) => s,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_site_list_with_string_pagination() {
        let body = json!({
            "pagination": {"pageNumber": "1", "pageSize": "100", "totalAvailable": "2"},
            "sites": {"site": [
                {"id": "9a8b7c6d-0000-4000-8000-000000000001", "name": "Default", "contentUrl": ""},
                {"id": "9a8b7c6d-0000-4000-8000-000000000002", "name": "Finance", "contentUrl": "finance"}
            ]}
        });
        let response: SiteListResponse = serde_json::from_value(body).unwrap();
        let page = response.into_page();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_available, Some(2));
        assert_eq!(page.items[1].content_url, "finance");
    }

    #[test]
    fn test_empty_datasource_list_omits_array() {
        let body = json!({
            "pagination": {"pageNumber": "1", "pageSize": "100", "totalAvailable": "0"},
            "datasources": {}
        });
        let response: DataSourceListResponse = serde_json::from_value(body).unwrap();
        assert!(response.into_page().items.is_empty());
    }

    #[test]
    fn test_connection_numeric_port() {
        let body = json!({
            "connections": {"connection": [{
                "id": "1f0e2d3c-0000-4000-8000-000000000001",
                "type": "postgres",
                "serverAddress": "db.internal",
                "serverPort": 5432,
                "userName": "reporting"
            }]}
        });
        let response: ConnectionListResponse = serde_json::from_value(body).unwrap();
        let page = response.into_page();
        assert_eq!(page.items[0].server_port.as_deref(), Some("5432"));
        assert_eq!(page.items[0].user_name.as_deref(), Some("reporting"));
        assert_eq!(page.total_available, Some(1));
        assert!(!page.has_more(PageRequest::first(1)));
    }

    #[test]
    fn test_unpaginated_connections_are_one_page() {
        let connections: Vec<_> = (1..=3)
            .map(|n| json!({"id": format!("1f0e2d3c-0000-4000-8000-00000000000{n}"), "type": "postgres"}))
            .collect();
        let body = json!({"connections": {"connection": connections}});
        let response: ConnectionListResponse = serde_json::from_value(body).unwrap();
        let page = response.into_page();

        assert_eq!(page.items.len(), 3);
        assert!(!page.has_more(PageRequest::first(2)));
    }

    #[test]
    fn test_paginated_connections_follow_total() {
        let body = json!({
            "pagination": {"pageNumber": "1", "pageSize": "1", "totalAvailable": "2"},
            "connections": {"connection": [{"id": "1f0e2d3c-0000-4000-8000-000000000001"}]}
        });
        let response: ConnectionListResponse = serde_json::from_value(body).unwrap();
        assert!(response.into_page().has_more(PageRequest::first(1)));
    }

    #[test]
    fn test_connection_without_username() {
        let body = json!({"id": "1f0e2d3c-0000-4000-8000-000000000001", "type": "excel-direct"});
        let connection: Connection = serde_json::from_value(body).unwrap();
        assert!(connection.user_name.is_none());
        assert!(connection.server_address.is_none());
    }

    #[test]
    fn test_update_request_shape() {
        let update = ConnectionUpdate {
            username: "bob".into(),
            password: "newpass1".into(),
            embed: true,
        };
        let body = serde_json::to_value(UpdateConnectionRequest::from(&update)).unwrap();
        assert_eq!(
            body,
            json!({"connection": {"userName": "bob", "password": "newpass1", "embedPassword": true}})
        );
    }

    #[test]
    fn test_update_debug_redacts_password() {
        let update = ConnectionUpdate {
            username: "bob".into(),
            password: "hunter2".into(),
            embed: true,
        };
        assert!(!format!("{update:?}").contains("hunter2"));
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorResponse = serde_json::from_value(json!({
            "error": {"code": "404004", "summary": "Resource Not Found", "detail": "Datasource 'x' could not be found."}
        }))
        .unwrap();
        assert_eq!(
            body.error.message(),
            "Resource Not Found: Datasource 'x' could not be found. (code 404004)"
        );
    }

    #[test]
    fn test_page_has_more_with_total() {
        let page = Page::new(vec![1, 2], Some(5));
        assert!(page.has_more(PageRequest { number: 1, size: 2 }));
        assert!(page.has_more(PageRequest { number: 2, size: 2 }));
        assert!(!page.has_more(PageRequest { number: 3, size: 2 }));
    }

    #[test]
    fn test_page_has_more_without_total() {
        let full = Page::new(vec![1, 2], None);
        let short = Page::new(vec![1], None);
        assert!(full.has_more(PageRequest::first(2)));
        assert!(!short.has_more(PageRequest::first(2)));
    }

    #[test]
    fn test_page_empty_ends() {
        let page: Page<u8> = Page::new(vec![], Some(10));
        assert!(!page.has_more(PageRequest::first(5)));
    }

    #[test]
    fn test_sign_in_response_conversion() {
        let body = json!({"credentials": {
            "token": "abc",
            "site": {"id": "9a8b7c6d-0000-4000-8000-000000000001", "contentUrl": ""},
            "user": {"id": "9a8b7c6d-0000-4000-8000-0000000000ff"}
        }});
        let response: SignInResponse = serde_json::from_value(body).unwrap();
        let signed_in = SignedIn::from(response);
        assert_eq!(signed_in.token, "abc");
        assert!(signed_in.user_id.is_some());
        assert!(!format!("{signed_in:?}").contains("abc"));
    }
}
