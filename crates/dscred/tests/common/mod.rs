//! Mock Tableau Server for integration tests.
//!
//! Every site has its own token (`token-<contentUrl>`, `token-default` for
//! the default site). Listing and update mocks only answer when the request
//! carries the token of the site in the path, so a call made with the wrong
//! scope gets wiremock's bare 404.

#![allow(dead_code)]

use dscred::{ScopeMode, ServerConfig};
use serde_json::{json, Value};
use std::sync::Once;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API: &str = "/api/3.4";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "admin-pw";

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

#[derive(Debug, Clone, Copy)]
pub struct MockSite {
    pub id: Uuid,
    pub name: &'static str,
    pub content_url: &'static str,
}

impl MockSite {
    pub fn token(&self) -> String {
        if self.content_url.is_empty() {
            "token-default".to_string()
        } else {
            format!("token-{}", self.content_url)
        }
    }

    fn json(&self) -> Value {
        json!({"id": self.id, "name": self.name, "contentUrl": self.content_url})
    }
}

pub const DEFAULT_SITE: MockSite = MockSite {
    id: Uuid::from_u128(0xa1),
    name: "Default",
    content_url: "",
};

pub const FINANCE_SITE: MockSite = MockSite {
    id: Uuid::from_u128(0xb2),
    name: "Finance",
    content_url: "finance",
};

pub const OPS_SITE: MockSite = MockSite {
    id: Uuid::from_u128(0xc3),
    name: "Ops",
    content_url: "ops",
};

pub fn datasource_id(n: u128) -> Uuid {
    Uuid::from_u128(0xd000 + n)
}

pub fn connection_id(n: u128) -> Uuid {
    Uuid::from_u128(0xe000 + n)
}

pub fn config(server: &MockServer) -> ServerConfig {
    init_test_logging();
    ServerConfig::new(server.uri(), "3.4", USERNAME, PASSWORD)
}

pub fn sign_in_config(server: &MockServer) -> ServerConfig {
    config(server).with_scope_mode(ScopeMode::SignIn)
}

fn credentials_body(site: &MockSite) -> Value {
    json!({"credentials": {
        "token": site.token(),
        "site": {"id": site.id, "contentUrl": site.content_url},
        "user": {"id": Uuid::from_u128(0xff)}
    }})
}

// =============================================================================
// Auth
// =============================================================================

/// Accept the configured credentials against `site`.
pub async fn mount_sign_in(server: &MockServer, site: &MockSite) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/auth/signin")))
        .and(body_partial_json(json!({"credentials": {
            "name": USERNAME,
            "password": PASSWORD,
            "site": {"contentUrl": site.content_url}
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(credentials_body(site)))
        .mount(server)
        .await;
}

pub async fn mount_sign_in_rejected(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/auth/signin")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "401001", "summary": "Signin Error", "detail": "Invalid credentials"}
        })))
        .mount(server)
        .await;
}

pub async fn mount_switch_site(server: &MockServer, site: &MockSite) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/auth/switchSite")))
        .and(body_json(json!({"site": {"contentUrl": site.content_url}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(credentials_body(site)))
        .mount(server)
        .await;
}

pub async fn mount_switch_site_denied(server: &MockServer, site: &MockSite) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/auth/switchSite")))
        .and(body_json(json!({"site": {"contentUrl": site.content_url}})))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "403070", "summary": "Forbidden", "detail": "User is not a member of the site"}
        })))
        .mount(server)
        .await;
}

pub async fn mount_sign_out(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{API}/auth/signout")))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Sign in, switch to every other site, and sign out.
pub async fn mount_auth(server: &MockServer, sites: &[MockSite]) {
    mount_sign_in(server, &DEFAULT_SITE).await;
    for site in sites {
        mount_switch_site(server, site).await;
    }
    mount_sign_out(server).await;
}

// =============================================================================
// Listing
// =============================================================================

pub async fn mount_sites(server: &MockServer, sites: &[MockSite]) {
    let list: Vec<Value> = sites.iter().map(MockSite::json).collect();
    Mock::given(method("GET"))
        .and(path(format!("{API}/sites")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagination": {"pageNumber": "1", "pageSize": "100", "totalAvailable": sites.len().to_string()},
            "sites": {"site": list}
        })))
        .mount(server)
        .await;
}

/// Data sources of `site` as one page, only for that site's token.
pub async fn mount_datasources(server: &MockServer, site: &MockSite, datasources: &[(Uuid, &str)]) {
    mount_datasource_page(server, site, datasources, 1, datasources.len()).await;
}

/// One page of data sources for `site`.
pub async fn mount_datasource_page(
    server: &MockServer,
    site: &MockSite,
    datasources: &[(Uuid, &str)],
    page_number: u32,
    total: usize,
) {
    let list: Vec<Value> = datasources
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name, "contentUrl": name.to_lowercase()}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("{API}/sites/{}/datasources", site.id)))
        .and(query_param("pageNumber", page_number.to_string()))
        .and(header("X-Tableau-Auth", site.token().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pagination": {"pageNumber": page_number.to_string(), "totalAvailable": total.to_string()},
            "datasources": {"datasource": list}
        })))
        .mount(server)
        .await;
}

pub async fn mount_datasources_error(server: &MockServer, site: &MockSite, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("{API}/sites/{}/datasources", site.id)))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "error": {"code": "500000", "summary": "Internal Server Error", "detail": "listing failed"}
        })))
        .mount(server)
        .await;
}

/// Connections of a data source: `(connection id, embedded username)`.
pub async fn mount_connections(
    server: &MockServer,
    site: &MockSite,
    datasource: Uuid,
    connections: &[(Uuid, Option<&str>)],
) {
    let list: Vec<Value> = connections
        .iter()
        .map(|(id, user)| {
            let mut connection = json!({
                "id": id,
                "type": "postgres",
                "serverAddress": "db.internal",
                "serverPort": "5432"
            });
            if let Some(user) = user {
                connection["userName"] = json!(user);
            }
            connection
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!(
            "{API}/sites/{}/datasources/{datasource}/connections",
            site.id
        )))
        .and(header("X-Tableau-Auth", site.token().as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"connections": {"connection": list}})),
        )
        .mount(server)
        .await;
}

// =============================================================================
// Update
// =============================================================================

/// Accept an update of one connection with exactly these credentials,
/// expecting it `times` times.
pub async fn mount_update(
    server: &MockServer,
    site: &MockSite,
    datasource: Uuid,
    connection: Uuid,
    username: &str,
    password: &str,
    times: u64,
) {
    Mock::given(method("PUT"))
        .and(path(format!(
            "{API}/sites/{}/datasources/{datasource}/connections/{connection}",
            site.id
        )))
        .and(header("X-Tableau-Auth", site.token().as_str()))
        .and(body_json(json!({"connection": {
            "userName": username,
            "password": password,
            "embedPassword": true
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"connection": {
            "id": connection,
            "type": "postgres",
            "serverAddress": "db.internal",
            "serverPort": "5432",
            "userName": username
        }})))
        .expect(times)
        .mount(server)
        .await;
}

/// Fail every update under `site` and count the attempts.
pub async fn mount_update_forbidden(server: &MockServer, site: &MockSite, times: u64) {
    Mock::given(method("PUT"))
        .and(path_regex_for_site(site))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": "403004", "summary": "Forbidden", "detail": "not allowed"}
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// Catch-all that must never see a PUT.
pub async fn forbid_updates(server: &MockServer) {
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

fn path_regex_for_site(site: &MockSite) -> wiremock::matchers::PathRegexMatcher {
    wiremock::matchers::path_regex(format!(
        r"^{API}/sites/{}/datasources/[^/]+/connections/[^/]+$",
        site.id
    ))
}
