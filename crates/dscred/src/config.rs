//! Run configuration
//!
//! `ServerConfig` is the validated identity a run works with. `Settings` is
//! the loose, all-optional layer read from a config file or assembled from
//! command-line flags; layers are merged and then turned into a
//! `ServerConfig`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Upper bound accepted by the server for `pageSize`.
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How a session moves from one site to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeMode {
    /// `POST auth/switchSite` with the current token.
    #[default]
    Switch,
    /// Sign in again against the site's content URL and drop the old token.
    SignIn,
}

impl std::str::FromStr for ScopeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "switch" => Ok(ScopeMode::Switch),
            "sign-in" | "signin" => Ok(ScopeMode::SignIn),
            other => Err(Error::Config(format!(
                "unknown scope mode '{other}' (expected 'switch' or 'sign-in')"
            ))),
        }
    }
}

impl std::fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeMode::Switch => write!(f, "switch"),
            ScopeMode::SignIn => write!(f, "sign-in"),
        }
    }
}

/// Connection and behaviour settings for one run.
#[derive(Clone)]
pub struct ServerConfig {
    /// Base URL without path, e.g. `https://tableau.example.com`.
    pub server_url: String,
    /// REST API version, e.g. `3.4`.
    pub api_version: String,
    pub username: String,
    pub password: String,
    /// Content URL of the site used for the first sign in; empty is the default site.
    pub site_content_url: String,
    /// Store the new credentials on the connection (`embedPassword`).
    pub embed_credentials: bool,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub scope_mode: ScopeMode,
    /// Number of tenant groups applied at once, each with its own session.
    pub tenant_concurrency: usize,
    pub accept_invalid_certs: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("server_url", &self.server_url)
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("site_content_url", &self.site_content_url)
            .field("embed_credentials", &self.embed_credentials)
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .field("scope_mode", &self.scope_mode)
            .field("tenant_concurrency", &self.tenant_concurrency)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

impl ServerConfig {
    pub fn new(
        server_url: impl Into<String>,
        api_version: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            username: username.into(),
            password: password.into(),
            site_content_url: String::new(),
            embed_credentials: true,
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scope_mode: ScopeMode::default(),
            tenant_concurrency: 1,
            accept_invalid_certs: false,
        }
    }

    pub fn with_site(mut self, content_url: impl Into<String>) -> Self {
        self.site_content_url = content_url.into();
        self
    }

    pub fn with_embed_credentials(mut self, embed: bool) -> Self {
        self.embed_credentials = embed;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_scope_mode(mut self, mode: ScopeMode) -> Self {
        self.scope_mode = mode;
        self
    }

    pub fn with_tenant_concurrency(mut self, concurrency: usize) -> Self {
        self.tenant_concurrency = concurrency;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Root of the versioned REST API, e.g. `https://host/api/3.4`.
    pub fn api_root(&self) -> String {
        format!("{}/api/{}", self.server_url, self.api_version)
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| Error::Config(format!("invalid server URL '{}': {e}", self.server_url)))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(Error::Config(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::Config("server URL has no host".to_string()));
        }
        if url.path() != "/" && !url.path().is_empty() {
            return Err(Error::Config(format!(
                "server URL must not contain a path: {}",
                self.server_url
            )));
        }

        let mut parts = self.api_version.split('.');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(major), Some(minor), None)
                if !major.is_empty()
                    && !minor.is_empty()
                    && major.chars().all(|c| c.is_ascii_digit())
                    && minor.chars().all(|c| c.is_ascii_digit())
        );
        if !well_formed {
            return Err(Error::Config(format!(
                "API version must look like '3.4', got '{}'",
                self.api_version
            )));
        }

        if self.username.trim().is_empty() {
            return Err(Error::Config("username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("password is required".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(Error::Config(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least one second".to_string()));
        }
        if self.tenant_concurrency == 0 {
            return Err(Error::Config(
                "tenant concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Optional settings from one configuration source.
///
/// Earlier sources win in [`Settings::merge`]; the merged result is turned
/// into a [`ServerConfig`] with [`Settings::into_server_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: Option<String>,
    pub api_version: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub site_content_url: Option<String>,
    pub embed_credentials: Option<bool>,
    pub page_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub scope_mode: Option<ScopeMode>,
    pub tenant_concurrency: Option<usize>,
    pub accept_invalid_certs: Option<bool>,
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))
    }

    /// Fill every unset field from `lower`.
    pub fn merge(self, lower: Settings) -> Settings {
        Settings {
            server_url: self.server_url.or(lower.server_url),
            api_version: self.api_version.or(lower.api_version),
            username: self.username.or(lower.username),
            password: self.password.or(lower.password),
            site_content_url: self.site_content_url.or(lower.site_content_url),
            embed_credentials: self.embed_credentials.or(lower.embed_credentials),
            page_size: self.page_size.or(lower.page_size),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
            scope_mode: self.scope_mode.or(lower.scope_mode),
            tenant_concurrency: self.tenant_concurrency.or(lower.tenant_concurrency),
            accept_invalid_certs: self.accept_invalid_certs.or(lower.accept_invalid_certs),
        }
    }

    pub fn into_server_config(self) -> Result<ServerConfig> {
        fn required(value: Option<String>, name: &str) -> Result<String> {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{name} is not set")))
        }

        let mut config = ServerConfig::new(
            required(self.server_url, "server URL")?,
            required(self.api_version, "API version")?,
            required(self.username, "username")?,
            required(self.password, "password")?,
        );
        if let Some(site) = self.site_content_url {
            config = config.with_site(site);
        }
        if let Some(embed) = self.embed_credentials {
            config = config.with_embed_credentials(embed);
        }
        if let Some(page_size) = self.page_size {
            config = config.with_page_size(page_size);
        }
        if let Some(timeout) = self.timeout_secs {
            config = config.with_timeout_secs(timeout);
        }
        if let Some(mode) = self.scope_mode {
            config = config.with_scope_mode(mode);
        }
        if let Some(concurrency) = self.tenant_concurrency {
            config = config.with_tenant_concurrency(concurrency);
        }
        if let Some(accept) = self.accept_invalid_certs {
            config = config.with_accept_invalid_certs(accept);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ServerConfig {
        ServerConfig::new("https://tableau.example.com/", "3.4", "admin", "secret")
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = valid();
        assert_eq!(config.server_url, "https://tableau.example.com");
        assert_eq!(config.api_root(), "https://tableau.example.com/api/3.4");
    }

    #[test]
    fn test_defaults() {
        let config = valid();
        assert!(config.embed_credentials);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.scope_mode, ScopeMode::Switch);
        assert_eq!(config.tenant_concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_path_in_url() {
        let config = ServerConfig::new("https://tableau.example.com/views", "3.4", "a", "b");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = ServerConfig::new("ftp://tableau.example.com", "3.4", "a", "b");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_api_version() {
        for bad in ["", "3", "3.", "v3.4", "3.4.1"] {
            let config = ServerConfig::new("https://h.example.com", bad, "a", "b");
            assert!(config.validate().is_err(), "version {bad:?} should fail");
        }
        let config = ServerConfig::new("https://h.example.com", "2.8", "a", "b");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_page_size_bounds() {
        assert!(valid().with_page_size(0).validate().is_err());
        assert!(valid().with_page_size(1001).validate().is_err());
        assert!(valid().with_page_size(1000).validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_scope_mode_parse() {
        assert_eq!("switch".parse::<ScopeMode>().unwrap(), ScopeMode::Switch);
        assert_eq!("sign-in".parse::<ScopeMode>().unwrap(), ScopeMode::SignIn);
        assert!("relogin".parse::<ScopeMode>().is_err());
    }

    #[test]
    fn test_settings_merge_prefers_upper() {
        let upper = Settings {
            server_url: Some("https://upper.example.com".into()),
            ..Default::default()
        };
        let lower = Settings {
            server_url: Some("https://lower.example.com".into()),
            api_version: Some("3.4".into()),
            ..Default::default()
        };
        let merged = upper.merge(lower);
        assert_eq!(merged.server_url.as_deref(), Some("https://upper.example.com"));
        assert_eq!(merged.api_version.as_deref(), Some("3.4"));
    }

    #[test]
    fn test_settings_missing_required() {
        let settings = Settings {
            server_url: Some("https://h.example.com".into()),
            api_version: Some("3.4".into()),
            username: Some("admin".into()),
            ..Default::default()
        };
        let err = settings.into_server_config().unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_settings_into_server_config() {
        let settings = Settings {
            server_url: Some("https://h.example.com".into()),
            api_version: Some("3.4".into()),
            username: Some("admin".into()),
            password: Some("pw".into()),
            embed_credentials: Some(false),
            scope_mode: Some(ScopeMode::SignIn),
            ..Default::default()
        };
        let config = settings.into_server_config().unwrap();
        assert!(!config.embed_credentials);
        assert_eq!(config.scope_mode, ScopeMode::SignIn);
    }

    #[test]
    fn test_settings_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server_url": "https://h.example.com", "api_version": "3.4", "scope_mode": "sign-in"}"#,
        )
        .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.api_version.as_deref(), Some("3.4"));
        assert_eq!(settings.scope_mode, Some(ScopeMode::SignIn));
    }

    #[test]
    fn test_settings_load_missing_file() {
        let settings = Settings::load(Path::new("/nonexistent/dscred/config.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
