//! CLI command implementations

pub mod apply;
pub mod inventory;

use crate::config;
use crate::error::CliResult;
use clap::Args;
use dscred::{ScopeMode, ServerConfig, Settings};
use std::path::PathBuf;

/// Connection and logging flags shared by every command
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Server base URL, e.g. https://tableau.example.com
    #[arg(long, global = true, env = "TS_ADDRESS")]
    pub server: Option<String>,

    /// REST API version, e.g. 3.4
    #[arg(long, global = true, env = "TS_API_VERSION")]
    pub api_version: Option<String>,

    /// Administrator username
    #[arg(long, short = 'u', global = true, env = "TS_USERNAME")]
    pub username: Option<String>,

    /// Administrator password
    #[arg(long, global = true, env = "TS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Content URL of the site to sign in to first (default site if omitted)
    #[arg(long, global = true)]
    pub site: Option<String>,

    /// Config file (default: <config dir>/dscred/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How to move between sites: switch or sign-in
    #[arg(long, global = true, value_name = "MODE")]
    pub scope_mode: Option<ScopeMode>,

    /// Items per page when listing
    #[arg(long, global = true, value_name = "N")]
    pub page_size: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not embed the new credentials on the connection
    #[arg(long, global = true)]
    pub no_embed: bool,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Show progress per site
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Show every REST call
    #[arg(long, global = true)]
    pub debug: bool,

    /// Show error response bodies
    #[arg(long, global = true)]
    pub trace: bool,

    /// Only show errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Write diagnostics to a file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl GlobalArgs {
    /// Settings given on the command line or through `TS_*` variables.
    pub fn settings(&self) -> Settings {
        Settings {
            server_url: self.server.clone(),
            api_version: self.api_version.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            site_content_url: self.site.clone(),
            embed_credentials: self.no_embed.then_some(false),
            page_size: self.page_size,
            timeout_secs: self.timeout,
            scope_mode: self.scope_mode,
            tenant_concurrency: None,
            accept_invalid_certs: self.insecure.then_some(true),
        }
    }

    /// Validated configuration from flags over the config file.
    pub fn server_config(&self) -> CliResult<ServerConfig> {
        config::resolve(self.settings(), self.config.as_deref())
    }
}
