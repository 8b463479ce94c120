//! # dscred
//!
//! Batch credential rotation for data sources on a multi-site Tableau Server.
//!
//! The work happens in two phases joined only by a CSV snapshot:
//!
//! 1. **Inventory**: sign in, walk every site the identity can see, and write
//!    one row per data source connection with its current username.
//! 2. **Apply**: read the edited snapshot, group rows by site, and update the
//!    embedded username and password of every row whose `updated_username`
//!    and `updated_password` are both filled in. Failures are isolated per
//!    row (and per site when a site cannot be entered).
//!
//! ## Example
//!
//! ```ignore
//! use dscred::{ApplyOptions, ServerConfig};
//! use std::path::Path;
//!
//! let config = ServerConfig::new("https://tableau.example.com", "3.4", "admin", "secret");
//! let (inventory, _) = dscred::build_inventory_to_path(config.clone(), Path::new("datasources.csv")).await?;
//! // ... edit datasources.csv ...
//! let report = dscred::apply_updates_from_path(config, Path::new("datasources.csv"), ApplyOptions::default()).await?;
//! println!("{} applied, {} failed", report.applied_count, report.failed_count);
//! ```

pub mod applier;
pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod pagination;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod tenants;
pub mod workflow;

// Re-exports
pub use applier::{group_by_tenant, ApplyOptions, BatchApplier};
pub use client::RestClient;
pub use config::{ScopeMode, ServerConfig, Settings};
pub use error::{Error, Result};
pub use inventory::{build_inventory, FailureStage, Inventory, TenantFailure};
pub use models::{Connection, ConnectionUpdate, DataSource, Tenant};
pub use report::{
    mask_secret, ApplyReport, InventoryReport, OutcomeReason, OutcomeStatus, UpdateOutcome,
};
pub use session::{Session, SessionManager};
pub use snapshot::{PendingUpdate, SnapshotRecord};
pub use tenants::list_tenants;
pub use workflow::{apply_updates_from_path, apply_updates_with_interrupt, build_inventory_to_path};
