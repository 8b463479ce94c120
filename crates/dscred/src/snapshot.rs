//! Snapshot CSV format
//!
//! The snapshot is the only artefact that crosses the manual edit step
//! between building the inventory and applying updates. One row describes
//! one data source connection:
//!
//! | column | written by | editable |
//! |--------|-----------|----------|
//! | `tenant_id`, `datasource_id` | inventory | no (join key) |
//! | `tenant_name`, `datasource_name` | inventory | informational |
//! | `connection_id`, `connection_type`, `server_address`, `server_port` | inventory | optional columns |
//! | `current_username` | inventory | informational |
//! | `updated_username`, `updated_password` | operator | yes |
//!
//! The optional columns may be dropped from a hand-made file. Without a
//! `connection_id` the applier updates every connection of the data source.

use crate::error::{Error, Result};
use crate::models::{Connection, ConnectionUpdate, DataSource, Tenant};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use uuid::Uuid;

/// Columns in the order they are written.
pub const COLUMNS: [&str; 11] = [
    "tenant_id",
    "tenant_name",
    "datasource_id",
    "datasource_name",
    "connection_id",
    "connection_type",
    "server_address",
    "server_port",
    "current_username",
    "updated_username",
    "updated_password",
];

/// Columns a snapshot must have to be read.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "tenant_id",
    "tenant_name",
    "datasource_id",
    "datasource_name",
    "current_username",
    "updated_username",
    "updated_password",
];

/// One data source connection and its pending credential change.
///
/// Field order matches [`COLUMNS`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub datasource_id: Uuid,
    pub datasource_name: String,
    #[serde(default)]
    pub connection_id: Option<Uuid>,
    #[serde(default)]
    pub connection_type: String,
    #[serde(default)]
    pub server_address: String,
    #[serde(default)]
    pub server_port: String,
    pub current_username: String,
    pub updated_username: String,
    pub updated_password: String,
}

impl std::fmt::Debug for SnapshotRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRecord")
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("datasource_id", &self.datasource_id)
            .field("datasource_name", &self.datasource_name)
            .field("connection_id", &self.connection_id)
            .field("current_username", &self.current_username)
            .field("updated_username", &self.updated_username)
            .field(
                "updated_password",
                &if self.updated_password.is_empty() {
                    ""
                } else {
                    "[REDACTED]"
                },
            )
            .finish()
    }
}

/// What a row asks the applier to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingUpdate<'a> {
    /// Both updated columns are empty.
    Unchanged,
    /// Exactly one updated column is filled in.
    Incomplete,
    Complete { username: &'a str, password: &'a str },
}

impl SnapshotRecord {
    /// Row for a freshly listed data source, with the updated columns empty.
    pub fn from_listing(
        tenant: &Tenant,
        datasource: &DataSource,
        connection: Option<&Connection>,
    ) -> Self {
        Self {
            tenant_id: tenant.id,
            tenant_name: tenant.name.clone(),
            datasource_id: datasource.id,
            datasource_name: datasource.name.clone(),
            connection_id: connection.map(|c| c.id),
            connection_type: connection
                .and_then(|c| c.connection_type.clone())
                .unwrap_or_default(),
            server_address: connection
                .and_then(|c| c.server_address.clone())
                .unwrap_or_default(),
            server_port: connection
                .and_then(|c| c.server_port.clone())
                .unwrap_or_default(),
            current_username: connection
                .and_then(|c| c.user_name.clone())
                .unwrap_or_default(),
            updated_username: String::new(),
            updated_password: String::new(),
        }
    }

    pub fn pending_update(&self) -> PendingUpdate<'_> {
        match (
            self.updated_username.is_empty(),
            self.updated_password.is_empty(),
        ) {
            (true, true) => PendingUpdate::Unchanged,
            (false, false) => PendingUpdate::Complete {
                username: &self.updated_username,
                password: &self.updated_password,
            },
            _ => PendingUpdate::Incomplete,
        }
    }

    /// A row is applied only when both updated columns are filled in.
    pub fn is_eligible(&self) -> bool {
        matches!(self.pending_update(), PendingUpdate::Complete { .. })
    }

    /// The credential change this row asks for, if it is eligible.
    pub fn connection_update(&self, embed: bool) -> Option<ConnectionUpdate> {
        match self.pending_update() {
            PendingUpdate::Complete { username, password } => Some(ConnectionUpdate {
                username: username.to_string(),
                password: password.to_string(),
                embed,
            }),
            _ => None,
        }
    }
}

/// Write records as CSV, header first. An empty slice still gets a header.
pub fn write<W: Write>(records: &[SnapshotRecord], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()
        .map_err(|e| Error::Io(format!("failed to flush snapshot: {e}")))?;
    Ok(())
}

pub fn to_bytes(records: &[SnapshotRecord]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write(records, &mut buffer)?;
    Ok(buffer)
}

/// Read records from CSV.
///
/// Fails with [`Error::Format`] when a required column is missing, a row has
/// the wrong number of fields, or an id is not a UUID. Rows keep their order.
pub fn read<R: Read>(reader: R) -> Result<Vec<SnapshotRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| Error::Format(format!("unreadable header row: {e}")))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Format(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for result in rdr.deserialize::<SnapshotRecord>() {
        let record = result.map_err(|e| {
            let line = e
                .position()
                .map(|p| p.line().to_string())
                .unwrap_or_else(|| "?".to_string());
            Error::Format(format!("line {line}: {e}"))
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Vec<SnapshotRecord>> {
    read(bytes)
}

pub fn write_path(records: &[SnapshotRecord], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| Error::Io(format!("failed to create {}: {e}", path.display())))?;
    write(records, file)
}

pub fn read_path(path: &Path) -> Result<Vec<SnapshotRecord>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Io(format!("failed to open {}: {e}", path.display())))?;
    read(file)
}
