//! `dscred inventory`: write the data source snapshot

use super::GlobalArgs;
use crate::error::{CliError, CliResult};
use crate::output;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the inventory command
#[derive(Args, Debug)]
pub struct InventoryArgs {
    /// Snapshot file to write
    #[arg(long, short = 'o', default_value = "datasources.csv")]
    pub output: PathBuf,

    /// Also write the run report as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: InventoryArgs, global: &GlobalArgs) -> CliResult<()> {
    let config = global.server_config()?;
    info!(server = %config.server_url, output = %args.output.display(), "Building inventory");

    let (_, report) = dscred::build_inventory_to_path(config, &args.output).await?;

    if let Some(path) = &args.report {
        output::write_report(path, &report)?;
    }
    if args.json {
        output::print_json(&report)?;
    } else {
        output::print_inventory_summary(&report);
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::PartialFailure(format!(
            "{} of {} site(s) could not be listed",
            report.failed_tenants.len(),
            report.tenant_count
        )))
    }
}
