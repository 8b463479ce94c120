//! `dscred apply`: push edited credentials from a snapshot

use super::GlobalArgs;
use crate::error::{CliError, CliResult};
use crate::output;
use clap::Args;
use dscred::{ApplyOptions, ApplyReport, ServerConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Edited snapshot file
    pub snapshot: PathBuf,

    /// Show what would be applied without calling the server
    #[arg(long)]
    pub dry_run: bool,

    /// Apply up to N sites at once, each with its own session
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Also write the run report as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ApplyArgs {
    /// `--parallel` replaces the configured tenant concurrency.
    fn apply_to(&self, config: ServerConfig) -> CliResult<ServerConfig> {
        match self.parallel {
            Some(0) => Err(CliError::Config(
                "--parallel must be at least 1".to_string(),
            )),
            Some(n) => Ok(config.with_tenant_concurrency(n)),
            None => Ok(config),
        }
    }

    fn options(&self) -> ApplyOptions {
        ApplyOptions {
            dry_run: self.dry_run,
        }
    }
}

/// Flag raised by Ctrl+C; the applier stops before the next row.
fn interrupt_flag() -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Could not install Ctrl+C handler");
    }
    interrupted
}

pub async fn execute(args: ApplyArgs, global: &GlobalArgs) -> CliResult<()> {
    let config = args.apply_to(global.server_config()?)?;
    let options = args.options();
    info!(
        snapshot = %args.snapshot.display(),
        dry_run = options.dry_run,
        concurrency = config.tenant_concurrency,
        "Applying snapshot"
    );

    let report =
        dscred::apply_updates_with_interrupt(config, &args.snapshot, options, interrupt_flag())
            .await?;

    if let Some(path) = &args.report {
        output::write_report(path, &report)?;
    }
    if args.json {
        output::print_json(&report)?;
    } else {
        output::print_apply_summary(&report);
    }

    completion(&report)
}

fn completion(report: &ApplyReport) -> CliResult<()> {
    if report.has_failures() {
        return Err(CliError::PartialFailure(format!(
            "{} of {} row(s) failed",
            report.failed_count, report.total
        )));
    }
    if report.interrupted {
        return Err(CliError::PartialFailure(format!(
            "interrupted after {} applied row(s)",
            report.applied_count
        )));
    }
    Ok(())
}
