//! dscred CLI - batch credential rotation for Tableau Server data sources
//!
//! The workflow has two steps:
//! - `dscred inventory` writes every data source connection of every site to a CSV snapshot
//! - `dscred apply <snapshot>` pushes the rows whose `updated_username` and
//!   `updated_password` columns were filled in

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod error;
mod logging;
mod output;

use commands::GlobalArgs;
use error::CliResult;
use logging::LogConfig;

/// dscred - rotate embedded data source credentials across sites
#[derive(Parser)]
#[command(name = "dscred")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List data sources on every site and write the snapshot
    Inventory(commands::inventory::InventoryArgs),

    /// Apply edited credentials from a snapshot
    Apply(commands::apply::ApplyArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_args(
        cli.global.verbose,
        cli.global.debug,
        cli.global.trace,
        cli.global.quiet,
        cli.global.log_file.clone(),
    );
    if let Err(e) = logging::init(&log_config) {
        e.print();
        std::process::exit(e.exit_code());
    }

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Inventory(args) => commands::inventory::execute(args, &cli.global).await,
        Commands::Apply(args) => commands::apply::execute(args, &cli.global).await,
    }
}
