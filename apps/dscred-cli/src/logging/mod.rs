//! Diagnostic logging for the CLI
//!
//! Installs a `tracing` subscriber whose filter comes from the verbosity
//! flags, unless `DSCRED_LOG` holds an explicit `EnvFilter` directive.
//! Output goes to stderr, or to `--log-file` without ANSI colours.

pub mod level;

pub use level::LogLevel;

use crate::error::{CliError, CliResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `dscred=debug`.
pub const LOG_ENV: &str = "DSCRED_LOG";

/// Logging settings resolved from flags.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub color: bool,
}

impl LogConfig {
    pub fn from_args(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_file: Option<PathBuf>,
    ) -> Self {
        Self {
            level: LogLevel::from_flags(verbose, debug, trace, quiet),
            color: log_file.is_none() && std::env::var("NO_COLOR").is_err(),
            log_file,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(self.level.directive()))
    }
}

fn open_log_file(path: &Path) -> CliResult<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CliError::Io(format!("cannot open log file {}: {}", path.display(), e)))
}

/// Install the global subscriber. Call once, before any work.
pub fn init(config: &LogConfig) -> CliResult<()> {
    let writer = match &config.log_file {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(writer)
        .with_ansi(config.color)
        .with_target(config.level >= LogLevel::Debug)
        .try_init()
        .map_err(|e| CliError::Config(format!("failed to initialise logging: {}", e)))
}
