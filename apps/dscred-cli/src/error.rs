//! CLI error types and exit codes

use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error (configuration, I/O)
/// - 2: Authentication failed
/// - 3: Network error
/// - 4: Snapshot format or validation error
/// - 5: Server error
/// - 6: Run completed, but some sites or rows failed
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Run(#[from] dscred::Error),

    #[error("Run completed with failures: {0}")]
    PartialFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Run(e) => e.exit_code(),
            CliError::PartialFailure(_) => 6,
            CliError::Config(_) | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Run(dscred::Error::Auth(_)) => Some(
                "Check --username/--password (or TS_USERNAME/TS_PASSWORD) and the --site content URL.",
            ),
            CliError::Run(dscred::Error::Network(_)) => {
                Some("Check the server address and your network connection, then try again.")
            }
            CliError::Run(dscred::Error::Format(_)) => Some(
                "Regenerate the snapshot with 'dscred inventory' and edit only the updated_username and updated_password columns.",
            ),
            CliError::Run(dscred::Error::Config(_)) | CliError::Config(_) => Some(
                "Pass the value as a flag, set the matching TS_* environment variable, or add it to the config file.",
            ),
            CliError::PartialFailure(_) => Some(
                "Fix the failed rows and run 'dscred apply' again; applied rows can safely be applied twice.",
            ),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}
