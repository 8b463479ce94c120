//! Error types for the credential rotation workflow
//!
//! Errors fall in two groups. `Auth`, `Format` and `Config` abort a run.
//! Everything else is caught per tenant or per record and surfaced as an
//! outcome in the run report.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Credentials rejected or server unreachable during sign in.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The identity cannot operate in the requested tenant.
    #[error("tenant {tenant} is not accessible: {message}")]
    Scope { tenant: String, message: String },

    /// The snapshot file does not follow the column contract.
    #[error("malformed snapshot: {0}")]
    Format(String),

    /// The server does not know the addressed object.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered with an error status.
    #[error("server rejected request (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure (connect, timeout, undecodable body).
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Auth(_) | Error::Format(_) | Error::Config(_))
    }

    /// Process exit code for this error.
    ///
    /// - 1: general / configuration / I/O
    /// - 2: authentication
    /// - 3: network
    /// - 4: snapshot format
    /// - 5: server error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Auth(_) | Error::Scope { .. } => 2,
            Error::Network(_) => 3,
            Error::Format(_) | Error::NotFound(_) => 4,
            Error::Api { status, .. } => {
                if *status >= 500 {
                    5
                } else if *status == 401 || *status == 403 {
                    2
                } else {
                    4
                }
            }
            Error::Config(_) | Error::Io(_) => 1,
        }
    }

    pub(crate) fn scope(tenant: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Scope {
            tenant: tenant.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Network("request timed out".to_string())
        } else if e.is_connect() {
            Error::Network(format!("connection failed: {e}"))
        } else if e.is_decode() {
            Error::Network(format!("undecodable response body: {e}"))
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        match e.kind() {
            csv::ErrorKind::Io(_) => Error::Io(e.to_string()),
            _ => Error::Format(e.to_string()),
        }
    }
}
