//! Verbosity flags to filter directives

/// How much the CLI logs. Ordered from least to most output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// `-q`: errors only
    Quiet,
    /// Isolated site and row failures show up as warnings
    #[default]
    Normal,
    /// `-v`: progress per site and phase
    Verbose,
    /// `--debug`: every REST call
    Debug,
    /// `--trace`: error response bodies too
    Trace,
}

impl LogLevel {
    /// `-q` silences everything; otherwise the most verbose flag given wins.
    pub fn from_flags(verbose: bool, debug: bool, trace: bool, quiet: bool) -> Self {
        match (quiet, trace, debug, verbose) {
            (true, ..) => Self::Quiet,
            (_, true, ..) => Self::Trace,
            (_, _, true, _) => Self::Debug,
            (_, _, _, true) => Self::Verbose,
            _ => Self::Normal,
        }
    }

    /// Filter for `dscred` targets. Dependencies such as reqwest and hyper
    /// stay at warn unless `-q` lowers them to error.
    pub fn directive(self) -> String {
        let ours = match self {
            Self::Quiet => return "error".to_string(),
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        format!("warn,dscred={ours}")
    }
}
