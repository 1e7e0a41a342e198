//! CLI-specific error types and exit code mapping

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The `--server` value is not a usable URL.
    #[error("invalid server address '{0}'")]
    InvalidServer(String),

    /// The daemon answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        completed: Vec<String>,
    },

    /// Cannot connect to the daemon.
    #[error("daemon not reachable: {0}")]
    DaemonUnavailable(String),

    /// Transport failure after the connection was made, or an unreadable response.
    #[error("{0}")]
    Http(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                              |
    /// |------|--------------------------------------|
    /// | 0    | Success                              |
    /// | 1    | Request rejected / general error     |
    /// | 2    | Invalid `--server` address           |
    /// | 3    | Daemon unreachable                   |
    /// | 4    | Daemon-side table failure (5xx)      |
    /// | 10   | IO error                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidServer(_) => 2,
            Self::DaemonUnavailable(_) => 3,
            Self::Api { status, .. } if *status >= 500 => 4,
            Self::Io(_) => 10,
            Self::Api { .. } | Self::Http(_) | Self::JsonSerialize(_) => 1,
        }
    }

    /// Items a batch operation finished before it failed.
    pub fn completed(&self) -> &[String] {
        match self {
            Self::Api { completed, .. } => completed,
            _ => &[],
        }
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::DaemonUnavailable(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}
