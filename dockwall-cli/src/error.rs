//! CLI-specific error types and exit code mapping

use dockwall_core::error::{ConfigError, DockerError, DockwallError};
use dockwall_docker::DockerSourceError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading, validation, or conflicting flags.
    #[error("configuration error: {0}")]
    Config(String),

    /// Cannot reach the Docker daemon.
    #[error("docker daemon not reachable: {0}")]
    DockerUnavailable(String),

    /// Docker answered but the request failed.
    #[error("docker error: {0}")]
    Docker(String),

    /// The generated statements or the invoked executable failed.
    #[error("execution failed: {0}")]
    Execution(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (artifact write, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Startup failure outside the categories above (logging, metrics listener).
    #[error("{0}")]
    Startup(#[from] anyhow::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General error                    |
    /// | 2    | Configuration error              |
    /// | 3    | Docker daemon unreachable        |
    /// | 4    | Execution / invocation failed    |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::DockerUnavailable(_) => 3,
            Self::Execution(_) => 4,
            Self::Io(_) => 10,
            Self::Docker(_) | Self::JsonSerialize(_) | Self::Startup(_) => 1,
        }
    }
}

impl From<DockwallError> for CliError {
    fn from(err: DockwallError) -> Self {
        match err {
            DockwallError::Config(e) => Self::Config(e.to_string()),
            DockwallError::Docker(DockerError::Unreachable(msg)) => Self::DockerUnavailable(msg),
            DockwallError::Docker(e) => Self::Docker(e.to_string()),
            DockwallError::Io(e) => Self::Io(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<DockerSourceError> for CliError {
    fn from(err: DockerSourceError) -> Self {
        DockwallError::from(err).into()
    }
}
