//! CLI error type.

use std::fmt;
use std::io;
use std::path::PathBuf;

use staxdeploy::archive::ArchiveError;
use staxdeploy::config::ConfigError;
use staxdeploy::deployer::DeployError;
use staxdeploy::logging::LoggingError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid command line or configuration input.
    Config(String),
    ConfigFile(ConfigError),
    Archive(ArchiveError),
    Deploy(DeployError),
    Logging(LoggingError),
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Archive(e) => write!(f, "{}", e),
            CliError::Deploy(DeployError::Upload { status, body }) => {
                write!(f, "deploy rejected by server ({}): {}", status, body)
            }
            CliError::Deploy(e) => write!(f, "deploy failed: {}", e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::ConfigFile(e) => Some(e),
            CliError::Archive(e) => Some(e),
            CliError::Deploy(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ArchiveError> for CliError {
    fn from(e: ArchiveError) -> Self {
        CliError::Archive(e)
    }
}

impl From<DeployError> for CliError {
    fn from(e: DeployError) -> Self {
        CliError::Deploy(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
