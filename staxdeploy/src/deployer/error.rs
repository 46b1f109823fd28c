//! Error types for deploy operations.

use thiserror::Error;

use super::state::DeployState;
use crate::archive::ArchiveError;
use crate::identity::ResolutionError;

/// Result type for deploy operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while deploying an application.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Application id, domain, credentials or server could not be determined.
    #[error("{0}")]
    ConfigResolution(#[from] ResolutionError),

    /// The server answered with a non-success status.
    ///
    /// Displays as the response body, which is the server's own message.
    #[error("{body}")]
    Upload { status: u16, body: String },

    /// Connection, timeout or socket failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The deployment package could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A deploy state transition that the lifecycle does not allow.
    #[error("invalid deploy state transition from {from} to {to}")]
    InvalidTransition { from: DeployState, to: DeployState },
}

impl DeployError {
    /// HTTP status code for upload failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upload { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DeployError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
