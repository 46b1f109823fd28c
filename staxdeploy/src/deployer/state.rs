//! Deploy lifecycle state.
//!
//! ```text
//! Idle -> ResolvingIdentity -> Uploading -> Completed
//!              |                  |
//!              +------------------+--> Failed
//! ```
//!
//! `Completed` and `Failed` are terminal. There is no retry.

use std::fmt;

use tracing::debug;

use super::error::{DeployError, DeployResult};

/// Phase of a single deploy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    /// Nothing has happened yet.
    Idle,
    /// Reading the descriptor and resolving identity and credentials.
    ResolvingIdentity,
    /// Streaming the package to the server.
    Uploading,
    /// The server accepted the deploy.
    Completed,
    /// The deploy failed.
    Failed,
}

impl DeployState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn can_transition_to(&self, next: DeployState) -> bool {
        use DeployState::*;
        matches!(
            (self, next),
            (Idle, ResolvingIdentity)
                | (ResolvingIdentity, Uploading)
                | (ResolvingIdentity, Failed)
                | (Uploading, Completed)
                | (Uploading, Failed)
        )
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ResolvingIdentity => "resolving-identity",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one deploy invocation.
#[derive(Debug)]
pub struct DeployLifecycle {
    state: DeployState,
}

impl Default for DeployLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployLifecycle {
    pub fn new() -> Self {
        Self {
            state: DeployState::Idle,
        }
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: DeployState) -> DeployResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(DeployError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "Deploy state transition");
        self.state = next;
        Ok(())
    }

    /// Record the outcome of `result`, moving to `Failed` on error.
    ///
    /// The error is returned unchanged.
    pub fn track<T>(&mut self, result: DeployResult<T>) -> DeployResult<T> {
        if result.is_err() && !self.state.is_terminal() && self.state != DeployState::Idle {
            debug!(from = %self.state, to = %DeployState::Failed, "Deploy state transition");
            self.state = DeployState::Failed;
        }
        result
    }
}
