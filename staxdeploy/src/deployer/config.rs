//! Configuration for the remote deployer.

use std::time::Duration;

/// Default hosting API server.
pub const DEFAULT_SERVER: &str = "api.stax.net";

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default number of body chunks buffered between the writer and the HTTP client.
pub const DEFAULT_PIPE_DEPTH: usize = 4;

/// Transport settings for [`RemoteHttpDeployer`](super::RemoteHttpDeployer).
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// Overall request timeout. `None` waits as long as the upload takes.
    pub request_timeout: Option<Duration>,

    /// Chunks buffered in the upload pipe before the writer blocks.
    pub pipe_depth: usize,

    /// Whether proxy settings from the environment apply.
    pub use_system_proxy: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
            pipe_depth: DEFAULT_PIPE_DEPTH,
            use_system_proxy: true,
        }
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set an overall request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the upload pipe depth (at least 1).
    pub fn with_pipe_depth(mut self, depth: usize) -> Self {
        self.pipe_depth = depth.max(1);
        self
    }

    /// Enable or disable environment proxy settings.
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }
}
