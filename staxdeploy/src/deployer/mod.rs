//! Application deployment.
//!
//! The [`Deployer`] trait splits a deploy into two halves:
//!
//! - [`Deployer::deploy`] (provided) reads the descriptor out of the package,
//!   completes credentials and resolves the [`DeploymentIdentity`];
//! - [`Deployer::invoke_deploy`] (implemented per transport) performs the
//!   actual upload.
//!
//! [`RemoteHttpDeployer`] is the production transport. Callers obtain
//! deployers through a [`DeployerFactory`] so tests can substitute their own.
//!
//! # Example
//!
//! ```ignore
//! use staxdeploy::deployer::{DeployConfig, DeployRequest, DeployerFactory, RemoteDeployerFactory};
//! use staxdeploy::identity::ScriptedInput;
//!
//! let factory = RemoteDeployerFactory::new(DeployConfig::default());
//! let deployer = factory.create_deployer()?;
//! let request = DeployRequest::new("api.stax.net", "target/stax-deploy.zip")
//!     .with_app_id("acme/site")
//!     .with_credentials("bob", "secret");
//! let result = deployer.deploy(&request, &mut ScriptedInput::empty(), &mut |_: ProgressEvent| {})?;
//! println!("{}", result.body);
//! ```

mod config;
mod error;
mod factory;
mod multipart;
mod pipe;
mod progress;
mod remote;
mod state;

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{for_each_entry_in_file, ArchiveError};
use crate::descriptor::{AppDescriptor, DESCRIPTOR_ENTRIES};
use crate::identity::{Credentials, DeploymentIdentity, IdentityRequest, InputProvider};

pub use config::{DeployConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PIPE_DEPTH, DEFAULT_SERVER};
pub use error::{DeployError, DeployResult};
pub use factory::{DeployerFactory, RemoteDeployerFactory};
pub use multipart::MultipartForm;
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use progress::{ProgressEvent, ProgressSink, ProgressTrackingUploadStream};
pub use remote::{RemoteHttpDeployer, ServerAddress};
pub use state::{DeployLifecycle, DeployState};

/// Everything a caller supplies for one deploy.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// `host` or `host:port` of the hosting API.
    pub server: String,
    /// Application id, plain or qualified as `domain/app`.
    pub app_id: Option<String>,
    pub domain: Option<String>,
    /// Domain used when the id is unqualified and no domain is given.
    /// Falls back to the username when unset.
    pub default_domain: Option<String>,
    /// Comma-separated explicit environments.
    pub environments: String,
    /// The deployment package (zip or war).
    pub package: PathBuf,
    /// Optional source archive uploaded alongside the package.
    pub source_package: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Free-text deploy message.
    pub description: Option<String>,
}

impl DeployRequest {
    pub fn new(server: impl Into<String>, package: impl Into<PathBuf>) -> Self {
        Self {
            server: server.into(),
            package: package.into(),
            ..Default::default()
        }
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_default_domain(mut self, domain: impl Into<String>) -> Self {
        self.default_domain = Some(domain.into());
        self
    }

    pub fn with_environments(mut self, environments: impl Into<String>) -> Self {
        self.environments = environments.into();
        self
    }

    pub fn with_source_package(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_package = Some(path.into());
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A deploy with identity and credentials fully resolved, ready to transmit.
#[derive(Debug, Clone)]
pub struct ResolvedDeployment {
    pub server: String,
    pub identity: DeploymentIdentity,
    pub credentials: Credentials,
    pub package: PathBuf,
    pub source_package: Option<PathBuf>,
    pub description: Option<String>,
}

/// Outcome of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Whether the server answered 200.
    pub success: bool,
    pub status: u16,
    /// Response body, the server's human-readable message.
    pub body: String,
    /// Request body bytes written.
    pub bytes_written: u64,
    /// File bytes the upload was expected to carry.
    pub expected_bytes: u64,
}

impl UploadResult {
    /// Convert a non-success result into [`DeployError::Upload`].
    pub fn into_result(self) -> DeployResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(DeployError::Upload {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Read the first descriptor entry out of a deployment package.
///
/// Returns `None` when the package has no descriptor.
pub fn load_descriptor(package: &Path) -> Result<Option<AppDescriptor>, ArchiveError> {
    let mut descriptor: Option<AppDescriptor> = None;

    for_each_entry_in_file(package, |info, content| {
        if descriptor.is_some() || !DESCRIPTOR_ENTRIES.contains(&info.name.as_str()) {
            return Ok(());
        }

        let mut xml = String::new();
        content
            .read_to_string(&mut xml)
            .map_err(|e| ArchiveError::StreamFailed {
                entry: info.name.clone(),
                source: e,
            })?;

        let parsed = AppDescriptor::parse(&xml).map_err(|e| ArchiveError::Descriptor {
            entry: info.name.clone(),
            source: e,
        })?;
        debug!(entry = %info.name, "Loaded application descriptor");
        descriptor = Some(parsed);
        Ok(())
    })?;

    Ok(descriptor)
}

/// Deploys a packaged application.
pub trait Deployer {
    /// Transmit a resolved deployment.
    ///
    /// Returns the raw upload outcome; a non-200 answer is reported as
    /// `success == false`, not as an error.
    fn invoke_deploy(
        &self,
        deployment: &ResolvedDeployment,
        progress: &mut dyn ProgressSink,
    ) -> DeployResult<UploadResult>;

    /// Resolve and deploy `request`.
    ///
    /// Missing credentials or application id are requested from `input`.
    /// A non-200 answer becomes [`DeployError::Upload`].
    fn deploy(
        &self,
        request: &DeployRequest,
        input: &mut dyn InputProvider,
        progress: &mut dyn ProgressSink,
    ) -> DeployResult<UploadResult> {
        let mut lifecycle = DeployLifecycle::new();
        lifecycle.advance(DeployState::ResolvingIdentity)?;

        let resolved = lifecycle.track(resolve_deployment(request, input))?;

        info!(
            application = %resolved.identity.qualified_id(),
            environment = %resolved.identity.environment_field(),
            "Deploying application"
        );

        lifecycle.advance(DeployState::Uploading)?;
        let result = lifecycle.track(
            self.invoke_deploy(&resolved, progress)
                .and_then(UploadResult::into_result),
        )?;

        lifecycle.advance(DeployState::Completed)?;
        info!(
            application = %resolved.identity.qualified_id(),
            bytes = result.bytes_written,
            "Deploy complete"
        );
        Ok(result)
    }
}

fn resolve_deployment(
    request: &DeployRequest,
    input: &mut dyn InputProvider,
) -> DeployResult<ResolvedDeployment> {
    let descriptor = load_descriptor(&request.package)?;

    let credentials = Credentials::resolve(
        request.username.as_deref(),
        request.password.as_deref(),
        input,
    )?;

    let default_domain = request
        .default_domain
        .as_deref()
        .unwrap_or(&credentials.username);

    let identity = DeploymentIdentity::resolve(
        &IdentityRequest {
            app_id: request.app_id.as_deref(),
            domain: request.domain.as_deref(),
            default_domain: Some(default_domain),
            environments: &request.environments,
        },
        descriptor.as_ref(),
        input,
    )?;

    Ok(ResolvedDeployment {
        server: request.server.clone(),
        identity,
        credentials,
        package: request.package.clone(),
        source_package: request.source_package.clone(),
        description: request.description.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use crate::identity::ScriptedInput;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct RecordingDeployer {
        seen: RefCell<Vec<ResolvedDeployment>>,
        status: u16,
    }

    impl RecordingDeployer {
        fn answering(status: u16) -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                status,
            }
        }
    }

    impl Deployer for RecordingDeployer {
        fn invoke_deploy(
            &self,
            deployment: &ResolvedDeployment,
            _progress: &mut dyn ProgressSink,
        ) -> DeployResult<UploadResult> {
            self.seen.borrow_mut().push(deployment.clone());
            Ok(UploadResult {
                success: self.status == 200,
                status: self.status,
                body: format!("status {}", self.status),
                bytes_written: 0,
                expected_bytes: 0,
            })
        }
    }

    fn package(temp: &TempDir, entries: &[(&str, &str)]) -> PathBuf {
        let path = temp.path().join("stax-deploy.zip");
        let mut builder = ArchiveBuilder::create(&path).unwrap();
        for (name, content) in entries {
            builder.add_stream(content.as_bytes(), name).unwrap();
        }
        builder.finish().unwrap();
        path
    }

    #[test]
    fn test_load_descriptor_first_match_wins() {
        let temp = TempDir::new().unwrap();
        let path = package(
            &temp,
            &[
                ("webapp.war", "war"),
                (
                    "WEB-INF/stax-web.xml",
                    "<stax-web-app><appid>acme/web</appid></stax-web-app>",
                ),
                (
                    "META-INF/stax-application.xml",
                    "<stax-application><appid>acme/app</appid></stax-application>",
                ),
            ],
        );

        let descriptor = load_descriptor(&path).unwrap().unwrap();
        assert_eq!(descriptor.application_id(), Some("acme/web"));
    }

    #[test]
    fn test_load_descriptor_absent() {
        let temp = TempDir::new().unwrap();
        let path = package(&temp, &[("webapp.war", "war")]);
        assert!(load_descriptor(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_descriptor_malformed() {
        let temp = TempDir::new().unwrap();
        let path = package(&temp, &[("META-INF/stax-application.xml", "<broken")]);
        let err = load_descriptor(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::Descriptor { .. }));
    }

    #[test]
    fn test_deploy_qualified_id_without_prompt() {
        let temp = TempDir::new().unwrap();
        let path = package(&temp, &[("webapp.war", "war")]);
        let deployer = RecordingDeployer::answering(200);
        let mut input = ScriptedInput::empty();

        let request = DeployRequest::new("localhost:8080", &path)
            .with_app_id("acme/site")
            .with_credentials("bob", "secret");
        let result = deployer.deploy(&request, &mut input, &mut |_: ProgressEvent| {}).unwrap();

        assert!(result.success);
        assert!(input.prompts().is_empty());
        let seen = deployer.seen.borrow();
        assert_eq!(seen[0].identity.domain, "acme");
        assert_eq!(seen[0].identity.application_id, "site");
        assert_eq!(seen[0].identity.environment_field(), "");
    }

    #[test]
    fn test_deploy_defaults_domain_to_username() {
        let temp = TempDir::new().unwrap();
        let path = package(&temp, &[("webapp.war", "war")]);
        let deployer = RecordingDeployer::answering(200);
        let mut input = ScriptedInput::new(["carol", "pw"]);

        let request = DeployRequest::new("localhost", &path).with_app_id("site");
        deployer.deploy(&request, &mut input, &mut |_: ProgressEvent| {}).unwrap();

        let seen = deployer.seen.borrow();
        assert_eq!(seen[0].identity.qualified_id(), "carol/site");
        assert_eq!(seen[0].credentials.password, "pw");
    }

    #[test]
    fn test_deploy_non_success_is_upload_error() {
        let temp = TempDir::new().unwrap();
        let path = package(&temp, &[("webapp.war", "war")]);
        let deployer = RecordingDeployer::answering(403);

        let request = DeployRequest::new("localhost", &path)
            .with_app_id("acme/site")
            .with_credentials("bob", "secret");
        let err = deployer
            .deploy(&request, &mut ScriptedInput::empty(), &mut |_: ProgressEvent| {})
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "status 403");
    }

    #[test]
    fn test_deploy_unreadable_package() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("not-a-zip.war");
        std::fs::write(&path, b"plain text").unwrap();
        let deployer = RecordingDeployer::answering(200);

        let request = DeployRequest::new("localhost", &path)
            .with_app_id("acme/site")
            .with_credentials("bob", "secret");
        let err = deployer
            .deploy(&request, &mut ScriptedInput::empty(), &mut |_: ProgressEvent| {})
            .unwrap_err();
        assert!(matches!(err, DeployError::Archive(_)));
        assert!(deployer.seen.borrow().is_empty());
    }
}
