//! HTTP transport for deployments.
//!
//! Uploads the package as a `multipart/form-data` POST to
//! `http://{server}/api/applications/{domain}/{app_id}` with preemptive
//! basic authentication.
//!
//! The request body is encoded on the calling thread and handed to the HTTP
//! client through a bounded [`pipe`](super::pipe::pipe), while the exchange
//! itself runs on a scoped helper thread. Progress events therefore fire on
//! the caller's thread as the client consumes the body.

use std::error::Error;
use std::fmt;
use std::io;
use std::thread;

use reqwest::blocking::{Body, Client};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use super::config::DeployConfig;
use super::error::{DeployError, DeployResult};
use super::multipart::MultipartForm;
use super::pipe::pipe;
use super::progress::{ProgressSink, ProgressTrackingUploadStream};
use super::{Deployer, ResolvedDeployment, UploadResult};
use crate::identity::ResolutionError;

const DEFAULT_HTTP_PORT: u16 = 80;

/// Host and port of the hosting API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Parse `host` or `host:port`. The port defaults to 80.
    pub fn parse(server: &str) -> Result<Self, ResolutionError> {
        let server = server.trim();
        let (host, port) = match server.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ResolutionError(format!("invalid port '{}' in server '{}'", port, server))
                })?;
                (host, port)
            }
            None => (server, DEFAULT_HTTP_PORT),
        };

        if host.is_empty() {
            return Err(ResolutionError(format!("no host in server '{}'", server)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Deploy endpoint for `domain/app_id`.
    pub fn deploy_url(&self, domain: &str, app_id: &str) -> String {
        format!("http://{}/api/applications/{}/{}", self, domain, app_id)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Build the upload form. Field order is fixed.
pub(crate) fn build_form(deployment: &ResolvedDeployment) -> DeployResult<MultipartForm> {
    let identity = &deployment.identity;
    let mut form = MultipartForm::new();

    form.add_file("app_package", &deployment.package)?;
    if let Some(source) = &deployment.source_package {
        form.add_file("app_src", source)?;
    }

    form.add_text("appid", &identity.application_id);
    form.add_text("domain", &identity.domain);

    let environment = identity.environment_field();
    if !environment.is_empty() {
        form.add_text("environment", &environment);
    }
    if let Some(description) = &deployment.description {
        form.add_text("description", description);
    }

    Ok(form)
}

/// Render a reqwest error with its source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Deployer that uploads to the hosting API over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteHttpDeployer {
    client: Client,
    config: DeployConfig,
}

impl RemoteHttpDeployer {
    /// Create a deployer with the given transport settings.
    pub fn new(config: DeployConfig) -> DeployResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }
}

impl Deployer for RemoteHttpDeployer {
    fn invoke_deploy(
        &self,
        deployment: &ResolvedDeployment,
        progress: &mut dyn ProgressSink,
    ) -> DeployResult<UploadResult> {
        let address = ServerAddress::parse(&deployment.server)?;
        let identity = &deployment.identity;
        let url = address.deploy_url(&identity.domain, &identity.application_id);

        let form = build_form(deployment)?;
        let expected_bytes = form.file_bytes();
        let content_length = form.content_length();
        debug!(fields = ?form.field_names(), "Multipart form assembled");

        let (writer, reader) = pipe(self.config.pipe_depth);
        let request = self
            .client
            .post(&url)
            .basic_auth(
                &deployment.credentials.username,
                Some(&deployment.credentials.password),
            )
            .header(CONTENT_TYPE, form.content_type())
            .body(Body::sized(reader, content_length));

        info!(url = %url, bytes = content_length, "Uploading deployment package");

        let (exchange, write_result, bytes_written) = thread::scope(|scope| {
            let handle = scope.spawn(move || -> Result<(u16, String), reqwest::Error> {
                let response = request.send()?;
                let status = response.status().as_u16();
                let body = response.text()?;
                Ok((status, body))
            });

            let mut upload = ProgressTrackingUploadStream::new(writer, &mut *progress, expected_bytes);
            let write_result = form.write_to(&mut upload);
            let bytes_written = upload.bytes_written();
            drop(upload);

            (handle.join(), write_result, bytes_written)
        });

        let exchange = exchange
            .map_err(|_| DeployError::Transport("upload thread panicked".to_string()))?;

        if let Err(e) = &write_result {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(DeployError::Transport(format!(
                    "failed to stream request body: {}",
                    e
                )));
            }
        }

        let (status, body) = exchange.map_err(|e| DeployError::Transport(describe(&e)))?;
        let success = status == 200;

        if success {
            info!(response = %body, "Deploy complete");
        } else {
            warn!(status, response = %body, "Deploy failed");
        }

        Ok(UploadResult {
            success,
            status,
            body,
            bytes_written,
            expected_bytes,
        })
    }
}
