//! staxdeploy - Web application packaging and deployment
//!
//! This library bundles a web application archive together with its
//! deployment descriptors, resolves which application, domain and
//! environments a deploy targets, and uploads the bundle to the hosting
//! control plane with progress reporting.
//!
//! # Architecture
//!
//! ```text
//! package::build_deployment_package
//!         │  (ArchiveBuilder)
//!         ▼
//! Deployer::deploy  ──►  descriptor (ArchiveReader + AppDescriptor)
//!         │         ──►  identity (DeploymentIdentity, Credentials)
//!         ▼
//! Deployer::invoke_deploy
//!         └── RemoteHttpDeployer ──► MultipartForm ──► ProgressTrackingUploadStream
//! ```

pub mod archive;
pub mod config;
pub mod deployer;
pub mod descriptor;
pub mod identity;
pub mod logging;
pub mod package;
