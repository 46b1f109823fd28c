//! `deploy` command: package the application and upload it.

use std::path::{Path, PathBuf};

use clap::Args;
use staxdeploy::config::{ConfigFile, DeployParameters, EnvOverrides, MapOverrides};
use staxdeploy::deployer::{DeployRequest, DeployerFactory, RemoteDeployerFactory, DEFAULT_SERVER};
use tracing::debug;

use super::package::PackageArgs;
use crate::console::{ConsoleInput, ProgressBarSink};
use crate::error::CliError;

/// Deploy arguments.
#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    /// Source archive uploaded alongside the package
    #[arg(long, value_name = "PATH")]
    pub source: Option<PathBuf>,

    /// Application id, plain or qualified as domain/app
    #[arg(long)]
    pub appid: Option<String>,

    /// Domain for an unqualified application id
    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Comma-separated environments to deploy to
    #[arg(long)]
    pub environment: Option<String>,

    /// Deploy message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Hosting API host, optionally with :port
    #[arg(long)]
    pub server: Option<String>,

    /// Override a parameter by name, e.g. bees.appid=acme/site
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE")]
    pub defines: Vec<String>,
}

impl DeployArgs {
    fn explicit_parameters(&self) -> DeployParameters {
        DeployParameters {
            app_id: self.appid.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            server: self.server.clone(),
            environment: self.environment.clone(),
            message: self.message.clone(),
        }
    }
}

fn build_request(
    params: DeployParameters,
    domain: Option<String>,
    source: Option<PathBuf>,
    package: &Path,
) -> DeployRequest {
    let server = params.server.unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let mut request = DeployRequest::new(server, package);
    request.app_id = params.app_id;
    request.domain = domain;
    request.environments = params.environment.unwrap_or_default();
    request.source_package = source;
    request.username = params.username;
    request.password = params.password;
    request.description = params.message;
    request
}

/// Run the deploy command.
pub fn run(args: DeployArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let overrides = (MapOverrides::from_defines(&args.defines)?, EnvOverrides);
    let params = args.explicit_parameters().resolve(&overrides, &config);

    let package = args.package.build(&config)?;
    debug!(package = %package.path.display(), bundled = package.bundled, "Package ready");

    let request = build_request(params, args.domain.clone(), args.source.clone(), &package.path);

    let factory = RemoteDeployerFactory::new(config.deploy_config());
    let deployer = factory.create_deployer()?;

    let mut input = ConsoleInput::new();
    let mut progress = ProgressBarSink::new();
    let outcome = deployer.deploy(&request, &mut input, &mut progress);
    progress.finish();

    let result = outcome?;
    println!("{}", result.body);
    Ok(())
}
