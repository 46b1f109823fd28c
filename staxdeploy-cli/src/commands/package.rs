//! `package` command: assemble the deployment archive without uploading it.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use staxdeploy::config::ConfigFile;
use staxdeploy::package::{
    build_deployment_package, build_war_from_directory, DeploymentPackage, PackageSources,
};

use crate::error::CliError;

/// Inputs of the deployment package, shared with `deploy`.
#[derive(Debug, Clone, Args)]
pub struct PackageArgs {
    /// Web application archive to deploy
    #[arg(long, value_name = "PATH", required_unless_present = "webapp", conflicts_with = "webapp")]
    pub war: Option<PathBuf>,

    /// Exploded web application directory, packed into a war first
    #[arg(long, value_name = "DIR")]
    pub webapp: Option<PathBuf>,

    /// Application descriptor
    #[arg(long, value_name = "PATH", default_value = "src/main/config/stax-application.xml")]
    pub app_config: PathBuf,

    /// Container descriptor
    #[arg(long, value_name = "PATH", default_value = "src/main/config/application.xml")]
    pub appxml: PathBuf,

    /// Where to write the bundled package (defaults to deploy.output)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl PackageArgs {
    fn output_path(&self, config: &ConfigFile) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| config.deploy.output.clone())
    }

    /// The war to package, packing `--webapp` first when given.
    fn war_path(&self, output: &Path) -> Result<PathBuf, CliError> {
        if let Some(war) = &self.war {
            return Ok(war.clone());
        }
        let dir = self
            .webapp
            .as_ref()
            .ok_or_else(|| CliError::Config("either --war or --webapp is required".to_string()))?;

        let war = output.with_extension("war");
        if let Some(parent) = war.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CliError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let count = build_war_from_directory(dir, &war)?;
        println!(
            "Packed {} entries from {} into {}",
            count,
            dir.display(),
            war.display()
        );
        Ok(war)
    }

    /// Build the deployment package.
    pub fn build(&self, config: &ConfigFile) -> Result<DeploymentPackage, CliError> {
        let output = self.output_path(config);
        let war = self.war_path(&output)?;
        let sources = PackageSources::new(war, &self.app_config, &self.appxml);
        Ok(build_deployment_package(&sources, &output)?)
    }
}

/// Run the package command.
pub fn run(args: PackageArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let package = args.build(&config)?;

    if package.bundled {
        println!("Created deployment package {}", package.path.display());
    } else {
        println!(
            "Descriptors not found, the war would be deployed as is: {}",
            package.path.display()
        );
    }
    Ok(())
}
