//! staxdeploy CLI - Command-line interface
//!
//! Packages web applications and deploys them to the Stax hosting platform
//! through the `staxdeploy` library.

mod commands;
mod console;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use staxdeploy::config::ConfigFile;
use staxdeploy::logging::{init_logging, LogOptions};
use tracing::warn;

use commands::config::ConfigCommands;
use commands::deploy::DeployArgs;
use commands::package::PackageArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "staxdeploy")]
#[command(version, about = "Package and deploy web applications to Stax", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file (defaults to logging.file)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the deployment package and deploy it
    Deploy(DeployArgs),

    /// Build the deployment package only
    Package(PackageArgs),

    /// Extract every entry of an archive into a directory
    Extract {
        /// Archive to extract
        archive: PathBuf,
        /// Target directory
        target: PathBuf,
    },

    /// List the entries of an archive
    List {
        /// Archive to list
        archive: PathBuf,
    },

    /// View or change configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Deploy(args) => commands::deploy::run(args),
        Commands::Package(args) => commands::package::run(args),
        Commands::Extract { archive, target } => commands::archive::run_extract(&archive, &target),
        Commands::List { archive } => commands::archive::run_list(&archive),
        Commands::Config(command) => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = ConfigFile::load();
    let log_file = cli.log_file.clone().or_else(|| {
        config
            .as_ref()
            .ok()
            .and_then(|c| c.logging.file.clone())
    });

    let guard = match init_logging(&LogOptions::new(cli.verbose).with_file(log_file)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", CliError::from(e));
            process::exit(1);
        }
    };

    if let Err(e) = &config {
        warn!(error = %e, "Ignoring unreadable config file");
    }

    let code = match run(cli.command) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // Flush the file appender before exiting.
    drop(guard);
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy_flags() {
        let cli = Cli::try_parse_from([
            "staxdeploy",
            "-v",
            "deploy",
            "--war",
            "target/app.war",
            "--appid",
            "acme/site",
            "--environment",
            "prod,qa",
            "-D",
            "bees.message=hotfix",
            "--define",
            "bees.server=localhost:8080",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.package.war, Some(PathBuf::from("target/app.war")));
        assert_eq!(
            args.package.app_config,
            PathBuf::from("src/main/config/stax-application.xml")
        );
        assert_eq!(args.appid.as_deref(), Some("acme/site"));
        assert_eq!(args.environment.as_deref(), Some("prod,qa"));
        assert_eq!(
            args.defines,
            vec!["bees.message=hotfix", "bees.server=localhost:8080"]
        );
    }

    #[test]
    fn test_package_requires_war_or_webapp() {
        assert!(Cli::try_parse_from(["staxdeploy", "package"]).is_err());
        assert!(Cli::try_parse_from(["staxdeploy", "package", "--webapp", "web"]).is_ok());
        assert!(Cli::try_parse_from([
            "staxdeploy",
            "package",
            "--war",
            "a.war",
            "--webapp",
            "web"
        ])
        .is_err());
    }

    #[test]
    fn test_global_log_file_after_subcommand() {
        let cli = Cli::try_parse_from(["staxdeploy", "list", "bundle.zip", "--log-file", "x.log"])
            .unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("x.log")));
        assert!(matches!(cli.command, Commands::List { .. }));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
