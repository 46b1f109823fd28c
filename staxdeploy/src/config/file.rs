//! INI configuration file.
//!
//! ```ini
//! [deploy]
//! server = api.stax.net
//! username = bob
//! password = secret
//! environment = prod
//! connect_timeout_ms = 500
//! output = stax-deploy.zip
//!
//! [logging]
//! file = /var/log/staxdeploy.log
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::debug;

use super::ConfigError;
use crate::deployer::{DeployConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SERVER};
use crate::package::DEFAULT_PACKAGE_NAME;

pub(crate) const DEPLOY_SECTION: &str = "deploy";
pub(crate) const LOGGING_SECTION: &str = "logging";

/// Location of the user configuration file.
///
/// `<config dir>/staxdeploy/config.ini`, falling back to the working
/// directory when the platform has no configuration directory.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("staxdeploy")
        .join("config.ini")
}

/// `[deploy]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub server: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub environment: Option<String>,
    pub connect_timeout_ms: u64,
    pub output: PathBuf,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            username: None,
            password: None,
            environment: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            output: PathBuf::from(DEFAULT_PACKAGE_NAME),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub deploy: DeploySettings,
    pub logging: LoggingSettings,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_timeout(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            key: format!("{}.connect_timeout_ms", DEPLOY_SECTION),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl ConfigFile {
    /// Load the user configuration file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();

        if let Some(section) = ini.section(Some(DEPLOY_SECTION)) {
            if let Some(server) = non_empty(section.get("server")) {
                config.deploy.server = server;
            }
            config.deploy.username = non_empty(section.get("username"));
            config.deploy.password = non_empty(section.get("password"));
            config.deploy.environment = non_empty(section.get("environment"));
            if let Some(timeout) = non_empty(section.get("connect_timeout_ms")) {
                config.deploy.connect_timeout_ms = parse_timeout(&timeout)?;
            }
            if let Some(output) = non_empty(section.get("output")) {
                config.deploy.output = PathBuf::from(output);
            }
        }

        if let Some(section) = ini.section(Some(LOGGING_SECTION)) {
            config.logging.file = non_empty(section.get("file")).map(PathBuf::from);
        }

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Save to the user configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories. Unset values are omitted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_failed = |e: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let deploy = &self.deploy;
        let mut entries: Vec<(&str, String)> = vec![
            ("server", deploy.server.clone()),
            ("connect_timeout_ms", deploy.connect_timeout_ms.to_string()),
            ("output", deploy.output.to_string_lossy().into_owned()),
        ];
        for (key, value) in [
            ("username", &deploy.username),
            ("password", &deploy.password),
            ("environment", &deploy.environment),
        ] {
            if let Some(value) = value {
                entries.push((key, value.clone()));
            }
        }

        let mut ini = Ini::new();
        for (key, value) in entries {
            ini.with_section(Some(DEPLOY_SECTION)).set(key, value);
        }
        if let Some(file) = &self.logging.file {
            ini.with_section(Some(LOGGING_SECTION))
                .set("file", file.to_string_lossy().into_owned());
        }

        ini.write_to_file(path).map_err(write_failed)
    }

    /// Transport settings derived from the `[deploy]` section.
    pub fn deploy_config(&self) -> DeployConfig {
        DeployConfig::new().with_connect_timeout(Duration::from_millis(self.deploy.connect_timeout_ms))
    }
}
