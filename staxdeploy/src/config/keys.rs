//! Addressable configuration keys for `config get|set|list`.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{parse_timeout, ConfigFile, DEPLOY_SECTION, LOGGING_SECTION};
use super::ConfigError;

/// A `section.key` setting in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DeployServer,
    DeployUsername,
    DeployPassword,
    DeployEnvironment,
    DeployConnectTimeoutMs,
    DeployOutput,
    LoggingFile,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::DeployServer,
            ConfigKey::DeployUsername,
            ConfigKey::DeployPassword,
            ConfigKey::DeployEnvironment,
            ConfigKey::DeployConnectTimeoutMs,
            ConfigKey::DeployOutput,
            ConfigKey::LoggingFile,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::LoggingFile => LOGGING_SECTION,
            _ => DEPLOY_SECTION,
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::DeployServer => "server",
            ConfigKey::DeployUsername => "username",
            ConfigKey::DeployPassword => "password",
            ConfigKey::DeployEnvironment => "environment",
            ConfigKey::DeployConnectTimeoutMs => "connect_timeout_ms",
            ConfigKey::DeployOutput => "output",
            ConfigKey::LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Whether the value should be masked when displayed.
    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::DeployPassword)
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let deploy = &config.deploy;
        match self {
            ConfigKey::DeployServer => deploy.server.clone(),
            ConfigKey::DeployUsername => deploy.username.clone().unwrap_or_default(),
            ConfigKey::DeployPassword => deploy.password.clone().unwrap_or_default(),
            ConfigKey::DeployEnvironment => deploy.environment.clone().unwrap_or_default(),
            ConfigKey::DeployConnectTimeoutMs => deploy.connect_timeout_ms.to_string(),
            ConfigKey::DeployOutput => deploy.output.to_string_lossy().into_owned(),
            ConfigKey::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Set the value. An empty value clears optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let optional = || (!value.is_empty()).then(|| value.to_string());
        let required = || {
            if value.is_empty() {
                Err(ConfigError::InvalidValue {
                    key: self.name(),
                    value: value.to_string(),
                    reason: "value must not be empty".to_string(),
                })
            } else {
                Ok(value.to_string())
            }
        };

        match self {
            ConfigKey::DeployServer => config.deploy.server = required()?,
            ConfigKey::DeployUsername => config.deploy.username = optional(),
            ConfigKey::DeployPassword => config.deploy.password = optional(),
            ConfigKey::DeployEnvironment => config.deploy.environment = optional(),
            ConfigKey::DeployConnectTimeoutMs => {
                config.deploy.connect_timeout_ms = parse_timeout(value)?
            }
            ConfigKey::DeployOutput => config.deploy.output = PathBuf::from(required()?),
            ConfigKey::LoggingFile => config.logging.file = optional().map(PathBuf::from),
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
