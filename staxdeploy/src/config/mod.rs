//! Configuration: the INI config file, named overrides, and the layering of
//! explicit values, overrides and defaults into deploy parameters.

mod file;
mod keys;
mod overrides;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use file::{config_file_path, ConfigFile, DeploySettings, LoggingSettings};
pub use keys::ConfigKey;
pub use overrides::{
    env_var_name, override_name, EnvOverrides, MapOverrides, OverrideSource, OVERRIDABLE,
    OVERRIDE_PREFIX,
};

/// Errors that can occur while handling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read or parsed.
    #[error("failed to read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The config file could not be written.
    #[error("failed to write config file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// A setting has a value of the wrong form.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// No such `section.key`.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    /// A `--define` flag without `name=value` form.
    #[error("invalid definition '{0}', expected name=value")]
    InvalidDefine(String),
}

/// Layer a parameter: an override beats the explicit value, which beats the
/// default.
pub fn resolve<T>(explicit: Option<T>, overridden: Option<T>, default: Option<T>) -> Option<T> {
    overridden.or(explicit).or(default)
}

/// Deploy parameters that can be given on the command line, overridden by
/// name, and defaulted from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployParameters {
    pub app_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub server: Option<String>,
    pub environment: Option<String>,
    pub message: Option<String>,
}

impl DeployParameters {
    /// Apply overrides and config file defaults to explicitly given values.
    pub fn resolve(self, overrides: &dyn OverrideSource, config: &ConfigFile) -> Self {
        let lookup = |short: &str| overrides.lookup(&override_name(short));
        let deploy = &config.deploy;

        Self {
            app_id: resolve(self.app_id, lookup("appid"), None),
            username: resolve(self.username, lookup("username"), deploy.username.clone()),
            password: resolve(self.password, lookup("password"), deploy.password.clone()),
            server: resolve(self.server, lookup("server"), Some(deploy.server.clone())),
            environment: resolve(
                self.environment,
                lookup("environment"),
                deploy.environment.clone(),
            ),
            message: resolve(self.message, lookup("message"), None),
        }
    }
}
