//! Named overrides for deploy parameters.
//!
//! Parameters can be overridden by name (`bees.appid`, `bees.username`, ...)
//! from `--define name=value` flags or from environment variables
//! (`BEES_APPID`, `BEES_USERNAME`, ...). Overrides take precedence over
//! explicitly passed values.

use std::collections::HashMap;
use std::env;

use super::ConfigError;

/// Prefix of every override name.
pub const OVERRIDE_PREFIX: &str = "bees";

/// Short names of the overridable parameters.
pub const OVERRIDABLE: &[&str] = &["appid", "username", "password", "server", "environment", "message"];

/// Full override name for a short parameter name, e.g. `bees.appid`.
pub fn override_name(short: &str) -> String {
    format!("{}.{}", OVERRIDE_PREFIX, short)
}

/// Environment variable for an override name, e.g. `BEES_APPID`.
pub fn env_var_name(name: &str) -> String {
    name.to_uppercase().replace('.', "_")
}

/// Something that can supply override values by name.
pub trait OverrideSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Overrides read from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvOverrides;

impl OverrideSource for EnvOverrides {
    fn lookup(&self, name: &str) -> Option<String> {
        env::var(env_var_name(name)).ok()
    }
}

/// Overrides held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapOverrides {
    values: HashMap<String, String>,
}

impl MapOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Parse `name=value` definitions. Later definitions win.
    pub fn from_defines<I, S>(defines: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = HashMap::new();
        for define in defines {
            let define = define.as_ref();
            let (name, value) = define
                .split_once('=')
                .filter(|(name, _)| !name.trim().is_empty())
                .ok_or_else(|| ConfigError::InvalidDefine(define.to_string()))?;
            values.insert(name.trim().to_string(), value.to_string());
        }
        Ok(Self { values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl OverrideSource for MapOverrides {
    fn lookup(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Two sources chained; the first one that has a value wins.
impl<A: OverrideSource, B: OverrideSource> OverrideSource for (A, B) {
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.lookup(name).or_else(|| self.1.lookup(name))
    }
}
