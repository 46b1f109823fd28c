//! Application descriptor parsing.
//!
//! A descriptor is an XML file shipped inside the deployment package
//! (`META-INF/stax-application.xml` or `WEB-INF/stax-web.xml`) that declares
//! the application id, a default environment, and per-environment
//! parameters:
//!
//! ```xml
//! <stax-application>
//!   <appid>acme/site</appid>
//!   <default-environment>prod</default-environment>
//!   <param name="greeting" value="hello"/>
//!   <environment name="prod">
//!     <param name="db.url" value="jdbc:mysql://db/prod"/>
//!   </environment>
//! </stax-application>
//! ```
//!
//! The root element name is not checked.

use std::collections::BTreeMap;
use std::io::Read;

use quick_xml::de::from_str;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Entry names that hold a descriptor. The first match in archive order wins.
pub const DESCRIPTOR_ENTRIES: [&str; 2] = ["META-INF/stax-application.xml", "WEB-INF/stax-web.xml"];

/// Errors that can occur while parsing a descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Descriptor content could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor is not valid XML or does not match the expected layout.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::DeError),
}

#[derive(Debug, Default, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    appid: Option<String>,

    #[serde(rename = "default-environment", default)]
    default_environment: Option<String>,

    #[serde(rename = "param", default)]
    params: Vec<RawParam>,

    #[serde(rename = "environment", default)]
    environments: Vec<RawEnvironment>,
}

#[derive(Debug, Deserialize)]
struct RawEnvironment {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "param", default)]
    params: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "@value", default)]
    value: String,
}

/// A named environment block declared by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentBlock {
    pub name: String,
    pub params: Vec<(String, String)>,
}

/// Parsed application descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppDescriptor {
    application_id: Option<String>,
    default_environment: Option<String>,
    params: Vec<(String, String)>,
    environments: Vec<EnvironmentBlock>,
}

impl AppDescriptor {
    /// Parse a descriptor from XML text.
    pub fn parse(xml: &str) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = from_str(xml)?;

        let non_empty = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            application_id: non_empty(raw.appid),
            default_environment: non_empty(raw.default_environment),
            params: raw.params.into_iter().map(|p| (p.name, p.value)).collect(),
            environments: raw
                .environments
                .into_iter()
                .map(|env| EnvironmentBlock {
                    name: env.name.trim().to_string(),
                    params: env.params.into_iter().map(|p| (p.name, p.value)).collect(),
                })
                .collect(),
        })
    }

    /// Read and parse a descriptor from a stream.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, DescriptorError> {
        let mut xml = String::new();
        reader.read_to_string(&mut xml)?;
        Self::parse(&xml)
    }

    /// The application id declared by the descriptor, if any.
    pub fn application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }

    /// The default environment declared by the descriptor, if any.
    pub fn default_environment(&self) -> Option<&str> {
        self.default_environment.as_deref()
    }

    /// Names of all declared environment blocks, in document order.
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.iter().map(|e| e.name.as_str()).collect()
    }

    fn declares(&self, name: &str) -> bool {
        self.environments.iter().any(|e| e.name == name)
    }

    /// Merge the requested environments with the descriptor's defaults.
    ///
    /// When no explicit environment was requested, the default environment
    /// (if declared) is appended to `requested`. The result keeps only names
    /// the descriptor declares, in first-seen order, without duplicates.
    pub fn applied_environments(&self, requested: &[String], explicit_requested: bool) -> Vec<String> {
        let mut candidates: Vec<&str> = requested.iter().map(String::as_str).collect();
        if !explicit_requested {
            if let Some(default) = self.default_environment() {
                candidates.push(default);
            }
        }

        let mut applied: Vec<String> = Vec::new();
        for name in candidates {
            if !self.declares(name) {
                debug!(environment = %name, "Environment not declared by descriptor, skipping");
                continue;
            }
            if !applied.iter().any(|a| a == name) {
                applied.push(name.to_string());
            }
        }
        applied
    }

    /// Global parameters overlaid with each applied environment's parameters.
    ///
    /// Later environments override earlier ones.
    pub fn effective_params(&self, applied: &[String]) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = self.params.iter().cloned().collect();
        for name in applied {
            if let Some(block) = self.environments.iter().find(|e| &e.name == name) {
                params.extend(block.params.iter().cloned());
            }
        }
        params
    }
}
