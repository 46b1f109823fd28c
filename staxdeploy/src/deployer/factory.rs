//! Deployer construction.

use super::config::DeployConfig;
use super::error::DeployResult;
use super::remote::RemoteHttpDeployer;
use super::Deployer;

/// Creates deployers. Passed explicitly to whatever needs to deploy.
pub trait DeployerFactory {
    fn create_deployer(&self) -> DeployResult<Box<dyn Deployer>>;
}

/// Factory producing [`RemoteHttpDeployer`]s.
#[derive(Debug, Clone, Default)]
pub struct RemoteDeployerFactory {
    config: DeployConfig,
}

impl RemoteDeployerFactory {
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }
}

impl DeployerFactory for RemoteDeployerFactory {
    fn create_deployer(&self) -> DeployResult<Box<dyn Deployer>> {
        Ok(Box::new(RemoteHttpDeployer::new(self.config.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_factory_keeps_config() {
        let factory = RemoteDeployerFactory::new(
            DeployConfig::new().with_connect_timeout(Duration::from_secs(3)),
        );
        assert_eq!(factory.config().connect_timeout, Duration::from_secs(3));
        assert!(factory.create_deployer().is_ok());
    }
}
