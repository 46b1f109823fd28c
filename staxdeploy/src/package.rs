//! Deployment package assembly.
//!
//! A deployment package bundles the web application archive with its
//! application descriptor and container descriptor:
//!
//! ```text
//! stax-deploy.zip
//! ├── webapp.war
//! └── META-INF/
//!     ├── stax-application.xml
//!     └── application.xml
//! ```
//!
//! When either descriptor is missing the war itself is deployed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{ArchiveBuilder, ArchiveError, ArchiveResult};

/// Entry name of the web application inside a bundle.
pub const WAR_ENTRY: &str = "webapp.war";

/// Entry name of the application descriptor inside a bundle.
pub const APP_DESCRIPTOR_ENTRY: &str = "META-INF/stax-application.xml";

/// Entry name of the container descriptor inside a bundle.
pub const CONTAINER_DESCRIPTOR_ENTRY: &str = "META-INF/application.xml";

/// Default file name of a bundled package.
pub const DEFAULT_PACKAGE_NAME: &str = "stax-deploy.zip";

/// Input files for a deployment package.
#[derive(Debug, Clone)]
pub struct PackageSources {
    /// The built web application archive.
    pub war: PathBuf,
    /// Application descriptor (`stax-application.xml`).
    pub app_descriptor: PathBuf,
    /// Container descriptor (`application.xml`).
    pub container_descriptor: PathBuf,
}

impl PackageSources {
    pub fn new(
        war: impl Into<PathBuf>,
        app_descriptor: impl Into<PathBuf>,
        container_descriptor: impl Into<PathBuf>,
    ) -> Self {
        Self {
            war: war.into(),
            app_descriptor: app_descriptor.into(),
            container_descriptor: container_descriptor.into(),
        }
    }

    /// Whether both descriptors are present, so a bundle can be built.
    pub fn can_bundle(&self) -> bool {
        self.app_descriptor.is_file() && self.container_descriptor.is_file()
    }
}

/// The package handed to the deployer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPackage {
    /// Absolute path of the package file.
    pub path: PathBuf,
    /// `true` for a bundled zip, `false` when the war is deployed directly.
    pub bundled: bool,
}

fn absolute(path: &Path) -> ArchiveResult<PathBuf> {
    fs::canonicalize(path).map_err(|e| ArchiveError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Build the deployment package for `sources`.
///
/// With both descriptors present a zip is written to `output` and returned.
/// Otherwise `output` is untouched and the war itself is returned.
pub fn build_deployment_package(
    sources: &PackageSources,
    output: &Path,
) -> ArchiveResult<DeploymentPackage> {
    if !sources.war.is_file() {
        return Err(ArchiveError::ReadFailed {
            path: sources.war.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "web application archive not found"),
        });
    }

    if !sources.can_bundle() {
        debug!(
            app_descriptor = %sources.app_descriptor.display(),
            container_descriptor = %sources.container_descriptor.display(),
            "Descriptors missing, deploying war directly"
        );
        return Ok(DeploymentPackage {
            path: absolute(&sources.war)?,
            bundled: false,
        });
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut builder = ArchiveBuilder::create(output)?;
    builder.add_file(&sources.war, WAR_ENTRY)?;
    builder.add_file(&sources.app_descriptor, APP_DESCRIPTOR_ENTRY)?;
    builder.add_file(&sources.container_descriptor, CONTAINER_DESCRIPTOR_ENTRY)?;
    builder.finish()?;

    let path = absolute(output)?;
    info!(package = %path.display(), "Deployment package created");
    Ok(DeploymentPackage {
        path,
        bundled: true,
    })
}

/// Pack an exploded web application directory into a war file.
///
/// Returns the number of entries written.
pub fn build_war_from_directory(webapp_dir: &Path, output: &Path) -> ArchiveResult<usize> {
    let mut builder = ArchiveBuilder::create(output)?;
    let count = builder.add_directory(webapp_dir, None, None)?;
    builder.finish()?;
    debug!(entries = count, war = %output.display(), "Web application archive created");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::list_entries;
    use std::fs::File;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_bundle_with_both_descriptors() {
        let temp = TempDir::new().unwrap();
        let sources = PackageSources::new(
            write(temp.path(), "app.war", "war"),
            write(temp.path(), "conf/stax-application.xml", "<stax-application/>"),
            write(temp.path(), "conf/application.xml", "<application/>"),
        );
        let output = temp.path().join("target/stax-deploy.zip");

        let package = build_deployment_package(&sources, &output).unwrap();
        assert!(package.bundled);
        assert!(package.path.is_absolute());

        let names: Vec<String> = list_entries(File::open(&package.path).unwrap())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(
            names,
            vec![WAR_ENTRY, APP_DESCRIPTOR_ENTRY, CONTAINER_DESCRIPTOR_ENTRY]
        );
    }

    #[test]
    fn test_missing_descriptor_uses_war() {
        let temp = TempDir::new().unwrap();
        let war = write(temp.path(), "app.war", "war");
        let sources = PackageSources::new(
            &war,
            write(temp.path(), "stax-application.xml", "<stax-application/>"),
            temp.path().join("application.xml"),
        );
        let output = temp.path().join("stax-deploy.zip");

        let package = build_deployment_package(&sources, &output).unwrap();
        assert!(!package.bundled);
        assert_eq!(package.path, fs::canonicalize(&war).unwrap());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_war_fails() {
        let temp = TempDir::new().unwrap();
        let sources = PackageSources::new(
            temp.path().join("missing.war"),
            temp.path().join("a.xml"),
            temp.path().join("b.xml"),
        );
        let err = build_deployment_package(&sources, &temp.path().join("out.zip")).unwrap_err();
        assert!(matches!(err, ArchiveError::ReadFailed { .. }));
    }

    #[test]
    fn test_war_from_directory() {
        let temp = TempDir::new().unwrap();
        let webapp = temp.path().join("webapp");
        write(&webapp, "index.jsp", "<html/>");
        write(&webapp, "WEB-INF/web.xml", "<web-app/>");
        write(&webapp, ".svn/entries", "hidden");
        fs::create_dir_all(webapp.join("WEB-INF/lib")).unwrap();

        let war = temp.path().join("app.war");
        let count = build_war_from_directory(&webapp, &war).unwrap();
        assert_eq!(count, 3);

        let mut names: Vec<String> = list_entries(File::open(&war).unwrap())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["WEB-INF/lib/", "WEB-INF/web.xml", "index.jsp"]);
    }
}
