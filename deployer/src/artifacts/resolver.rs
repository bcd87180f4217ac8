//! Artifact resolution

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DeployerError;
use crate::filesys::dir::Dir;

const ARTIFACT_EXTENSION: &str = "jar";

/// A named, versioned deployable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub name: String,
    pub version: String,
}

impl ArtifactRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// File name of the deployable, e.g. `todos-api-1.0.0.SNAP.jar`
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.name, self.version, ARTIFACT_EXTENSION)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A resolved deployable on local disk
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub artifact: ArtifactRef,
    pub path: PathBuf,
}

/// Artifact resolver trait
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Locate the deployable, or fail with `ArtifactNotFound`
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<ResolvedArtifact, DeployerError>;

    /// Names of every available deployable
    async fn list(&self) -> Result<Vec<String>, DeployerError>;
}

/// Resolves artifacts from a local folder of jars
pub struct LocalFolderResolver {
    folder: Dir,
}

impl LocalFolderResolver {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: Dir::new(folder),
        }
    }

    pub fn folder(&self) -> &Dir {
        &self.folder
    }
}

#[async_trait]
impl ArtifactResolver for LocalFolderResolver {
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<ResolvedArtifact, DeployerError> {
        let file = self.folder.file(&artifact.file_name());
        debug!("Resolving {} at {}", artifact, file.path().display());

        if !file.exists().await {
            return Err(DeployerError::ArtifactNotFound {
                artifact: artifact.name.clone(),
                version: artifact.version.clone(),
            });
        }

        Ok(ResolvedArtifact {
            artifact: artifact.clone(),
            path: file.path().to_path_buf(),
        })
    }

    async fn list(&self) -> Result<Vec<String>, DeployerError> {
        if !self.folder.exists().await {
            return Err(DeployerError::NotFound(format!(
                "artifact folder {}",
                self.folder.path().display()
            )));
        }

        self.folder.file_names(Some(ARTIFACT_EXTENSION)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_missing_artifact() {
        let dir = Dir::create_temp_dir("cfdeploy-artifacts").await.unwrap();
        let resolver = LocalFolderResolver::new(dir.path());

        let err = resolver
            .resolve(&ArtifactRef::new("todos-api", "9.9.9"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::ArtifactNotFound { .. }));

        dir.delete().await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_and_list() {
        let dir = Dir::create_temp_dir("cfdeploy-artifacts").await.unwrap();
        dir.file("todos-edge-1.0.0.SNAP.jar")
            .write_bytes(b"PK")
            .await
            .unwrap();
        dir.file("todos-api-1.0.0.SNAP.jar")
            .write_bytes(b"PK")
            .await
            .unwrap();
        dir.file("README.md").write_bytes(b"#").await.unwrap();
        let resolver = LocalFolderResolver::new(dir.path());

        let resolved = resolver
            .resolve(&ArtifactRef::new("todos-api", "1.0.0.SNAP"))
            .await
            .unwrap();
        assert!(resolved.path.ends_with("todos-api-1.0.0.SNAP.jar"));

        let names = resolver.list().await.unwrap();
        assert_eq!(
            names,
            vec!["todos-api-1.0.0.SNAP.jar", "todos-edge-1.0.0.SNAP.jar"]
        );

        dir.delete().await.unwrap();
    }
}
