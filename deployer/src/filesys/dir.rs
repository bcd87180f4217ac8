//! Directories: the artifact folder and the storage home

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::DeployerError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), DeployerError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), DeployerError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Sorted names of the regular files directly inside, optionally
    /// restricted to one extension
    pub async fn file_names(&self, extension: Option<&str>) -> Result<Vec<String>, DeployerError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let matches = extension
                .map(|ext| path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
                .unwrap_or(true);
            if matches {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Create a uniquely named directory under the system temp dir
    pub async fn create_temp_dir(prefix: &str) -> Result<Dir, DeployerError> {
        let dir = Dir::new(std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4())));
        dir.create().await?;
        Ok(dir)
    }
}
