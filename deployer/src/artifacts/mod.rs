//! Artifact module

pub mod resolver;

pub use resolver::{ArtifactRef, ArtifactResolver, LocalFolderResolver, ResolvedArtifact};
