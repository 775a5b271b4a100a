//! Shared helpers for pomr integration tests
//!
//! [`TestWorkspace`] lays out documents in a temporary directory, optionally with a
//! local repository next to them, and opens sessions over it.

// Not every test file uses every helper
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use pomr::model::DocumentSource;
use pomr::session::{BuildRequest, ModelBuilder, ModelBuilderSession, RequestKind};
use pomr::spi::LocalRepositoryResolver;
use tempfile::TempDir;

/// A temporary directory holding a tree of documents and a local repository.
pub struct TestWorkspace {
    temp: TempDir,
}

impl TestWorkspace {
    /// An empty workspace.
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    /// Root of the workspace.
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Absolute path of `relative`.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Directory of the local repository.
    pub fn repository(&self) -> PathBuf {
        self.path("repository")
    }

    /// Write `<dir>/pom.toml`; `""` writes the root document.
    pub fn document(&self, dir: &str, text: &str) -> Result<DocumentSource> {
        let directory = self.path(dir);
        fs::create_dir_all(&directory)?;
        let path = directory.join("pom.toml");
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(DocumentSource::from_path(path))
    }

    /// Install a document into the local repository.
    pub fn install(&self, coordinates: &str, text: &str) -> Result<DocumentSource> {
        let parts: Vec<&str> = coordinates.split(':').collect();
        let [group, artifact, version] = parts[..] else {
            anyhow::bail!("expected group:artifact:version, got {coordinates}");
        };
        let directory = LocalRepositoryResolver::artifact_dir(&self.repository(), group, artifact).join(version);
        fs::create_dir_all(&directory)?;
        let path = directory.join(format!("{artifact}-{version}.pom.toml"));
        fs::write(&path, text)?;
        Ok(DocumentSource::from_path(path))
    }

    /// A builder whose external resolver searches this workspace's repository.
    pub fn builder(&self) -> ModelBuilder {
        ModelBuilder::new().with_model_resolver(Arc::new(LocalRepositoryResolver::new(vec![self.repository()])))
    }

    /// A session over [`builder`](Self::builder).
    pub fn session(&self) -> ModelBuilderSession {
        self.builder().new_session()
    }
}

/// A request with no system properties, so the host environment cannot leak in.
pub fn request(source: DocumentSource, kind: RequestKind) -> BuildRequest {
    BuildRequest::new(source, kind).with_system_properties(BTreeMap::new())
}

/// A minimal document with coordinates and extra TOML appended.
pub fn pom(group: &str, artifact: &str, version: &str, extra: &str) -> String {
    format!("group-id = \"{group}\"\nartifact-id = \"{artifact}\"\nversion = \"{version}\"\n{extra}")
}

/// A `[parent]` table.
pub fn parent(group: &str, artifact: &str, version: &str) -> String {
    format!("\n[parent]\ngroup-id = \"{group}\"\nartifact-id = \"{artifact}\"\nversion = \"{version}\"\n")
}
