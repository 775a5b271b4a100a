//! Resolution of external documents from directory-based repositories.
//!
//! A repository is a directory tree laid out by coordinates:
//!
//! ```text
//! <root>/org/acme/acme-parent/1.2/acme-parent-1.2.pom.toml
//! ```
//!
//! The group id's dots become directory separators. A version range is resolved by
//! listing the version directories of the artifact and picking the highest one
//! inside the range.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::ModelResolver;
use crate::config::expand_path;
use crate::constants::REPOSITORY_DOCUMENT_EXTENSION;
use crate::core::PomrError;
use crate::model::{Coordinates, DocumentSource};
use crate::version::{Version, VersionRange};

/// [`ModelResolver`] over local repository directories.
#[derive(Debug, Clone, Default)]
pub struct LocalRepositoryResolver {
    roots: Vec<PathBuf>,
}

impl LocalRepositoryResolver {
    /// A resolver searching `roots` after the repositories of each request.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
        }
    }

    /// The configured roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Directory holding the version directories of an artifact.
    pub fn artifact_dir(root: &Path, group_id: &str, artifact_id: &str) -> PathBuf {
        let mut dir = root.to_path_buf();
        for segment in group_id.split('.') {
            dir.push(segment);
        }
        dir.join(artifact_id)
    }

    /// Where a document with literal coordinates is stored under `root`.
    pub fn document_path(root: &Path, coordinates: &Coordinates) -> PathBuf {
        Self::artifact_dir(root, &coordinates.group_id, &coordinates.artifact_id)
            .join(&coordinates.version)
            .join(format!(
                "{}-{}.{REPOSITORY_DOCUMENT_EXTENSION}",
                coordinates.artifact_id, coordinates.version
            ))
    }

    fn search_roots(&self, repositories: &[String]) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> =
            repositories.iter().filter_map(|r| expand_path(r).ok()).collect();
        for root in &self.roots {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }

    fn resolve_in(
        root: &Path,
        coordinates: &Coordinates,
        range: Option<&VersionRange>,
    ) -> Option<PathBuf> {
        let version = match range {
            None => coordinates.version.clone(),
            Some(range) => {
                let dir =
                    Self::artifact_dir(root, &coordinates.group_id, &coordinates.artifact_id);
                let candidates: Vec<Version> = std::fs::read_dir(&dir)
                    .ok()?
                    .filter_map(std::result::Result::ok)
                    .filter(|entry| entry.path().is_dir())
                    .map(|entry| Version::parse(&entry.file_name().to_string_lossy()))
                    .collect();
                range.best_match(&candidates)?.as_str().to_string()
            }
        };
        let literal = Coordinates::new(
            coordinates.group_id.clone(),
            coordinates.artifact_id.clone(),
            version,
        );
        let path = Self::document_path(root, &literal);
        path.is_file().then_some(path)
    }
}

impl ModelResolver for LocalRepositoryResolver {
    fn resolve(
        &self,
        coordinates: &Coordinates,
        repositories: &[String],
    ) -> Result<DocumentSource, PomrError> {
        let range = if VersionRange::is_range(&coordinates.version) {
            Some(VersionRange::parse(&coordinates.version)?)
        } else {
            None
        };

        let roots = self.search_roots(repositories);
        for root in &roots {
            if let Some(path) = Self::resolve_in(root, coordinates, range.as_ref()) {
                debug!("resolved {coordinates} to {}", path.display());
                return Ok(DocumentSource::from_path(path));
            }
        }

        Err(PomrError::Unresolvable {
            coordinates: coordinates.to_string(),
            reason: format!(
                "not found in {}",
                if roots.is_empty() {
                    "any repository (none configured)".to_string()
                } else {
                    roots.iter().map(|r| r.display().to_string()).collect::<Vec<_>>().join(", ")
                }
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn install(root: &Path, group: &str, artifact: &str, version: &str) -> PathBuf {
        let path = LocalRepositoryResolver::document_path(
            root,
            &Coordinates::new(group, artifact, version),
        );
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("artifact-id = \"{artifact}\"\n")).unwrap();
        path
    }

    #[test]
    fn test_layout() {
        let path = LocalRepositoryResolver::document_path(
            Path::new("/repo"),
            &Coordinates::new("org.acme", "base", "1.0"),
        );
        assert_eq!(path, PathBuf::from("/repo/org/acme/base/1.0/base-1.0.pom.toml"));
    }

    #[test]
    fn test_literal_and_range_resolution() {
        let temp = tempdir().unwrap();
        install(temp.path(), "org.acme", "base", "1.0");
        install(temp.path(), "org.acme", "base", "1.5");
        let highest = install(temp.path(), "org.acme", "base", "1.9");
        install(temp.path(), "org.acme", "base", "2.0");

        let resolver = LocalRepositoryResolver::new(vec![temp.path().to_path_buf()]);
        let source =
            resolver.resolve(&Coordinates::new("org.acme", "base", "[1.0,2.0)"), &[]).unwrap();
        assert_eq!(source, DocumentSource::from_path(highest));

        assert!(resolver.resolve(&Coordinates::new("org.acme", "base", "1.5"), &[]).is_ok());
    }

    #[test]
    fn test_request_repositories_searched_first() {
        let configured = tempdir().unwrap();
        let requested = tempdir().unwrap();
        install(configured.path(), "org.acme", "bom", "1.0");
        let preferred = install(requested.path(), "org.acme", "bom", "1.0");

        let resolver = LocalRepositoryResolver::new(vec![configured.path().to_path_buf()]);
        let source = resolver
            .resolve(
                &Coordinates::new("org.acme", "bom", "1.0"),
                &[requested.path().to_string_lossy().into_owned()],
            )
            .unwrap();
        assert_eq!(source, DocumentSource::from_path(preferred));
    }

    #[test]
    fn test_missing_is_unresolvable() {
        let temp = tempdir().unwrap();
        let resolver = LocalRepositoryResolver::new(vec![temp.path().to_path_buf()]);
        let error = resolver.resolve(&Coordinates::new("org.acme", "nope", "1.0"), &[]).unwrap_err();
        assert!(matches!(error, PomrError::Unresolvable { .. }));
        assert!(error.to_string().contains("org.acme:nope:1.0"));
    }
}
