//! Document sources: where the bytes of a document came from.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};

use crate::constants::DOCUMENT_FILE_NAME;

/// Opaque handle to the origin of a document.
///
/// Two sources are equal iff their locations are equal; the optional path is carried
/// along for file-system relative lookups but does not take part in identity. Sources
/// key the request cache and, prefixed by the computation, name nodes in the cycle graph.
#[derive(Debug, Clone, Eq)]
pub struct DocumentSource {
    location: String,
    path: Option<PathBuf>,
}

impl DocumentSource {
    /// A source backed by a file. The location is the normalized absolute path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = normalize_path(path.as_ref());
        Self {
            location: path.to_string_lossy().replace('\\', "/"),
            path: Some(path),
        }
    }

    /// A source that has no file-system presence (tests, in-memory documents).
    pub fn from_location(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            path: None,
        }
    }

    /// Identity of the source.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// File-system path of the document, when it has one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory the document lives in.
    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Resolve a path relative to this document's directory.
    ///
    /// A directory resolves to the document file inside it. Returns `None` when the
    /// source has no path or nothing exists at the resolved location.
    pub fn resolve(&self, relative: &str) -> Option<DocumentSource> {
        let base = self.directory()?;
        let mut candidate = base.join(relative);
        if candidate.is_dir() {
            candidate = candidate.join(DOCUMENT_FILE_NAME);
        }
        candidate.is_file().then(|| DocumentSource::from_path(candidate))
    }
}

impl PartialEq for DocumentSource {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Hash for DocumentSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// Make a path absolute and resolve `.`/`..` components.
///
/// Existing paths are canonicalized so that two spellings of the same file share an
/// identity; missing paths are cleaned lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return strip_verbatim(canonical);
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    let mut result = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other),
        }
    }
    result
}

#[cfg(windows)]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_prefix(r"\\?\") {
        Some(stripped) => PathBuf::from(stripped),
        None => path,
    }
}

#[cfg(not(windows))]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    path
}
