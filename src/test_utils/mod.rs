//! Test utilities for pomr
//!
//! Helpers for unit and integration tests: logging setup and collaborator stubs
//! that count how often they are called, so tests can assert that cached stages
//! ran once.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pomr::session::ModelBuilder;
//! use pomr::test_utils::{CountingDocumentIo, MemoryResolver};
//!
//! let io = Arc::new(CountingDocumentIo::default());
//! let resolver = Arc::new(MemoryResolver::new());
//! let session = ModelBuilder::new()
//!     .with_document_io(io.clone())
//!     .with_model_resolver(resolver.clone())
//!     .new_session();
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use dashmap::DashMap;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::PomrError;
use crate::model::{Coordinates, Document, DocumentSource};
use crate::spi::{DocumentIo, ModelResolver, TomlDocumentIo};
use crate::version::{Version, VersionRange};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber once, no matter how often it is called. Uses
/// `level` when given, else `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=pomr=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// In-memory [`ModelResolver`]: coordinates map to sources registered up front.
///
/// Version ranges resolve to the highest registered version inside the range.
/// Every call is counted, per `group:artifact:version` as requested.
#[derive(Debug, Default)]
pub struct MemoryResolver {
    documents: Mutex<BTreeMap<(String, String), Vec<(String, DocumentSource)>>>,
    calls: DashMap<String, usize>,
    total: AtomicUsize,
}

impl MemoryResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `source` for `group:artifact:version`.
    pub fn insert(&self, coordinates: &str, source: DocumentSource) {
        let mut parts = coordinates.splitn(3, ':');
        let (Some(group), Some(artifact), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            panic!("coordinates must be group:artifact:version, got {coordinates}");
        };
        if let Ok(mut documents) = self.documents.lock() {
            documents
                .entry((group.to_string(), artifact.to_string()))
                .or_default()
                .push((version.to_string(), source));
        }
    }

    /// Number of `resolve` calls for the coordinates as requested.
    pub fn calls(&self, coordinates: &str) -> usize {
        self.calls.get(coordinates).map_or(0, |count| *count)
    }

    /// Number of `resolve` calls overall.
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl ModelResolver for MemoryResolver {
    fn resolve(
        &self,
        coordinates: &Coordinates,
        _repositories: &[String],
    ) -> Result<DocumentSource, PomrError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.entry(coordinates.to_string()).or_default() += 1;

        let unresolvable = |reason: &str| PomrError::Unresolvable {
            coordinates: coordinates.to_string(),
            reason: reason.to_string(),
        };
        let documents = self.documents.lock().map_err(|_| unresolvable("resolver lock poisoned"))?;
        let candidates = documents
            .get(&(coordinates.group_id.clone(), coordinates.artifact_id.clone()))
            .ok_or_else(|| unresolvable("not registered"))?;

        if VersionRange::is_range(&coordinates.version) {
            let range = VersionRange::parse(&coordinates.version)?;
            return candidates
                .iter()
                .map(|(version, source)| (Version::parse(version), source))
                .filter(|(version, _)| range.contains(version))
                .max_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, source)| source.clone())
                .ok_or_else(|| unresolvable("no version in range"));
        }
        candidates
            .iter()
            .find(|(version, _)| *version == coordinates.version)
            .map(|(_, source)| source.clone())
            .ok_or_else(|| unresolvable("version not registered"))
    }
}

/// [`DocumentIo`] that serves registered texts by location and falls back to
/// another reader, counting reads per location.
pub struct CountingDocumentIo {
    inner: Arc<dyn DocumentIo>,
    texts: DashMap<String, String>,
    reads: DashMap<String, usize>,
}

impl Default for CountingDocumentIo {
    fn default() -> Self {
        Self::wrapping(Arc::new(TomlDocumentIo))
    }
}

impl CountingDocumentIo {
    /// Count the reads of `inner`.
    pub fn wrapping(inner: Arc<dyn DocumentIo>) -> Self {
        Self {
            inner,
            texts: DashMap::new(),
            reads: DashMap::new(),
        }
    }

    /// Serve `text` for `location` without touching the file system. Returns the
    /// source to request it by.
    pub fn insert(&self, location: &str, text: &str) -> DocumentSource {
        self.texts.insert(location.to_string(), text.to_string());
        DocumentSource::from_location(location)
    }

    /// Number of reads of `location`.
    pub fn reads(&self, location: &str) -> usize {
        self.reads.get(location).map_or(0, |count| *count)
    }

    /// Number of reads overall.
    pub fn total_reads(&self) -> usize {
        self.reads.iter().map(|entry| *entry.value()).sum()
    }
}

impl DocumentIo for CountingDocumentIo {
    fn read(&self, source: &DocumentSource) -> Result<Document, PomrError> {
        *self.reads.entry(source.location().to_string()).or_default() += 1;
        let text = self.texts.get(source.location()).map(|text| text.value().clone());
        match text {
            Some(text) => TomlDocumentIo.parse(&text, source),
            None => self.inner.read(source),
        }
    }

    fn write(&self, document: &Document) -> Result<String, PomrError> {
        self.inner.write(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_resolver_picks_highest_in_range() {
        let resolver = MemoryResolver::new();
        resolver.insert("org.acme:base:1.0", DocumentSource::from_location("base-1.0"));
        resolver.insert("org.acme:base:1.4", DocumentSource::from_location("base-1.4"));
        resolver.insert("org.acme:base:2.0", DocumentSource::from_location("base-2.0"));

        let range = Coordinates::new("org.acme", "base", "[1.0,2.0)");
        assert_eq!(resolver.resolve(&range, &[]).unwrap().location(), "base-1.4");
        let literal = Coordinates::new("org.acme", "base", "2.0");
        assert_eq!(resolver.resolve(&literal, &[]).unwrap().location(), "base-2.0");
        assert!(resolver.resolve(&Coordinates::new("org.acme", "none", "1"), &[]).is_err());

        assert_eq!(resolver.calls("org.acme:base:[1.0,2.0)"), 1);
        assert_eq!(resolver.total_calls(), 3);
    }

    #[test]
    fn test_counting_io_serves_texts() {
        let io = CountingDocumentIo::default();
        let source = io.insert("mem:a", "artifact-id = \"a\"\n");
        assert_eq!(io.read(&source).unwrap().artifact_id.as_deref(), Some("a"));
        assert!(io.read(&DocumentSource::from_location("mem:missing")).is_err());
        assert_eq!(io.reads("mem:a"), 1);
        assert_eq!(io.total_reads(), 2);
    }
}
