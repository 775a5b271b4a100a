//! The reactor: documents loaded as part of the current build, by coordinates.

use dashmap::DashMap;

use crate::model::{Document, DocumentSource};
use crate::version::{Version, VersionRange};

#[derive(Debug, Clone)]
struct ReactorEntry {
    version: String,
    source: DocumentSource,
}

/// Concurrent `group:artifact` → loaded documents map.
///
/// Filled while the tree is loaded, read while effective models are computed.
/// Lookups are deterministic: when several documents match, the highest version
/// wins and ties go to the lexicographically smallest location.
#[derive(Debug, Default)]
pub struct Reactor {
    entries: DashMap<String, Vec<ReactorEntry>>,
}

impl Reactor {
    /// An empty reactor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded document. Documents without complete literal coordinates
    /// are skipped. Returns whether the document was added.
    pub fn register(&self, document: &Document, source: &DocumentSource) -> bool {
        let Some(coordinates) = document.coordinates() else {
            return false;
        };
        if coordinates.group_id == "[unknown]"
            || coordinates.version == "[unknown]"
            || VersionRange::is_range(&coordinates.version)
        {
            return false;
        }
        let mut entries = self.entries.entry(coordinates.key()).or_default();
        if entries.iter().any(|e| e.source == *source) {
            return false;
        }
        entries.push(ReactorEntry {
            version: coordinates.version,
            source: source.clone(),
        });
        true
    }

    /// Find a document by coordinates; `version` may be a range.
    pub fn find(&self, group_id: &str, artifact_id: &str, version: &str) -> Option<DocumentSource> {
        let entries = self.entries.get(&format!("{group_id}:{artifact_id}"))?;

        if VersionRange::is_range(version) {
            let range = VersionRange::parse(version).ok()?;
            return entries
                .iter()
                .map(|e| (Version::parse(&e.version), e))
                .filter(|(v, _)| range.contains(v))
                .max_by(|(va, a), (vb, b)| va.cmp(vb).then_with(|| b.source.location().cmp(a.source.location())))
                .map(|(_, e)| e.source.clone());
        }

        entries
            .iter()
            .filter(|e| e.version == version)
            .min_by(|a, b| a.source.location().cmp(b.source.location()))
            .map(|e| e.source.clone())
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
