//! Request-scoped memoization of resolution stages.
//!
//! Resolving a multi-document tree touches the same documents over and over: every
//! child reads its parent, every importer builds the imported bundle, and sibling
//! tasks ask for the same things at the same time. [`RequestCache`] makes each of
//! those computations happen once.
//!
//! # Semantics
//!
//! - [`RequestCache::compute`] runs its supplier at most once per key. Concurrent
//!   requesters of a key that is being computed wait for that single execution.
//! - A failed computation is stored like a success; every later requester gets a
//!   clone of the identical error. There is no retry.
//! - Values are handed out as `Arc<T>`; every lookup of a key returns the same
//!   allocation.
//! - Keys of the [`CacheKey::Request`] shape belong to one top-level build and are
//!   purged with [`RequestCache::purge_request`] when it ends. Coordinate and source
//!   keys survive for later builds in the same session.
//!
//! # Concurrency
//!
//! Slots live in a `DashMap`. The map guard is released before a slot is awaited,
//! so a computation may itself consult the cache for other keys. Callers must not
//! request a key from inside its own computation; the resolver guarantees this by
//! recording the reference in the cycle graph before entering the slot.

use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::PomrError;
use crate::model::DocumentSource;

/// What a cached value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    /// The decoded file, before any normalization
    File,
    /// The file-normalized document
    Raw,
    /// As-parent variants of a document
    Parent,
    /// External resolution of coordinates to a source
    Resolve,
    /// The effective document
    Effective,
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheTag::File => "file",
            CacheTag::Raw => "raw",
            CacheTag::Parent => "parent",
            CacheTag::Resolve => "resolve",
            CacheTag::Effective => "effective",
        };
        f.write_str(name)
    }
}

/// Identity of a cached computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Keyed by coordinates within a repository set.
    Coordinates {
        /// Repository roots the lookup searched, in order
        repositories: Vec<String>,
        /// Group id
        group_id: String,
        /// Artifact id
        artifact_id: String,
        /// Version or version range
        version: String,
        /// Classifier, when any
        classifier: Option<String>,
        /// What is cached
        tag: CacheTag,
    },
    /// Keyed by document source.
    Source {
        /// The document
        source: DocumentSource,
        /// What is cached
        tag: CacheTag,
    },
    /// Keyed by document source within one top-level build.
    Request {
        /// The top-level build
        request_id: Uuid,
        /// The document
        source: DocumentSource,
        /// What is cached
        tag: CacheTag,
    },
}

impl CacheKey {
    /// A source-shaped key.
    pub fn source(source: &DocumentSource, tag: CacheTag) -> Self {
        Self::Source {
            source: source.clone(),
            tag,
        }
    }

    /// A request-shaped key.
    pub fn request(request_id: Uuid, source: &DocumentSource, tag: CacheTag) -> Self {
        Self::Request {
            request_id,
            source: source.clone(),
            tag,
        }
    }

    /// The tag of any key shape.
    pub fn tag(&self) -> CacheTag {
        match self {
            CacheKey::Coordinates { tag, .. }
            | CacheKey::Source { tag, .. }
            | CacheKey::Request { tag, .. } => *tag,
        }
    }
}

type Stored = Result<Arc<dyn Any + Send + Sync>, PomrError>;
type Slot = Arc<OnceCell<Stored>>;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a stored or in-flight computation
    pub hits: u64,
    /// Lookups that ran their supplier
    pub misses: u64,
    /// Slots currently held
    pub entries: usize,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hits, {} misses, {} entries", self.hits, self.misses, self.entries)
    }
}

/// Keyed run-once store shared by every task of a session.
#[derive(Default)]
pub struct RequestCache {
    entries: DashMap<CacheKey, Slot>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RequestCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `supplier` if no requester ran it yet.
    ///
    /// # Errors
    ///
    /// Returns the (possibly cached) error of the supplier, or [`PomrError::Other`]
    /// if the key was stored with a different value type.
    pub async fn compute<T, F, Fut>(&self, key: CacheKey, supplier: F) -> Result<Arc<T>, PomrError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PomrError>>,
    {
        let slot: Slot = Arc::clone(self.entries.entry(key.clone()).or_default().value());

        let computed = AtomicBool::new(false);
        let stored = slot
            .get_or_init(|| async {
                computed.store(true, Ordering::Relaxed);
                supplier().await.map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
            })
            .await;

        if computed.load(Ordering::Relaxed) {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("cache hit: {key:?}");
        }

        match stored {
            Ok(value) => Arc::clone(value).downcast::<T>().map_err(|_| PomrError::Other {
                message: format!("cache entry {key:?} holds a different type"),
            }),
            Err(error) => Err(error.clone()),
        }
    }

    /// A completed value, without computing or waiting.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Result<Arc<T>, PomrError>> {
        let slot = Arc::clone(self.entries.get(key)?.value());
        match slot.get()? {
            Ok(value) => Arc::clone(value).downcast::<T>().ok().map(Ok),
            Err(error) => Some(Err(error.clone())),
        }
    }

    /// Drop every request-scoped slot of the given build.
    pub fn purge_request(&self, request_id: Uuid) {
        let before = self.entries.len();
        self.entries.retain(|key, _| {
            !matches!(key, CacheKey::Request { request_id: id, .. } if *id == request_id)
        });
        debug!("purged {} request-scoped cache entries", before - self.entries.len());
    }

    /// Number of slots held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Log the statistics at info level.
    pub fn log_stats(&self) {
        info!("model cache: {}", self.stats());
    }
}
