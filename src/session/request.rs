//! Build requests.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use uuid::Uuid;

use crate::activation::{ActivationContext, default_system_properties};
use crate::model::DocumentSource;
use crate::spi::Strictness;

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// The whole tree below a root, each document resolved to its effective form.
    Project,
    /// One document resolved to its effective form.
    Effective,
    /// One document as read and normalized, without parent or profiles.
    RawOnly,
    /// Derived: the lineage of a parent on behalf of a child.
    Parent,
    /// Derived: a dependency-management bundle on behalf of an importer.
    Import,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Project => "project",
            RequestKind::Effective => "effective",
            RequestKind::RawOnly => "raw",
            RequestKind::Parent => "parent",
            RequestKind::Import => "import",
        };
        f.write_str(name)
    }
}

/// Immutable input of one document resolution.
///
/// Requests are never mutated once resolution started; recursing into a parent or
/// import [derives](Self::derive) a new request that shares the environment and the
/// request id of the top-level one.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// The document to build (for project builds: where to start)
    pub source: DocumentSource,
    /// What to build
    pub kind: RequestKind,
    /// Profile ids requested as active
    pub active_profiles: BTreeSet<String>,
    /// Profile ids requested as inactive
    pub inactive_profiles: BTreeSet<String>,
    /// System properties (`env.*`, `os.*`, `java.version`, ...)
    pub system_properties: BTreeMap<String, String>,
    /// User properties (`-D` on the command line)
    pub user_properties: BTreeMap<String, String>,
    /// Repositories searched before the configured ones
    pub repositories: Vec<String>,
    /// Validation strictness
    pub strictness: Strictness,
    /// Whether parents and imports may be found among the loaded documents
    pub allow_reactor: bool,
    /// Whether project builds start at the root found by the root locator
    pub locate_root: bool,
    /// Worker pool size for project builds; `None` uses the session default
    pub max_parallel: Option<usize>,
    /// Drop lookups of inactive profiles from activation records
    pub prune_inactive: bool,
    /// Identity of the top-level request, shared by derived requests
    pub request_id: Uuid,
}

impl BuildRequest {
    /// A request with the process environment as system properties.
    pub fn new(source: DocumentSource, kind: RequestKind) -> Self {
        Self {
            source,
            kind,
            active_profiles: BTreeSet::new(),
            inactive_profiles: BTreeSet::new(),
            system_properties: default_system_properties(),
            user_properties: BTreeMap::new(),
            repositories: Vec::new(),
            strictness: Strictness::default(),
            allow_reactor: true,
            locate_root: false,
            max_parallel: None,
            prune_inactive: false,
            request_id: Uuid::new_v4(),
        }
    }

    /// Request profiles by id as active.
    #[must_use]
    pub fn with_active_profiles<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Request profiles by id as inactive.
    #[must_use]
    pub fn with_inactive_profiles<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inactive_profiles.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Replace the system properties.
    #[must_use]
    pub fn with_system_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.system_properties = properties;
        self
    }

    /// Set one system property.
    #[must_use]
    pub fn with_system_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_properties.insert(name.into(), value.into());
        self
    }

    /// Merge user properties over the existing ones.
    #[must_use]
    pub fn with_user_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.user_properties.extend(properties);
        self
    }

    /// Set one user property.
    #[must_use]
    pub fn with_user_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(name.into(), value.into());
        self
    }

    /// Repositories to search first.
    #[must_use]
    pub fn with_repositories(mut self, repositories: Vec<String>) -> Self {
        self.repositories = repositories;
        self
    }

    /// Validation strictness.
    #[must_use]
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Allow or forbid reactor lookups.
    #[must_use]
    pub fn with_reactor(mut self, allow: bool) -> Self {
        self.allow_reactor = allow;
        self
    }

    /// Start project builds at the located root.
    #[must_use]
    pub fn with_root_lookup(mut self, locate: bool) -> Self {
        self.locate_root = locate;
        self
    }

    /// Worker pool size for project builds.
    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = Some(max_parallel);
        self
    }

    /// Prune lookups of inactive profiles from activation records.
    #[must_use]
    pub fn with_inactive_pruning(mut self, prune: bool) -> Self {
        self.prune_inactive = prune;
        self
    }

    /// A request for another document sharing this request's environment and id.
    #[must_use]
    pub fn derive(&self, source: DocumentSource, kind: RequestKind) -> Self {
        Self {
            source,
            kind,
            ..self.clone()
        }
    }

    /// A fresh activation context for this request's environment.
    pub fn activation_context(&self) -> ActivationContext {
        ActivationContext::new(
            self.active_profiles.clone(),
            self.inactive_profiles.clone(),
            self.system_properties.clone(),
            self.user_properties.clone(),
        )
        .with_inactive_pruning(self.prune_inactive)
    }
}
