//! Per-document resolution: from a `pom.toml` on disk to its effective model.
//!
//! This module implements the document pipeline that every build runs once per
//! document. It reads documents, locates and resolves their parents, activates
//! profiles, imports dependency-management bundles and interpolates the result. The
//! *how* of reading, merging, interpolating and validating is delegated to the
//! collaborators in [`spi`](crate::spi); this module decides *when* and *on what*.
//!
//! # Pipeline
//!
//! Each document passes through the same stages, strictly in order:
//!
//! 1. **File**: the document as read ([`DocumentResolver::read_file`]), validated at
//!    the file checkpoint.
//! 2. **Raw**: normalized ([`normalize`]); a missing `group-id` or `version` is
//!    borrowed from the parent reference. Validated at the raw checkpoint.
//! 3. **Profiles**: the document's own profiles are activated and injected.
//! 4. **Parent**: the parent is located ([`parent`]) and its lineage resolved into an
//!    *as-parent* document, which is assembled into the child.
//! 5. **Imports**: `scope = "import"` management entries are replaced by the
//!    management of the referenced bundles ([`import`]).
//! 6. **Management**: managed versions and scopes are filled into dependencies and
//!    plugins ([`inject_management`]).
//! 7. **Interpolation**: `${...}` placeholders are expanded, model values first.
//! 8. **Effective**: the final document is validated at the effective checkpoint.
//!
//! A stage that cannot continue (unreadable document, parent cycle, unresolvable
//! parent) records a Fatal problem and ends the pipeline for that document; the
//! [`BuildResult`] keeps what the completed stages produced.
//!
//! # Caching
//!
//! | Stage output            | Key                                   |
//! |-------------------------|---------------------------------------|
//! | file document           | `(source, file)`                      |
//! | raw document            | `(source, raw)`                       |
//! | external lookup         | `(repositories, coordinates, resolve)`|
//! | as-parent variants      | `(source, parent)`                    |
//! | effective result        | `(request id, source, effective)`     |
//!
//! File, raw and external results do not depend on the environment and live as
//! long as the session. Effective results depend on the requested profiles and
//! properties and are scoped to one top-level request. As-parent documents depend
//! on the environment through profile activation and through the request's
//! strictness, repositories and reactor setting, so they are memoized per source as
//! a list of `(settings, activation record, document)` variants; a variant is reused
//! whenever its settings are equal and its record
//! [matches](crate::activation::ActivationRecord::matches) the live context.
//!
//! # Cycles
//!
//! Before any stage enters another cache slot, the edge from the current
//! computation to the other one is added to the session's
//! [`CycleGraph`](crate::graph::CycleGraph). Graph nodes name the slot kind: an
//! effective model enters its parent's lineage (`effective -> parent`) and its
//! imported bundles' effective models (`effective -> effective`); a lineage only
//! enters the grandparent's lineage (`parent -> parent`). Because the graph rejects
//! the edge that would close a cycle, cache slots are always entered along an
//! acyclic graph and a resolution can never wait on itself.

pub mod import;
pub mod parent;
pub mod reactor;

pub use reactor::Reactor;

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::activation::{ActivationContext, ProfileSelector};
use crate::cache::{CacheKey, CacheTag, RequestCache};
use crate::core::{PomrError, Problem, ProblemCollector, Severity};
use crate::graph::{CycleGraph, effective_node, parent_node};
use crate::model::{Build, Coordinates, Document, DocumentSource, Profile};
use crate::session::{BuildRequest, BuildResult, RequestKind};
use crate::spi::interpolation::{interpolate_document, model_lookup};
use crate::spi::{
    BasicConditionEvaluator, DefaultInheritanceAssembler, DefaultModelValidator,
    DefaultProfileInjector, DocumentIo, InheritanceAssembler, Interpolator,
    LocalRepositoryResolver, ModelResolver, ModelValidator, ProfileInjector, RegexInterpolator,
    TomlDocumentIo, ValidationStage,
};
use crate::version::VersionRange;

/// The collaborators a resolution delegates to.
#[derive(Clone)]
pub struct Collaborators {
    /// Reads documents
    pub io: Arc<dyn DocumentIo>,
    /// Finds documents outside the build
    pub resolver: Arc<dyn ModelResolver>,
    /// Merges parents into children
    pub assembler: Arc<dyn InheritanceAssembler>,
    /// Applies active profiles
    pub injector: Arc<dyn ProfileInjector>,
    /// Expands placeholders
    pub interpolator: Arc<dyn Interpolator>,
    /// Validates documents
    pub validator: Arc<dyn ModelValidator>,
    /// Decides which profiles are active
    pub selector: Arc<ProfileSelector>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            io: Arc::new(TomlDocumentIo),
            resolver: Arc::new(LocalRepositoryResolver::default()),
            assembler: Arc::new(DefaultInheritanceAssembler),
            injector: Arc::new(DefaultProfileInjector),
            interpolator: Arc::new(RegexInterpolator::new()),
            validator: Arc::new(DefaultModelValidator),
            selector: Arc::new(ProfileSelector::new(Arc::new(BasicConditionEvaluator))),
        }
    }
}

/// Marker for a pipeline that ended early. The reason is already recorded as a
/// problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

/// Runs the document pipeline against the shared state of a session.
///
/// Cloning is cheap; every clone shares the cache, the cycle graph and the reactor.
#[derive(Clone)]
pub struct DocumentResolver {
    collaborators: Arc<Collaborators>,
    cache: Arc<RequestCache>,
    graph: Arc<CycleGraph>,
    reactor: Arc<Reactor>,
}

fn join_failure(error: tokio::task::JoinError) -> PomrError {
    PomrError::Other {
        message: format!("blocking task failed: {error}"),
    }
}

/// The raw form of a file document: `group-id` and `version` borrowed from the
/// parent reference when missing. A parent version range is never borrowed.
pub fn normalize(file: &Document) -> Document {
    let mut raw = file.clone();
    if let Some(parent) = &file.parent {
        if raw.group_id.is_none() {
            raw.group_id = parent.group_id.clone();
        }
        if raw.version.is_none()
            && let Some(version) = &parent.version
            && !VersionRange::is_range(version)
        {
            raw.version = Some(version.clone());
        }
    }
    raw
}

/// Fill managed versions, scopes and exclusions into dependencies, and managed
/// versions and configuration into plugins.
pub fn inject_management(document: &Document) -> Document {
    let mut result = document.clone();
    for dependency in &mut result.dependencies {
        let key = dependency.management_key();
        let Some(managed) = document.dependency_management.iter().find(|m| m.management_key() == key)
        else {
            continue;
        };
        if dependency.version.is_none() {
            dependency.version = managed.version.clone();
        }
        if dependency.scope.is_none() {
            dependency.scope = managed.scope.clone();
        }
        if dependency.optional.is_none() {
            dependency.optional = managed.optional;
        }
        if dependency.system_path.is_none() {
            dependency.system_path = managed.system_path.clone();
        }
        if dependency.exclusions.is_empty() {
            dependency.exclusions = managed.exclusions.clone();
        }
    }
    if let Some(Build {
        plugins,
        plugin_management,
        ..
    }) = &mut result.build
    {
        for plugin in plugins.iter_mut() {
            let key = plugin.key();
            let Some(managed) = plugin_management.iter().find(|m| m.key() == key) else {
                continue;
            };
            if plugin.version.is_none() {
                plugin.version = managed.version.clone();
            }
            for (name, value) in &managed.configuration {
                plugin.configuration.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    result
}

/// A child whose parent version is a range must declare a constant version.
fn check_constant_version(document: &Document, problems: &mut ProblemCollector) {
    let Some(parent) = &document.parent else {
        return;
    };
    if !parent.version.as_deref().is_some_and(VersionRange::is_range) {
        return;
    }
    let reason = match document.version.as_deref() {
        None => "it would be inherited from a parent version range",
        Some(version) if version.contains("${") => "it contains an expression",
        Some(_) => return,
    };
    problems.push(
        Problem::new(
            Severity::Fatal,
            format!(
                "Version must be a constant when the parent version is a range ({}); {reason}",
                parent.version.as_deref().unwrap_or_default()
            ),
        )
        .with_field("version")
        .with_location(document.location("version").or_else(|| document.location("parent.version"))),
    );
}

impl DocumentResolver {
    /// A resolver over fresh shared state.
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_state(
            Arc::new(collaborators),
            Arc::new(RequestCache::new()),
            Arc::new(CycleGraph::new()),
            Arc::new(Reactor::new()),
        )
    }

    /// A resolver over existing shared state.
    pub fn with_state(
        collaborators: Arc<Collaborators>,
        cache: Arc<RequestCache>,
        graph: Arc<CycleGraph>,
        reactor: Arc<Reactor>,
    ) -> Self {
        Self {
            collaborators,
            cache,
            graph,
            reactor,
        }
    }

    /// The request cache.
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// The cycle graph.
    pub fn graph(&self) -> &CycleGraph {
        &self.graph
    }

    /// The reactor.
    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    /// The collaborators.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// The document behind `source`, read at most once per session.
    ///
    /// # Errors
    ///
    /// Returns the (cached) read failure of the document.
    pub async fn read_file(&self, source: &DocumentSource) -> Result<Arc<Document>, PomrError> {
        let io = Arc::clone(&self.collaborators.io);
        let source = source.clone();
        self.cache
            .compute(CacheKey::source(&source, CacheTag::File), move || async move {
                debug!("reading {source}");
                tokio::task::spawn_blocking(move || io.read(&source)).await.map_err(join_failure)?
            })
            .await
    }

    /// The normalized document behind `source`.
    ///
    /// # Errors
    ///
    /// Returns the read failure of the document.
    pub async fn raw(&self, source: &DocumentSource) -> Result<Arc<Document>, PomrError> {
        self.cache
            .compute(CacheKey::source(source, CacheTag::Raw), || async {
                Ok::<_, PomrError>(normalize(&*self.read_file(source).await?))
            })
            .await
    }

    /// Find a document outside the build, at most once per coordinates and
    /// repository list.
    ///
    /// # Errors
    ///
    /// Returns the (cached) [`PomrError::Unresolvable`] of the lookup.
    pub async fn resolve_external(
        &self,
        coordinates: &Coordinates,
        repositories: &[String],
    ) -> Result<DocumentSource, PomrError> {
        let key = CacheKey::Coordinates {
            repositories: repositories.to_vec(),
            group_id: coordinates.group_id.clone(),
            artifact_id: coordinates.artifact_id.clone(),
            version: coordinates.version.clone(),
            classifier: None,
            tag: CacheTag::Resolve,
        };
        let resolver = Arc::clone(&self.collaborators.resolver);
        let coordinates = coordinates.clone();
        let repositories = repositories.to_vec();
        let source = self
            .cache
            .compute(key, move || async move {
                debug!("resolving {coordinates} externally");
                tokio::task::spawn_blocking(move || resolver.resolve(&coordinates, &repositories))
                    .await
                    .map_err(join_failure)?
            })
            .await?;
        Ok((*source).clone())
    }

    fn validate(
        &self,
        document: &Document,
        stage: ValidationStage,
        request: &BuildRequest,
        problems: &mut ProblemCollector,
    ) {
        problems.extend(self.collaborators.validator.validate(document, stage, request.strictness));
    }

    /// Activate the profiles of `document` in `ctx`.
    ///
    /// Runs on the blocking pool because file predicates may walk directories.
    async fn activate(
        &self,
        document: &Arc<Document>,
        location: &str,
        request: &BuildRequest,
        ctx: &mut ActivationContext,
        problems: &mut ProblemCollector,
    ) -> Vec<Profile> {
        let selector = Arc::clone(&self.collaborators.selector);
        let document = Arc::clone(document);
        let location = location.to_string();
        let mut owned = std::mem::take(ctx);
        let mut collector = ProblemCollector::new(problems.document());

        let joined = tokio::task::spawn_blocking(move || {
            let previous = owned.set_model(Arc::clone(&document), location);
            let profiles = selector.select(&document, &mut owned, &mut collector);
            owned.restore_model(previous);
            (profiles, collector, owned)
        })
        .await;

        match joined {
            Ok((profiles, collector, owned)) => {
                *ctx = owned;
                problems.merge(&collector);
                profiles
            }
            Err(error) => {
                *ctx = request.activation_context();
                problems.push(
                    Problem::new(Severity::Fatal, "Profile activation failed")
                        .with_cause(error.to_string()),
                );
                Vec::new()
            }
        }
    }

    /// The effective model of the request's document, computed once per request.
    pub fn effective<'a>(&'a self, request: &'a BuildRequest) -> BoxFuture<'a, Arc<BuildResult>> {
        self.effective_with_imports(request, Vec::new())
    }

    pub(crate) fn effective_with_imports<'a>(
        &'a self,
        request: &'a BuildRequest,
        import_chain: Vec<String>,
    ) -> BoxFuture<'a, Arc<BuildResult>> {
        Box::pin(async move {
            let key = CacheKey::request(request.request_id, &request.source, CacheTag::Effective);
            let computed = self
                .cache
                .compute(key, move || async move {
                    Ok::<_, PomrError>(self.compute_effective(request, import_chain).await)
                })
                .await;
            match computed {
                Ok(result) => result,
                Err(error) => {
                    let mut result = BuildResult::new(request.source.clone());
                    result.problems.push(
                        Problem::new(Severity::Fatal, "Failed to build the effective model")
                            .with_cause(error.to_string()),
                    );
                    Arc::new(result)
                }
            }
        })
    }

    /// Read, normalize and validate a document without resolving anything else.
    pub async fn raw_only(&self, request: &BuildRequest) -> BuildResult {
        let mut result = BuildResult::new(request.source.clone());
        let _ = self.load_raw(request, &mut result).await;
        result
    }

    /// Stages 1 and 2 for the document of `request`, into `result`.
    async fn load_raw(
        &self,
        request: &BuildRequest,
        result: &mut BuildResult,
    ) -> Result<Arc<Document>, Aborted> {
        let source = &request.source;
        let file = match self.read_file(source).await {
            Ok(file) => file,
            Err(error) => {
                result.problems.push(
                    Problem::new(Severity::Fatal, format!("Failed to read {source}"))
                        .with_cause(error.to_string()),
                );
                return Err(Aborted);
            }
        };
        result.problems.set_document(file.id());
        result.file_document = Some(Arc::clone(&file));
        self.validate(&file, ValidationStage::File, request, &mut result.problems);
        check_constant_version(&file, &mut result.problems);

        let raw = match self.raw(source).await {
            Ok(raw) => raw,
            Err(error) => {
                result.problems.push(
                    Problem::new(Severity::Fatal, format!("Failed to read {source}"))
                        .with_cause(error.to_string()),
                );
                return Err(Aborted);
            }
        };
        result.raw_document = Some(Arc::clone(&raw));
        self.validate(&raw, ValidationStage::Raw, request, &mut result.problems);

        if result.problems.has_fatal() {
            return Err(Aborted);
        }
        Ok(raw)
    }

    async fn compute_effective(&self, request: &BuildRequest, import_chain: Vec<String>) -> BuildResult {
        let source = &request.source;
        debug!("building {} model of {source}", request.kind);
        let mut result = BuildResult::new(source.clone());
        let Ok(raw) = self.load_raw(request, &mut result).await else {
            return result;
        };
        result.declared_profiles.extend(raw.profiles.iter().map(|p| p.id.clone()));

        let mut ctx = request.activation_context();
        let profiles =
            self.activate(&raw, source.location(), request, &mut ctx, &mut result.problems).await;
        result.active_profiles.extend(profiles.iter().map(|p| p.id.clone()));
        let injected = self.collaborators.injector.inject(&raw, &profiles);

        let chain = parent::ParentChain::start(&raw, source);
        let parent = match self.resolve_parent(&raw, request, &mut ctx, chain, &mut result.problems).await {
            Ok(parent) => parent,
            Err(Aborted) => return result,
        };
        let assembled = match parent {
            Some(parent) => {
                result.active_profiles.extend(parent.profiles.iter().cloned());
                result.declared_profiles.extend(parent.declared.iter().cloned());
                let assembled = self.collaborators.assembler.assemble(&injected, &parent.document);
                result.parent_document = Some(parent.document);
                assembled
            }
            None => injected.clone(),
        };

        let management = self
            .import_management(&assembled, &injected, request, &mut result.problems, &import_chain)
            .await;
        let managed = inject_management(&assembled.with_dependency_management(management));

        let lookup = model_lookup(&managed, &request.user_properties, &request.system_properties);
        let effective = interpolate_document(self.collaborators.interpolator.as_ref(), &managed, &lookup);
        self.validate(&effective, ValidationStage::Effective, request, &mut result.problems);

        result.problems.set_document(effective.id());
        result.effective_document = Some(Arc::new(effective));
        result
    }
}

/// Graph node of the computation running `request`.
fn step_node(request: &BuildRequest) -> String {
    match request.kind {
        RequestKind::Parent => parent_node(request.source.location()),
        _ => effective_node(request.source.location()),
    }
}

/// Ids of every profile requested explicitly.
pub fn requested_profile_ids(request: &BuildRequest) -> BTreeSet<String> {
    request.active_profiles.iter().chain(&request.inactive_profiles).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, ParentRef, Plugin};

    #[test]
    fn test_normalize_borrows_literal_parent_coordinates() {
        let file = Document {
            artifact_id: Some("child".to_string()),
            parent: Some(ParentRef {
                group_id: Some("org.acme".to_string()),
                artifact_id: Some("parent".to_string()),
                version: Some("1.0".to_string()),
                relative_path: None,
            }),
            ..Document::default()
        };
        let raw = normalize(&file);
        assert_eq!(raw.group_id.as_deref(), Some("org.acme"));
        assert_eq!(raw.version.as_deref(), Some("1.0"));

        let ranged = file.with_parent(Some(ParentRef {
            version: Some("[1.0,2.0)".to_string()),
            ..file.parent.clone().unwrap()
        }));
        assert_eq!(normalize(&ranged).version, None);
    }

    #[test]
    fn test_constant_version_required_for_range_parent() {
        let mut document = Document {
            artifact_id: Some("child".to_string()),
            parent: Some(ParentRef {
                group_id: Some("org.acme".to_string()),
                artifact_id: Some("parent".to_string()),
                version: Some("[1.0,2.0)".to_string()),
                relative_path: None,
            }),
            ..Document::default()
        };
        let mut problems = ProblemCollector::new("child");
        check_constant_version(&document, &mut problems);
        assert!(problems.has_fatal());

        document.version = Some("${revision}".to_string());
        let mut problems = ProblemCollector::new("child");
        check_constant_version(&document, &mut problems);
        assert!(problems.problems()[0].message.contains("Version must be a constant"));

        document.version = Some("1.2".to_string());
        let mut problems = ProblemCollector::new("child");
        check_constant_version(&document, &mut problems);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_inject_management_fills_gaps_only() {
        let mut managed = Dependency::new("org.acme", "lib", Some("2.0"));
        managed.scope = Some("test".to_string());
        let mut pinned = Dependency::new("org.acme", "pinned", Some("1.0"));
        pinned.scope = Some("runtime".to_string());

        let document = Document {
            dependencies: vec![
                Dependency::new("org.acme", "lib", None),
                Dependency::new("org.acme", "pinned", Some("1.5")),
            ],
            dependency_management: vec![managed, pinned],
            build: Some(Build {
                plugins: vec![Plugin {
                    group_id: Some("org.acme".to_string()),
                    artifact_id: Some("compiler".to_string()),
                    ..Plugin::default()
                }],
                plugin_management: vec![Plugin {
                    group_id: Some("org.acme".to_string()),
                    artifact_id: Some("compiler".to_string()),
                    version: Some("3.1".to_string()),
                    configuration: [("release".to_string(), "17".to_string())].into(),
                }],
                ..Build::default()
            }),
            ..Document::default()
        };

        let result = inject_management(&document);
        assert_eq!(result.dependencies[0].version.as_deref(), Some("2.0"));
        assert_eq!(result.dependencies[0].scope.as_deref(), Some("test"));
        assert_eq!(result.dependencies[1].version.as_deref(), Some("1.5"));
        assert_eq!(result.dependencies[1].scope.as_deref(), Some("runtime"));
        let plugin = &result.build.unwrap().plugins[0];
        assert_eq!(plugin.version.as_deref(), Some("3.1"));
        assert_eq!(plugin.configuration["release"], "17");
    }
}
