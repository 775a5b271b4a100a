//! Parent lookup and as-parent lineage.
//!
//! A parent is looked up in three places, first hit wins:
//!
//! 1. the reactor, by coordinates (a version range picks the highest match), when
//!    the request allows reactor lookups;
//! 2. the relative path from the child's directory, `..` unless declared; an empty
//!    relative path skips this step;
//! 3. the external [`ModelResolver`](crate::spi::ModelResolver).
//!
//! A document found at the relative path whose coordinates differ from the parent
//! reference is not used: a "relativePath mismatch" problem names both coordinate
//! pairs and the lookup falls through to external resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Aborted, DocumentResolver, check_constant_version, step_node};
use crate::activation::{ActivationContext, ActivationRecord};
use crate::cache::{CacheKey, CacheTag};
use crate::constants::DEFAULT_PARENT_RELATIVE_PATH;
use crate::graph::parent_node;
use crate::core::{PomrError, Problem, ProblemCollector, Severity};
use crate::model::{Document, DocumentSource, ParentRef};
use crate::session::{BuildRequest, RequestKind};
use crate::spi::{Strictness, ValidationStage};
use crate::version::{Version, VersionRange};

/// Identities visited on the way from a top-level document up its parents.
///
/// Owned by one resolution path and passed by value; sibling paths never see
/// each other's entries.
#[derive(Debug, Clone, Default)]
pub struct ParentChain {
    entries: Vec<(String, String)>,
}

impl ParentChain {
    /// A chain starting at `document`.
    pub fn start(document: &Document, source: &DocumentSource) -> Self {
        Self {
            entries: vec![(document.id(), source.location().to_string())],
        }
    }

    /// Add an identity. Fails with the rendered chain when either the id or the
    /// location was visited before.
    pub fn visit(&mut self, id: &str, location: &str) -> Result<(), String> {
        let repeated = self.entries.iter().any(|(i, l)| i == id || l == location);
        self.entries.push((id.to_string(), location.to_string()));
        if repeated {
            return Err(self.render());
        }
        Ok(())
    }

    /// Number of identities in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn render(&self) -> String {
        self.entries.iter().map(|(id, _)| id.as_str()).collect::<Vec<_>>().join(" -> ")
    }
}

/// A parent with its lineage resolved and its profiles applied.
#[derive(Debug, Clone)]
pub struct ResolvedParent {
    /// The as-parent document
    pub document: Arc<Document>,
    /// Profiles activated along the lineage
    pub profiles: Vec<String>,
    /// Profiles declared along the lineage
    pub declared: BTreeSet<String>,
}

/// One resolved lineage, shared between every child whose environment matches.
#[derive(Debug)]
pub(crate) struct Lineage {
    document: Option<Arc<Document>>,
    problems: ProblemCollector,
    profiles: Vec<String>,
    declared: BTreeSet<String>,
}

impl Lineage {
    fn failed(problems: ProblemCollector) -> Self {
        Self {
            document: None,
            problems,
            profiles: Vec::new(),
            declared: BTreeSet::new(),
        }
    }
}

/// Request settings a lineage depends on besides profile activation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineageSettings {
    strictness: Strictness,
    repositories: Vec<String>,
    allow_reactor: bool,
}

impl LineageSettings {
    fn of(request: &BuildRequest) -> Self {
        Self {
            strictness: request.strictness,
            repositories: request.repositories.clone(),
            allow_reactor: request.allow_reactor,
        }
    }
}

type Variants = Mutex<Vec<(LineageSettings, ActivationRecord, Arc<Lineage>)>>;

fn version_matches(declared: &str, actual: Option<&str>) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    if VersionRange::is_range(declared) {
        return VersionRange::parse(declared).is_ok_and(|range| range.contains(&Version::parse(actual)));
    }
    declared == actual
}

fn parent_matches(reference: &ParentRef, candidate: &Document) -> bool {
    reference.group_id.as_deref() == candidate.effective_group_id()
        && reference.artifact_id == candidate.artifact_id
        && reference.version.as_deref().is_some_and(|v| version_matches(v, candidate.effective_version()))
}

fn cycle_problem(child: &Document, chain: &str) -> Problem {
    Problem::new(Severity::Fatal, format!("The parents form a cycle: {chain}"))
        .with_field("parent")
        .with_location(child.location("parent"))
}

impl DocumentResolver {
    /// Locate, cycle-check and resolve the parent of `child`, the document of
    /// `request`.
    pub(crate) fn resolve_parent<'a>(
        &'a self,
        child: &'a Arc<Document>,
        request: &'a BuildRequest,
        ctx: &'a mut ActivationContext,
        mut chain: ParentChain,
        problems: &'a mut ProblemCollector,
    ) -> BoxFuture<'a, Result<Option<ResolvedParent>, Aborted>> {
        Box::pin(async move {
            let Some(reference) = &child.parent else {
                return Ok(None);
            };
            let source = self.locate_parent(child, reference, request, problems).await?;

            if let Err(error) = self.graph.add_edge(&step_node(request), &parent_node(source.location())) {
                let chain = match &error {
                    PomrError::CycleDetected { chain } => chain.clone(),
                    other => other.to_string(),
                };
                problems.push(cycle_problem(child, &chain));
                return Err(Aborted);
            }
            if let Err(rendered) = chain.visit(&reference.coordinates().to_string(), source.location()) {
                problems.push(cycle_problem(child, &rendered));
                return Err(Aborted);
            }

            let derived = request.derive(source, RequestKind::Parent);
            let lineage = self.as_parent(&derived, ctx, chain).await;
            problems.merge(&lineage.problems);
            match &lineage.document {
                Some(document) => Ok(Some(ResolvedParent {
                    document: Arc::clone(document),
                    profiles: lineage.profiles.clone(),
                    declared: lineage.declared.clone(),
                })),
                None => Err(Aborted),
            }
        })
    }

    async fn locate_parent(
        &self,
        child: &Document,
        reference: &ParentRef,
        request: &BuildRequest,
        problems: &mut ProblemCollector,
    ) -> Result<DocumentSource, Aborted> {
        let (Some(group_id), Some(artifact_id), Some(version)) =
            (&reference.group_id, &reference.artifact_id, &reference.version)
        else {
            // Reported by validation.
            return Err(Aborted);
        };
        let child_source = &request.source;

        if request.allow_reactor
            && let Some(source) = self.reactor.find(group_id, artifact_id, version)
            && source != *child_source
        {
            debug!("parent of {} found in reactor: {source}", child.id());
            return Ok(source);
        }

        let (relative, explicit) = match reference.relative_path.as_deref() {
            Some(path) => (path, true),
            None => (DEFAULT_PARENT_RELATIVE_PATH, false),
        };
        if !relative.is_empty()
            && let Some(candidate) = child_source.resolve(relative)
            && candidate != *child_source
        {
            match self.read_file(&candidate).await {
                Ok(document) if parent_matches(reference, &document) => {
                    debug!("parent of {} found at {candidate}", child.id());
                    return Ok(candidate);
                }
                Ok(document) => {
                    let severity = if explicit { Severity::Fatal } else { Severity::Warning };
                    problems.push(
                        Problem::new(
                            severity,
                            format!(
                                "relativePath '{relative}' of {} points at {} instead of {}, please verify your project structure",
                                child.id(),
                                document.coordinates().map_or_else(|| document.id(), |c| c.to_string()),
                                reference.coordinates()
                            ),
                        )
                        .with_field("parent.relative-path")
                        .with_location(
                            child.location("parent.relative-path").or_else(|| child.location("parent")),
                        ),
                    );
                }
                Err(error) => {
                    warn!("ignoring unreadable parent candidate {candidate}: {error}");
                }
            }
        }

        let coordinates = reference.coordinates();
        let mut repositories = request.repositories.clone();
        repositories.extend(child.repositories.iter().cloned());
        match self.resolve_external(&coordinates, &repositories).await {
            Ok(source) => Ok(source),
            Err(error) => {
                problems.push(
                    Problem::new(
                        Severity::Fatal,
                        format!("Non-resolvable parent {coordinates} of {}", child.id()),
                    )
                    .with_field("parent")
                    .with_location(child.location("parent"))
                    .with_cause(error.to_string()),
                );
                Err(Aborted)
            }
        }
    }

    /// The lineage of the request's document used as a parent, activated in `ctx`.
    ///
    /// Memoized per source; a stored variant is reused when it was built with the
    /// same strictness, repositories and reactor setting and its activation record
    /// matches `ctx`. Its record is absorbed into any recording open in `ctx`.
    pub(crate) fn as_parent<'a>(
        &'a self,
        request: &'a BuildRequest,
        ctx: &'a mut ActivationContext,
        chain: ParentChain,
    ) -> BoxFuture<'a, Arc<Lineage>> {
        Box::pin(async move {
            let key = CacheKey::source(&request.source, CacheTag::Parent);
            let variants = match self
                .cache
                .compute(key, || async { Ok::<_, PomrError>(Variants::default()) })
                .await
            {
                Ok(variants) => variants,
                Err(_) => Arc::new(Variants::default()),
            };

            let settings = LineageSettings::of(request);
            let mut variants = variants.lock().await;
            let current: &ActivationContext = ctx;
            if let Some((_, record, lineage)) = variants
                .iter()
                .find(|(stored, record, _)| *stored == settings && record.matches(current))
            {
                debug!("reusing as-parent variant of {} ({} lookups)", request.source, record.len());
                ctx.absorb(record);
                return Arc::clone(lineage);
            }

            let previous = ctx.start();
            let lineage = Arc::new(self.compute_lineage(request, ctx, chain).await);
            let record = ctx.stop(previous);
            debug!(
                "stored as-parent variant {} of {} ({} lookups)",
                variants.len() + 1,
                request.source,
                record.len()
            );
            variants.push((settings, record, Arc::clone(&lineage)));
            lineage
        })
    }

    async fn compute_lineage(
        &self,
        request: &BuildRequest,
        ctx: &mut ActivationContext,
        chain: ParentChain,
    ) -> Lineage {
        let source = &request.source;
        let mut problems = ProblemCollector::new(source.location());
        let raw = match self.raw(source).await {
            Ok(raw) => raw,
            Err(error) => {
                problems.push(
                    Problem::new(Severity::Fatal, format!("Failed to read parent {source}"))
                        .with_cause(error.to_string()),
                );
                return Lineage::failed(problems);
            }
        };
        problems.set_document(raw.id());
        self.validate(&raw, ValidationStage::Raw, request, &mut problems);
        check_constant_version(&raw, &mut problems);
        if problems.has_fatal() {
            return Lineage::failed(problems);
        }

        let mut declared: BTreeSet<String> = raw.profiles.iter().map(|p| p.id.clone()).collect();
        let active = self.activate(&raw, source.location(), request, ctx, &mut problems).await;
        let mut profiles: Vec<String> = active.iter().map(|p| p.id.clone()).collect();
        let injected = self.collaborators.injector.inject(&raw, &active);

        let document = match self.resolve_parent(&raw, request, ctx, chain, &mut problems).await {
            Err(Aborted) => return Lineage::failed(problems),
            Ok(None) => injected,
            Ok(Some(grandparent)) => {
                profiles.extend(grandparent.profiles);
                declared.extend(grandparent.declared);
                self.collaborators.assembler.assemble(&injected, &grandparent.document)
            }
        };

        Lineage {
            document: Some(Arc::new(document)),
            problems,
            profiles,
            declared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_detects_repeats() {
        let root = Document {
            group_id: Some("org.acme".to_string()),
            artifact_id: Some("a".to_string()),
            version: Some("1".to_string()),
            ..Document::default()
        };
        let mut chain = ParentChain::start(&root, &DocumentSource::from_location("a"));
        assert!(chain.visit("org.acme:b:1", "b").is_ok());

        let mut sibling = chain.clone();
        assert!(sibling.visit("org.acme:c:1", "c").is_ok());
        assert_eq!(chain.len(), 2);

        let error = chain.visit("org.acme:a:1", "elsewhere").unwrap_err();
        assert_eq!(error, "org.acme:a:1 -> org.acme:b:1 -> org.acme:a:1");
    }

    #[test]
    fn test_version_matching() {
        assert!(version_matches("1.0", Some("1.0")));
        assert!(!version_matches("1.0", Some("1.1")));
        assert!(version_matches("[1.0,2.0)", Some("1.5")));
        assert!(!version_matches("[1.0,2.0)", Some("2.0")));
        assert!(!version_matches("1.0", None));
    }
}
