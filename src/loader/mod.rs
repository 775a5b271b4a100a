//! Loading a tree of documents.
//!
//! A project build runs in three phases over one [`TaskPool`]:
//!
//! 1. **Load**: starting at the root, every document is read and registered in the
//!    reactor. Each loaded aggregator submits its modules as further tasks. The
//!    phase ends when the pool is idle, so the reactor is complete before anything
//!    looks into it.
//! 2. **Resolve**: the effective model of every loaded document is computed, one task
//!    per document.
//! 3. **Assemble**: the result tree is built by a depth-first walk from the root in
//!    declared module order. Back references, duplicates and missing modules are
//!    reported here, so the outcome does not depend on task scheduling.

pub mod executor;

pub use executor::TaskPool;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::constants::DOCUMENT_FILE_NAME;
use crate::core::{Problem, Severity};
use crate::model::{Document, DocumentSource};
use crate::resolver::DocumentResolver;
use crate::session::{BuildRequest, BuildResult, RequestKind};

/// A module reference as declared (or discovered) by an aggregator.
#[derive(Debug, Clone)]
struct ModuleRef {
    name: String,
    source: Option<DocumentSource>,
}

#[derive(Debug, Default)]
struct LoadState {
    claimed: DashSet<DocumentSource>,
    modules: DashMap<DocumentSource, (Arc<Document>, Vec<ModuleRef>)>,
    results: DashMap<DocumentSource, Arc<BuildResult>>,
}

/// Loads and resolves every document below a root.
#[derive(Clone)]
pub struct DocumentLoader {
    resolver: DocumentResolver,
    pool: TaskPool,
}

/// Immediate subdirectories of `directory` that contain a document, by name.
fn discover_modules(directory: &Path) -> Vec<String> {
    WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir() && entry.path().join(DOCUMENT_FILE_NAME).is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}

impl DocumentLoader {
    /// A loader running at most `parallelism` tasks at once.
    pub fn new(resolver: DocumentResolver, parallelism: usize) -> Self {
        Self {
            resolver,
            pool: TaskPool::new(parallelism),
        }
    }

    /// The pool size.
    pub fn parallelism(&self) -> usize {
        self.pool.size()
    }

    /// Load the tree below `request.source` and resolve every document in it.
    pub async fn load(&self, request: &BuildRequest) -> BuildResult {
        let state = Arc::new(LoadState::default());

        self.spawn_load(Arc::clone(&state), request.source.clone());
        self.pool.wait().await;
        info!(
            "loaded {} documents ({} in reactor)",
            state.claimed.len(),
            self.resolver.reactor().len()
        );

        // sorted and started in order, so a pool of one resolves the same way every run
        let mut sources: Vec<DocumentSource> = state.claimed.iter().map(|s| s.key().clone()).collect();
        sources.sort_by(|a, b| a.location().cmp(b.location()));
        for source in sources {
            let resolver = self.resolver.clone();
            let state = Arc::clone(&state);
            let derived = request.derive(source.clone(), RequestKind::Effective);
            self.pool
                .submit_in_order(async move {
                    let result = resolver.effective(&derived).await;
                    state.results.insert(source, result);
                })
                .await;
        }
        self.pool.wait().await;
        info!("resolved {} effective models", state.results.len());

        let mut assembled = HashSet::new();
        let mut branch = Vec::new();
        self.assemble(&state, &request.source, &mut branch, &mut assembled)
    }

    fn spawn_load(&self, state: Arc<LoadState>, source: DocumentSource) {
        if !state.claimed.insert(source.clone()) {
            return;
        }
        let loader = self.clone();
        self.pool.submit(async move {
            let document = match loader.resolver.read_file(&source).await {
                Ok(document) => document,
                Err(error) => {
                    warn!("cannot load {source}: {error}");
                    return;
                }
            };
            loader.resolver.reactor().register(&document, &source);

            let names = loader.module_names(&document, &source).await;
            let mut modules = Vec::with_capacity(names.len());
            for name in names {
                let module = source.resolve(&name);
                if let Some(child) = &module {
                    loader.spawn_load(Arc::clone(&state), child.clone());
                }
                modules.push(ModuleRef { name, source: module });
            }
            debug!("{source} aggregates {} modules", modules.len());
            state.modules.insert(source, (document, modules));
        });
    }

    async fn module_names(&self, document: &Document, source: &DocumentSource) -> Vec<String> {
        if !document.modules.is_empty() {
            return document.modules.clone();
        }
        if document.packaging() != "pom" {
            return Vec::new();
        }
        let Some(directory) = source.directory().map(PathBuf::from) else {
            return Vec::new();
        };
        match tokio::task::spawn_blocking(move || discover_modules(&directory)).await {
            Ok(names) => names,
            Err(error) => {
                warn!("module discovery below {source} failed: {error}");
                Vec::new()
            }
        }
    }

    fn assemble(
        &self,
        state: &LoadState,
        source: &DocumentSource,
        branch: &mut Vec<String>,
        assembled: &mut HashSet<String>,
    ) -> BuildResult {
        assembled.insert(source.location().to_string());
        let mut result = match state.results.get(source) {
            Some(result) => (**result).clone(),
            None => BuildResult::new(source.clone()),
        };
        let Some(entry) = state.modules.get(source) else {
            return result;
        };
        let (document, modules) = entry.value();
        let document = Arc::clone(document);
        let modules = modules.clone();
        drop(entry);

        branch.push(source.location().to_string());
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for (index, module) in modules.iter().enumerate() {
            let location = document
                .location(&format!("modules.{index}"))
                .or_else(|| document.location("modules"));
            let Some(child) = &module.source else {
                result.problems.push(
                    Problem::new(
                        Severity::Error,
                        format!("Child module '{}' of {} does not exist", module.name, document.id()),
                    )
                    .with_field("modules")
                    .with_location(location),
                );
                continue;
            };
            let child_location = child.location().to_string();

            if let Some(first) = seen.get(&child_location) {
                result.problems.push(
                    Problem::new(
                        Severity::Error,
                        format!("Duplicate module '{}' (same document as '{first}')", module.name),
                    )
                    .with_field("modules")
                    .with_location(location),
                );
                continue;
            }
            seen.insert(child_location.clone(), module.name.clone());

            if let Some(start) = branch.iter().position(|visited| *visited == child_location) {
                let mut cycle: Vec<&str> = branch[start..].iter().map(String::as_str).collect();
                cycle.push(&child_location);
                result.problems.push(
                    Problem::new(Severity::Fatal, format!("The modules form a cycle: {}", cycle.join(" -> ")))
                        .with_field("modules")
                        .with_location(location),
                );
                continue;
            }
            if assembled.contains(&child_location) {
                result.problems.push(
                    Problem::new(
                        Severity::Error,
                        format!("Duplicate module '{}': {child_location} is aggregated more than once", module.name),
                    )
                    .with_field("modules")
                    .with_location(location),
                );
                continue;
            }

            let child_result = self.assemble(state, child, branch, assembled);
            result.children.push(Arc::new(child_result));
        }
        branch.pop();
        result
    }
}
