//! Model builder sessions.
//!
//! A [`ModelBuilder`] holds the collaborators; each [`ModelBuilderSession`] it
//! creates owns one cache, one cycle graph and one reactor, shared by every request
//! the session executes. File, raw and external-lookup results are reused across
//! requests of a session; effective results are dropped when their request ends.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pomr::model::DocumentSource;
//! use pomr::session::{BuildRequest, ModelBuilder, RequestKind};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let session = ModelBuilder::new().new_session();
//! let request = BuildRequest::new(DocumentSource::from_path("app/pom.toml"), RequestKind::Effective)
//!     .with_active_profiles(["ci"]);
//! let result = session.execute(&request).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod request;
pub mod result;

pub use request::{BuildRequest, RequestKind};
pub use result::BuildResult;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::activation::{ProfileSelector, unknown_profile_problems};
use crate::cache::RequestCache;
use crate::config::GlobalConfig;
use crate::constants::{DOCUMENT_FILE_NAME, default_parallelism};
use crate::core::{ModelBuildingError, PomrError};
use crate::graph::CycleGraph;
use crate::loader::DocumentLoader;
use crate::model::DocumentSource;
use crate::resolver::{Collaborators, DocumentResolver, Reactor, requested_profile_ids};
use crate::spi::{
    ConditionEvaluator, DocumentIo, InheritanceAssembler, Interpolator, LocalRepositoryResolver,
    MarkerRootLocator, ModelResolver, ModelValidator, ProfileInjector, RootLocator,
};

/// Configures collaborators and creates sessions.
#[derive(Clone)]
pub struct ModelBuilder {
    collaborators: Collaborators,
    root_locator: Arc<dyn RootLocator>,
    parallelism: usize,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self {
            collaborators: Collaborators::default(),
            root_locator: Arc::new(MarkerRootLocator),
            parallelism: default_parallelism(),
        }
    }
}

impl ModelBuilder {
    /// A builder with the default collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder searching the configured repositories with the configured
    /// parallelism.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured repository path cannot be expanded.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        let roots = config.repository_roots()?;
        debug!("repository roots: {roots:?}");
        Ok(Self::new()
            .with_model_resolver(Arc::new(LocalRepositoryResolver::new(roots)))
            .with_parallelism(config.max_parallel()))
    }

    /// Replace the document reader.
    #[must_use]
    pub fn with_document_io(mut self, io: Arc<dyn DocumentIo>) -> Self {
        self.collaborators.io = io;
        self
    }

    /// Replace the external resolver.
    #[must_use]
    pub fn with_model_resolver(mut self, resolver: Arc<dyn ModelResolver>) -> Self {
        self.collaborators.resolver = resolver;
        self
    }

    /// Replace the inheritance assembler.
    #[must_use]
    pub fn with_inheritance_assembler(mut self, assembler: Arc<dyn InheritanceAssembler>) -> Self {
        self.collaborators.assembler = assembler;
        self
    }

    /// Replace the profile injector.
    #[must_use]
    pub fn with_profile_injector(mut self, injector: Arc<dyn ProfileInjector>) -> Self {
        self.collaborators.injector = injector;
        self
    }

    /// Replace the interpolator.
    #[must_use]
    pub fn with_interpolator(mut self, interpolator: Arc<dyn Interpolator>) -> Self {
        self.collaborators.interpolator = interpolator;
        self
    }

    /// Replace the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ModelValidator>) -> Self {
        self.collaborators.validator = validator;
        self
    }

    /// Replace the root locator.
    #[must_use]
    pub fn with_root_locator(mut self, locator: Arc<dyn RootLocator>) -> Self {
        self.root_locator = locator;
        self
    }

    /// Evaluate free-form activation conditions with `evaluator`.
    #[must_use]
    pub fn with_condition_evaluator(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        self.collaborators.selector = Arc::new(ProfileSelector::new(evaluator));
        self
    }

    /// Default worker pool size of project builds.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// A session with fresh shared state.
    pub fn new_session(&self) -> ModelBuilderSession {
        ModelBuilderSession {
            resolver: DocumentResolver::new(self.collaborators.clone()),
            root_locator: Arc::clone(&self.root_locator),
            parallelism: self.parallelism,
        }
    }
}

/// Executes build requests over shared state.
#[derive(Clone)]
pub struct ModelBuilderSession {
    resolver: DocumentResolver,
    root_locator: Arc<dyn RootLocator>,
    parallelism: usize,
}

impl ModelBuilderSession {
    /// Run a request according to its kind.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub async fn execute(&self, request: &BuildRequest) -> Result<Arc<BuildResult>, PomrError> {
        match request.kind {
            RequestKind::Project => self.build(request).await,
            RequestKind::Effective | RequestKind::Parent | RequestKind::Import => {
                self.build_effective(request).await
            }
            RequestKind::RawOnly => self.build_raw_only(request).await,
        }
    }

    /// Build every document of the tree rooted at the request's source (or at the
    /// located root).
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::ModelBuilding`] with the result tree attached when any
    /// document has an Error or Fatal problem, or when the root cannot be read.
    pub async fn build(&self, request: &BuildRequest) -> Result<Arc<BuildResult>, PomrError> {
        let root = self.root_source(request).await;
        let project = request.derive(root, RequestKind::Project);
        let parallelism = request.max_parallel.unwrap_or(self.parallelism);
        info!("building project {} with {parallelism} workers", project.source);

        let loader = DocumentLoader::new(self.resolver.clone(), parallelism);
        let mut result = loader.load(&project).await;

        let declared: BTreeSet<String> = result
            .flatten()
            .into_iter()
            .flat_map(|r| r.declared_profiles.iter().cloned())
            .collect();
        result.problems.extend(unknown_profile_problems(&requested_profile_ids(request), &declared));
        self.finish(request, result)
    }

    /// Resolve one document to its effective model, without loading a tree.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::ModelBuilding`] when the result has an Error or Fatal
    /// problem.
    pub async fn build_effective(&self, request: &BuildRequest) -> Result<Arc<BuildResult>, PomrError> {
        let mut result = (*self.resolver.effective(request).await).clone();
        let requested = requested_profile_ids(request);
        result.problems.extend(unknown_profile_problems(&requested, &result.declared_profiles));
        self.finish(request, result)
    }

    /// Read and normalize one document.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::ModelBuilding`] when reading or validation failed.
    pub async fn build_raw_only(&self, request: &BuildRequest) -> Result<Arc<BuildResult>, PomrError> {
        let result = self.resolver.raw_only(request).await;
        self.finish(request, result)
    }

    /// The session's cache.
    pub fn cache(&self) -> &RequestCache {
        self.resolver.cache()
    }

    /// The session's cycle graph.
    pub fn graph(&self) -> &CycleGraph {
        self.resolver.graph()
    }

    /// The session's reactor.
    pub fn reactor(&self) -> &Reactor {
        self.resolver.reactor()
    }

    /// The resolver running the session's requests.
    pub fn resolver(&self) -> &DocumentResolver {
        &self.resolver
    }

    async fn root_source(&self, request: &BuildRequest) -> DocumentSource {
        if !request.locate_root {
            return request.source.clone();
        }
        let Some(start) = request.source.directory().map(PathBuf::from) else {
            return request.source.clone();
        };
        let locator = Arc::clone(&self.root_locator);
        let root = match tokio::task::spawn_blocking(move || locator.find_root(&start)).await {
            Ok(root) => root,
            Err(error) => {
                debug!("root lookup failed: {error}");
                return request.source.clone();
            }
        };
        let candidate = root.join(DOCUMENT_FILE_NAME);
        if candidate.is_file() {
            debug!("located root {}", candidate.display());
            DocumentSource::from_path(candidate)
        } else {
            request.source.clone()
        }
    }

    fn finish(&self, request: &BuildRequest, result: BuildResult) -> Result<Arc<BuildResult>, PomrError> {
        let cache = self.resolver.cache();
        cache.purge_request(request.request_id);
        cache.log_stats();

        let result = Arc::new(result);
        if result.file_document.is_none() || result.has_errors() {
            let problems = result.all_problems();
            return Err(ModelBuildingError::from_problems(&problems, Some(Arc::clone(&result))).into());
        }
        Ok(result)
    }
}
