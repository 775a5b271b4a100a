//! pomr - effective build-description resolver
//!
//! Reads `pom.toml` build descriptions and resolves each one into its *effective*
//! form: the parent lineage merged in, active profiles applied, dependency-management
//! bundles imported, managed versions filled in and `${...}` placeholders expanded.
//! Whole trees of documents are loaded and resolved concurrently.
//!
//! # Architecture Overview
//!
//! A build runs against a [`session::ModelBuilderSession`]. The session owns the
//! state shared by every document of the build:
//!
//! - a [`cache::RequestCache`] that runs each stage at most once per key, with
//!   concurrent requesters waiting for the first one;
//! - a [`graph::CycleGraph`] of parent and import edges that refuses the edge which
//!   would close a cycle;
//! - a [`resolver::Reactor`] of the documents loaded as part of the build.
//!
//! Each document goes through the pipeline in [`resolver`]: file, raw, profiles,
//! parent, imports, management, interpolation and effective validation. How
//! documents are read, merged, interpolated and validated is delegated to the
//! traits in [`spi`], with default implementations for `pom.toml` files and a local
//! repository.
//!
//! Profile activation ([`activation`]) records every environment value it reads.
//! A parent resolved for one child is reused for any other child whose environment
//! gives the same answers to those reads.
//!
//! # Core Modules
//!
//! - [`activation`] - profile activators and the recording activation context
//! - [`cache`] - run-once, request-scoped cache
//! - [`cli`] - command-line interface
//! - [`config`] - global configuration (`~/.pomr/config.toml`)
//! - [`core`] - errors, problems and problem collection
//! - [`graph`] - cycle detection
//! - [`loader`] - parallel loading of document trees
//! - [`model`] - the document model and document sources
//! - [`resolver`] - the per-document pipeline, parents and imports
//! - [`session`] - builders, sessions, requests and results
//! - [`spi`] - collaborator traits and their default implementations
//! - [`version`] - version ordering and version ranges
//!
//! # Document Format (pom.toml)
//!
//! ```toml
//! artifact-id = "app"
//! version = "1.4"
//! description = "${project.artifact-id} for ${env.USER}"
//!
//! [parent]
//! group-id = "org.acme"
//! artifact-id = "base"
//! version = "[1.0,2.0)"
//!
//! [properties]
//! release = "17"
//!
//! [[dependency-management]]
//! group-id = "org.acme"
//! artifact-id = "platform"
//! version = "3.2"
//! type = "pom"
//! scope = "import"
//!
//! [[profiles]]
//! id = "ci"
//! activation = { property = { name = "env.CI" } }
//! properties = { release = "21" }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use pomr::model::DocumentSource;
//! use pomr::session::{BuildRequest, ModelBuilder, RequestKind};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let session = ModelBuilder::new().new_session();
//! let request = BuildRequest::new(DocumentSource::from_path("pom.toml"), RequestKind::Project);
//! let result = session.build(&request).await?;
//! print!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod graph;
pub mod loader;
pub mod model;
pub mod pattern;
pub mod resolver;
pub mod session;
pub mod spi;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
