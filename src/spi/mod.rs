//! Collaborator interfaces and their default implementations.
//!
//! The resolution engine decides *when* documents are read, merged, interpolated
//! and validated; *how* each of those steps is done is delegated through the traits
//! in this module. [`ModelBuilder`](crate::session::ModelBuilder) is assembled from
//! one implementation of each.
//!
//! | Trait                   | Default                         |
//! |-------------------------|---------------------------------|
//! | [`DocumentIo`]          | [`TomlDocumentIo`]              |
//! | [`ModelResolver`]       | [`LocalRepositoryResolver`]     |
//! | [`InheritanceAssembler`]| [`DefaultInheritanceAssembler`] |
//! | [`ProfileInjector`]     | [`DefaultProfileInjector`]      |
//! | [`Interpolator`]        | [`RegexInterpolator`]           |
//! | [`ModelValidator`]      | [`DefaultModelValidator`]       |
//! | [`RootLocator`]         | [`MarkerRootLocator`]           |
//! | [`ConditionEvaluator`]  | [`BasicConditionEvaluator`]     |
//!
//! Every trait is synchronous. The engine runs blocking implementations (file I/O,
//! repository lookups) on the blocking thread pool.

pub mod condition;
pub mod inheritance;
pub mod interpolation;
pub mod repository;
pub mod root;
pub mod toml_io;
pub mod validation;

pub use condition::BasicConditionEvaluator;
pub use inheritance::{DefaultInheritanceAssembler, DefaultProfileInjector};
pub use interpolation::RegexInterpolator;
pub use repository::LocalRepositoryResolver;
pub use root::MarkerRootLocator;
pub use toml_io::TomlDocumentIo;
pub use validation::{DefaultModelValidator, Strictness, ValidationStage};

use std::path::{Path, PathBuf};

use crate::activation::ActivationContext;
use crate::core::{PomrError, Problem};
use crate::model::{Coordinates, Document, DocumentSource, Profile};

/// Reads and writes documents.
pub trait DocumentIo: Send + Sync {
    /// Decode the document behind a source.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::ReadFailure`] if the source cannot be read or decoded.
    fn read(&self, source: &DocumentSource) -> Result<Document, PomrError>;

    /// Encode a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    fn write(&self, document: &Document) -> Result<String, PomrError>;
}

/// Locates documents outside the build by coordinates.
pub trait ModelResolver: Send + Sync {
    /// Find the document for `coordinates`, searching `repositories` first.
    ///
    /// A version range resolves to the highest matching version.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::Unresolvable`] when nothing matches.
    fn resolve(
        &self,
        coordinates: &Coordinates,
        repositories: &[String],
    ) -> Result<DocumentSource, PomrError>;
}

/// Merges a parent into a child.
pub trait InheritanceAssembler: Send + Sync {
    /// The child with everything it inherits from `parent` filled in.
    fn assemble(&self, child: &Document, parent: &Document) -> Document;
}

/// Applies active profiles to a document.
pub trait ProfileInjector: Send + Sync {
    /// The document with `profiles` injected, in order.
    fn inject(&self, document: &Document, profiles: &[Profile]) -> Document;
}

/// Expands `${...}` placeholders.
pub trait Interpolator: Send + Sync {
    /// Expand every placeholder `lookup` can answer; leave the rest untouched.
    fn interpolate(&self, text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String;
}

/// Checks documents at the file, raw and effective checkpoints.
pub trait ModelValidator: Send + Sync {
    /// Problems found in `document` at `stage`.
    fn validate(
        &self,
        document: &Document,
        stage: ValidationStage,
        strictness: Strictness,
    ) -> Vec<Problem>;
}

/// Finds the top of a multi-document tree.
pub trait RootLocator: Send + Sync {
    /// The root directory for a build started in `start`.
    fn find_root(&self, start: &Path) -> PathBuf;
}

/// Evaluates free-form activation conditions.
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluate `condition`; every lookup goes through `ctx` so it is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::InvalidCondition`] when the condition does not parse.
    fn evaluate(&self, condition: &str, ctx: &mut ActivationContext) -> Result<bool, PomrError>;
}
