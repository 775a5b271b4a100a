//! Core types shared by every part of the resolver.
//!
//! - [`error`] - the hard failure type [`PomrError`] and CLI-facing [`ErrorContext`]
//! - [`problem`] - build problems, the [`ProblemCollector`] sink and the composite
//!   [`ModelBuildingError`]
//!
//! The split mirrors the two ways things go wrong while resolving documents. A
//! `PomrError` means an operation could not be performed at all (a file could not be
//! read, external coordinates could not be resolved). A `Problem` is something wrong
//! *with* a document; it is recorded, attributed to the document, and resolution goes
//! on as far as it sensibly can.

pub mod error;
pub mod problem;

pub use error::{ErrorContext, PomrError, user_friendly_error};
pub use problem::{InputLocation, ModelBuildingError, Problem, ProblemCollector, Severity};
