//! Error handling for pomr
//!
//! This module provides the error types and user-friendly error reporting used across
//! the resolver. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`PomrError`] - Enumerated error types for all hard failures
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Build problems (missing coordinates, duplicate declarations, cycles found while
//! resolving a document) are *not* errors in this sense: they are collected as
//! [`Problem`](crate::core::Problem)s and only surface as a
//! [`PomrError::ModelBuilding`] once every problem of a request has been gathered.
//!
//! # Cloning
//!
//! [`PomrError`] is `Clone`. The request cache stores failed computations and hands
//! the identical error to every later requester, so every variant only carries owned
//! strings. Foreign errors (`std::io::Error`, `toml::de::Error`) are flattened into
//! their message when they are converted.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pomr::core::{PomrError, ErrorContext};
//!
//! let error = PomrError::ReadFailure {
//!     location: "app/pom.toml".to_string(),
//!     reason: "unexpected end of file".to_string(),
//! };
//! let context = ErrorContext::new(error)
//!     .with_suggestion("Check the TOML syntax of the document")
//!     .with_details("Documents are read as TOML with kebab-case keys");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::core::problem::ModelBuildingError;

/// The main error type for pomr operations.
///
/// # Error Categories
///
/// ## Document access
/// - [`ReadFailure`] - a document could not be read or parsed
/// - [`Unresolvable`] - an external document could not be located by coordinates
/// - [`IoError`] - a plain I/O failure outside of document reading
///
/// ## Resolution
/// - [`CycleDetected`] - a parent, import or aggregation edge closed a cycle
/// - [`InvalidVersionRange`] - a version range could not be parsed
/// - [`InvalidCondition`] - a profile activation condition could not be evaluated
/// - [`ModelBuilding`] - the aggregated problems of a build request
///
/// ## Configuration
/// - [`ConfigError`] - the global configuration file is invalid
///
/// [`ReadFailure`]: PomrError::ReadFailure
/// [`Unresolvable`]: PomrError::Unresolvable
/// [`IoError`]: PomrError::IoError
/// [`CycleDetected`]: PomrError::CycleDetected
/// [`InvalidVersionRange`]: PomrError::InvalidVersionRange
/// [`InvalidCondition`]: PomrError::InvalidCondition
/// [`ModelBuilding`]: PomrError::ModelBuilding
/// [`ConfigError`]: PomrError::ConfigError
#[derive(Error, Debug, Clone)]
pub enum PomrError {
    /// A document could not be read or decoded.
    ///
    /// # Fields
    /// - `location`: the document source location
    /// - `reason`: the decoder or I/O message
    #[error("Failed to read document {location}: {reason}")]
    ReadFailure {
        /// Location of the document that failed to read
        location: String,
        /// Reason reported by the reader
        reason: String,
    },

    /// An external document could not be resolved from its coordinates.
    #[error("Cannot resolve {coordinates}: {reason}")]
    Unresolvable {
        /// `group:artifact:version` of the requested document
        coordinates: String,
        /// Why the lookup failed
        reason: String,
    },

    /// A directed edge in one of the resolution graphs would close a cycle.
    ///
    /// `chain` lists the complete offending path, starting and ending with the same
    /// node, joined with ` -> `.
    #[error("Cycle detected: {chain}")]
    CycleDetected {
        /// The complete cycle, e.g. `a -> b -> a`
        chain: String,
    },

    /// A version range specification is malformed.
    #[error("Invalid version range '{range}': {reason}")]
    InvalidVersionRange {
        /// The range that failed to parse
        range: String,
        /// What is wrong with it
        reason: String,
    },

    /// A profile activation condition is malformed.
    #[error("Invalid activation condition '{condition}': {reason}")]
    InvalidCondition {
        /// The condition text
        condition: String,
        /// Parser or evaluator message
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// The problems of a build request contained errors.
    #[error("{0}")]
    ModelBuilding(Box<ModelBuildingError>),

    /// IO error
    #[error("IO error: {message}")]
    IoError {
        /// The flattened I/O error message
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl From<std::io::Error> for PomrError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError {
            message: error.to_string(),
        }
    }
}

impl From<ModelBuildingError> for PomrError {
    fn from(error: ModelBuildingError) -> Self {
        Self::ModelBuilding(Box::new(error))
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PomrError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: PomrError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining why the error occurred.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions where we know the
/// failure mode.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(pomr_error) = error.downcast_ref::<PomrError>() {
        return create_error_context(pomr_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(PomrError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax: verify quotes, brackets, and key names")
        .with_details("TOML parsing errors are usually caused by syntax issues like missing quotes or mismatched brackets");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(PomrError::Other {
        message,
    })
}

fn create_error_context(error: PomrError) -> ErrorContext {
    match &error {
        PomrError::ReadFailure { location, .. } => {
            let suggestion = format!(
                "Check that {location} exists and is a valid pom.toml document (kebab-case keys)"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Documents are decoded as TOML before any resolution happens")
        }
        PomrError::Unresolvable { coordinates, .. } => {
            let suggestion = format!(
                "Install {coordinates} into the local repository or add it to the build as a module"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Parents and imported bundles are looked up in the reactor, then by relative path, then in the configured repositories")
        }
        PomrError::CycleDetected { .. } => ErrorContext::new(error)
            .with_suggestion("Review the parent, import and module declarations listed in the cycle and remove the back reference")
            .with_details("A document cannot be its own ancestor, import itself, or aggregate itself"),
        PomrError::InvalidVersionRange { .. } => ErrorContext::new(error)
            .with_suggestion("Use a range such as [1.0,2.0), [1.5,) or (,1.0]"),
        PomrError::ModelBuilding(_) => ErrorContext::new(error)
            .with_suggestion("Fix the problems listed above; run with --verbose for the resolution trace"),
        PomrError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.pomr/config.toml or the file given by POMR_CONFIG_PATH"),
        _ => ErrorContext::new(error),
    }
}
