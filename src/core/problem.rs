//! Build problems and the collector every resolution stage reports into.
//!
//! Resolution does not stop at the first thing that is wrong with a document. Each
//! stage records [`Problem`]s into the [`ProblemCollector`] of the document being
//! built, sub-resolutions (parents, imports, modules) merge their collectors into the
//! caller's, and only the top-level build turns the collected problems into a
//! [`ModelBuildingError`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::session::BuildResult;

/// How bad a problem is.
///
/// Ordered from least to most severe so `max()` yields the worst problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Style or deprecation advisory.
    Warning,
    /// Recorded, resolution continues with a best-effort value.
    Error,
    /// Aborts resolution of the current document.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Where in which document something was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InputLocation {
    /// Location of the document (see [`DocumentSource::location`](crate::model::DocumentSource::location)).
    pub source: String,
    /// 1-based line, when known.
    pub line: Option<usize>,
    /// 1-based column, when known.
    pub column: Option<usize>,
}

impl InputLocation {
    /// A location without line information.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            line: None,
            column: None,
        }
    }

    /// A location pointing at a line and column.
    pub fn at(source: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            source: source.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl fmt::Display for InputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}, line {line}, column {column}", self.source),
            (Some(line), None) => write!(f, "{}, line {line}", self.source),
            _ => write!(f, "{}", self.source),
        }
    }
}

/// A single problem found while building a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Severity of the problem.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Field path within the document, e.g. `parent.relative-path`.
    pub field: Option<String>,
    /// Source location of the offending declaration.
    pub location: Option<InputLocation>,
    /// Message of the underlying failure, if any.
    pub cause: Option<String>,
    /// Id of the document the problem was reported for.
    pub document: String,
}

impl Problem {
    /// Create a problem without field, location or cause.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            field: None,
            location: None,
            cause: None,
            document: String::new(),
        }
    }

    /// Attach the field path.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach a source location.
    pub fn with_location(mut self, location: Option<InputLocation>) -> Self {
        self.location = location;
        self
    }

    /// Attach the cause.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " ({field})")?;
        }
        if let Some(location) = &self.location {
            write!(f, " @ {location}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Accumulates the problems of one document.
///
/// The collector knows which document it reports for so that problems merged from
/// sub-resolutions keep the id of the document that actually caused them.
#[derive(Debug, Clone, Default)]
pub struct ProblemCollector {
    document: String,
    problems: Vec<Problem>,
}

impl ProblemCollector {
    /// Create an empty collector for the given document id.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            problems: Vec::new(),
        }
    }

    /// The document id problems are attributed to.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Re-attribute the collector once the document id becomes known.
    ///
    /// Problems already attributed to the old id follow the rename.
    pub fn set_document(&mut self, document: impl Into<String>) {
        let document = document.into();
        for problem in &mut self.problems {
            if problem.document == self.document {
                problem.document = document.clone();
            }
        }
        self.document = document;
    }

    /// The problem sink: record a problem with optional location and cause.
    pub fn add(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        location: Option<InputLocation>,
        cause: Option<String>,
    ) {
        let mut problem = Problem::new(severity, message).with_location(location);
        problem.cause = cause;
        self.push(problem);
    }

    /// Record a fully built problem.
    pub fn push(&mut self, mut problem: Problem) {
        if problem.document.is_empty() {
            problem.document = self.document.clone();
        }
        tracing::debug!("{}: {}", problem.document, problem);
        self.problems.push(problem);
    }

    /// Record several problems.
    pub fn extend(&mut self, problems: impl IntoIterator<Item = Problem>) {
        for problem in problems {
            self.push(problem);
        }
    }

    /// Merge the problems of a sub-resolution, keeping their attribution.
    ///
    /// Problems already present (same severity, message, location and document) are
    /// skipped so a parent shared by many paths is not reported once per path.
    pub fn merge(&mut self, other: &ProblemCollector) {
        for problem in &other.problems {
            if !self.problems.contains(problem) {
                self.problems.push(problem.clone());
            }
        }
    }

    /// All problems recorded so far.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// The worst severity recorded, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.problems.iter().map(|p| p.severity).max()
    }

    /// Whether an Error or Fatal problem was recorded.
    pub fn has_errors(&self) -> bool {
        self.max_severity().is_some_and(|s| s >= Severity::Error)
    }

    /// Whether a Fatal problem was recorded.
    pub fn has_fatal(&self) -> bool {
        self.max_severity() == Some(Severity::Fatal)
    }

    /// Number of problems of the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.problems.iter().filter(|p| p.severity == severity).count()
    }

    /// Whether the collector is empty.
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Composite failure of a build request.
///
/// Carries every problem of the request grouped by document, and the partial result
/// tree for diagnostics when one could be produced.
#[derive(Debug, Clone)]
pub struct ModelBuildingError {
    /// `(document id, problems)` in result-tree order.
    pub groups: Vec<(String, Vec<Problem>)>,
    /// The (partial) result of the build, when available.
    pub result: Option<Arc<BuildResult>>,
}

impl ModelBuildingError {
    /// Build the composite error from problems, grouping them by document id.
    pub fn from_problems(problems: &[Problem], result: Option<Arc<BuildResult>>) -> Self {
        let mut groups: Vec<(String, Vec<Problem>)> = Vec::new();
        for problem in problems {
            match groups.iter_mut().find(|(id, _)| *id == problem.document) {
                Some((_, list)) => list.push(problem.clone()),
                None => groups.push((problem.document.clone(), vec![problem.clone()])),
            }
        }
        Self {
            groups,
            result,
        }
    }

    /// Total number of problems.
    pub fn problem_count(&self) -> usize {
        self.groups.iter().map(|(_, p)| p.len()).sum()
    }

    /// Iterate over every problem.
    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.groups.iter().flat_map(|(_, p)| p.iter())
    }
}

impl fmt::Display for ModelBuildingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.problem_count();
        write!(
            f,
            "{count} problem{} encountered while building the effective model",
            if count == 1 { " was" } else { "s were" }
        )?;
        for (document, problems) in &self.groups {
            write!(f, "\n  {document}")?;
            for problem in problems {
                write!(f, "\n    - {problem}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ModelBuildingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn test_collector_attribution_and_rename() {
        let mut collector = ProblemCollector::new("pom.toml");
        collector.add(Severity::Warning, "deprecated", None, None);
        collector.set_document("org.acme:app:1.0");

        assert_eq!(collector.problems()[0].document, "org.acme:app:1.0");
        assert!(!collector.has_errors());
    }

    #[test]
    fn test_merge_keeps_child_attribution_and_dedups() {
        let mut child = ProblemCollector::new("org.acme:parent:1.0");
        child.add(Severity::Error, "duplicate dependency", None, None);

        let mut parent = ProblemCollector::new("org.acme:app:1.0");
        parent.merge(&child);
        parent.merge(&child);

        assert_eq!(parent.problems().len(), 1);
        assert_eq!(parent.problems()[0].document, "org.acme:parent:1.0");
        assert!(parent.has_errors());
        assert!(!parent.has_fatal());
    }

    #[test]
    fn test_model_building_error_groups() {
        let mut a = ProblemCollector::new("a");
        a.add(Severity::Fatal, "cycle", Some(InputLocation::at("a/pom.toml", 3, 1)), None);
        let mut b = ProblemCollector::new("b");
        b.add(Severity::Error, "missing version", None, Some("cause".to_string()));
        a.merge(&b);

        let error = ModelBuildingError::from_problems(a.problems(), None);
        assert_eq!(error.groups.len(), 2);
        assert_eq!(error.problem_count(), 2);

        let rendered = error.to_string();
        assert!(rendered.starts_with("2 problems were encountered"));
        assert!(rendered.contains("[FATAL] cycle @ a/pom.toml, line 3, column 1"));
        assert!(rendered.contains("[ERROR] missing version: cause"));
    }
}
