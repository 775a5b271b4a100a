//! Build results.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::{Problem, ProblemCollector};
use crate::model::{Document, DocumentSource};

/// What resolving one document produced.
///
/// Every stage output is optional: resolution of a document stops at the first
/// stage that cannot continue and the result keeps whatever was produced up to
/// that point, together with the problems explaining why.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Where the document came from
    pub source: DocumentSource,
    /// The document as read
    pub file_document: Option<Arc<Document>>,
    /// The normalized document, before inheritance
    pub raw_document: Option<Arc<Document>>,
    /// The nearest parent with its own lineage and profiles applied
    pub parent_document: Option<Arc<Document>>,
    /// The fully resolved document
    pub effective_document: Option<Arc<Document>>,
    /// Ids of the profiles activated for this document, then for its lineage
    pub active_profiles: Vec<String>,
    /// Ids of every profile declared by this document or its lineage
    pub declared_profiles: BTreeSet<String>,
    /// Problems of this document and its sub-resolutions
    pub problems: ProblemCollector,
    /// Results of aggregated documents, in module order (project builds only)
    pub children: Vec<Arc<BuildResult>>,
}

impl BuildResult {
    /// An empty result for `source`.
    pub fn new(source: DocumentSource) -> Self {
        let problems = ProblemCollector::new(source.location());
        Self {
            source,
            file_document: None,
            raw_document: None,
            parent_document: None,
            effective_document: None,
            active_profiles: Vec::new(),
            declared_profiles: BTreeSet::new(),
            problems,
            children: Vec::new(),
        }
    }

    /// Id of the most resolved document available, else the source location.
    pub fn id(&self) -> String {
        self.effective_document
            .as_ref()
            .or(self.raw_document.as_ref())
            .or(self.file_document.as_ref())
            .map_or_else(|| self.source.location().to_string(), |d| d.id())
    }

    /// Problems of this result and all children, depth first.
    pub fn all_problems(&self) -> Vec<Problem> {
        let mut problems = self.problems.problems().to_vec();
        for child in &self.children {
            for problem in child.all_problems() {
                if !problems.contains(&problem) {
                    problems.push(problem);
                }
            }
        }
        problems
    }

    /// Whether this result or any child has an Error or Fatal problem.
    pub fn has_errors(&self) -> bool {
        self.problems.has_errors() || self.children.iter().any(|c| c.has_errors())
    }

    /// This result and every descendant, depth first in module order.
    pub fn flatten(&self) -> Vec<&BuildResult> {
        let mut results = vec![self];
        for child in &self.children {
            results.extend(child.flatten());
        }
        results
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}{}", self.id())?;
        if !self.active_profiles.is_empty() {
            write!(f, " [{}]", self.active_profiles.join(", "))?;
        }
        writeln!(f)?;
        for problem in self.problems.problems() {
            writeln!(f, "{indent}  - {problem}")?;
        }
        for child in &self.children {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}
