//! Default validation rules.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModelValidator;
use crate::core::{Problem, Severity};
use crate::model::Document;

/// How many rules run and how hard they bite.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Only the checks without which resolution cannot continue.
    Minimal,
    /// All checks; some are downgraded to warnings.
    Lenient,
    /// All checks at full severity.
    #[default]
    Strict,
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strictness::Minimal => write!(f, "minimal"),
            Strictness::Lenient => write!(f, "lenient"),
            Strictness::Strict => write!(f, "strict"),
        }
    }
}

/// The checkpoint a document is validated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationStage {
    /// Right after reading.
    File,
    /// After normalization, before anything is inherited.
    Raw,
    /// The final effective document.
    Effective,
}

/// Built-in [`ModelValidator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelValidator;

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn problem(document: &Document, severity: Severity, message: String, field: &str) -> Problem {
    Problem::new(severity, message)
        .with_field(field)
        .with_location(document.location(field))
}

impl DefaultModelValidator {
    fn fatal_checks(document: &Document, stage: ValidationStage, problems: &mut Vec<Problem>) {
        if document.artifact_id.as_deref().is_none_or(str::is_empty) {
            let severity = if stage == ValidationStage::File { Severity::Fatal } else { Severity::Error };
            problems.push(problem(document, severity, "'artifact-id' is missing".to_string(), "artifact-id"));
        }

        let Some(parent) = &document.parent else {
            return;
        };
        for (value, field) in [
            (&parent.group_id, "parent.group-id"),
            (&parent.artifact_id, "parent.artifact-id"),
            (&parent.version, "parent.version"),
        ] {
            if value.as_deref().is_none_or(str::is_empty) {
                problems.push(problem(document, Severity::Fatal, format!("'{field}' is missing"), field));
            }
        }
        if parent.group_id.is_some()
            && parent.group_id.as_deref() == document.effective_group_id()
            && parent.artifact_id == document.artifact_id
        {
            problems.push(problem(
                document,
                Severity::Fatal,
                format!("{} declares itself as its parent", document.id()),
                "parent",
            ));
        }
    }

    fn coordinate_checks(document: &Document, problems: &mut Vec<Problem>) {
        if document.parent.is_none() {
            if document.group_id.as_deref().is_none_or(str::is_empty) {
                problems.push(problem(document, Severity::Error, "'group-id' is missing".to_string(), "group-id"));
            }
            if document.version.as_deref().is_none_or(str::is_empty) {
                problems.push(problem(document, Severity::Error, "'version' is missing".to_string(), "version"));
            }
        }
        for (value, field) in [(document.group_id.as_deref(), "group-id"), (document.artifact_id.as_deref(), "artifact-id")] {
            if let Some(id) = value
                && !id.contains("${")
                && !valid_id(id)
            {
                problems.push(problem(
                    document,
                    Severity::Error,
                    format!("'{field}' with value '{id}' does not match a valid id pattern"),
                    field,
                ));
            }
        }
        if !document.modules.is_empty() && document.packaging() != "pom" {
            problems.push(problem(
                document,
                Severity::Error,
                format!("aggregator projects require 'pom' as packaging, found '{}'", document.packaging()),
                "packaging",
            ));
        }
    }

    fn dependency_checks(
        document: &Document,
        stage: ValidationStage,
        strictness: Strictness,
        problems: &mut Vec<Problem>,
    ) {
        let duplicate_severity =
            if strictness == Strictness::Strict { Severity::Error } else { Severity::Warning };

        for (section, dependencies) in [
            ("dependencies", &document.dependencies),
            ("dependency-management", &document.dependency_management),
        ] {
            let mut seen = HashSet::new();
            for (index, dependency) in dependencies.iter().enumerate() {
                let field = format!("{section}[{index}]");
                let key = dependency.management_key();
                if !seen.insert(key.clone()) {
                    problems.push(problem(
                        document,
                        duplicate_severity,
                        format!("'{section}' must be unique: {key} is declared more than once"),
                        &field,
                    ));
                }
                if let Some(version) = dependency.version.as_deref()
                    && matches!(version, "LATEST" | "RELEASE")
                {
                    problems.push(problem(
                        document,
                        Severity::Warning,
                        format!("'{field}.version' for {key} is either LATEST or RELEASE"),
                        &field,
                    ));
                }
                if dependency.scope.as_deref() == Some("system")
                    && dependency.system_path.as_deref().is_none_or(str::is_empty)
                {
                    problems.push(problem(
                        document,
                        Severity::Warning,
                        format!("'{field}.system-path' for {key} is missing"),
                        &field,
                    ));
                }
                if stage == ValidationStage::Effective
                    && section == "dependencies"
                    && dependency.version.as_deref().is_none_or(str::is_empty)
                {
                    problems.push(problem(
                        document,
                        Severity::Error,
                        format!("'{field}.version' for {key} is missing"),
                        &field,
                    ));
                }
            }
        }
    }

    fn profile_checks(document: &Document, problems: &mut Vec<Problem>) {
        let mut seen = HashSet::new();
        for (index, profile) in document.profiles.iter().enumerate() {
            if !seen.insert(profile.id.as_str()) {
                problems.push(problem(
                    document,
                    Severity::Error,
                    format!("'profiles.profile.id' must be unique but found duplicate profile with id {}", profile.id),
                    &format!("profiles[{index}]"),
                ));
            }
        }
    }
}

impl ModelValidator for DefaultModelValidator {
    fn validate(
        &self,
        document: &Document,
        stage: ValidationStage,
        strictness: Strictness,
    ) -> Vec<Problem> {
        let mut problems = Vec::new();
        Self::fatal_checks(document, stage, &mut problems);
        if strictness == Strictness::Minimal {
            return problems;
        }

        Self::coordinate_checks(document, &mut problems);
        Self::dependency_checks(document, stage, strictness, &mut problems);
        if stage == ValidationStage::File {
            Self::profile_checks(document, &mut problems);
        }
        problems
    }
}
