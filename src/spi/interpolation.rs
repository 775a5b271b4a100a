//! `${...}` placeholder expansion.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::Interpolator;
use crate::constants::MAX_INTERPOLATION_DEPTH;
use crate::model::{Build, Dependency, Document, Plugin};

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").ok());

/// Single-pass expansion: each placeholder `lookup` answers is replaced by the
/// answer, verbatim. Unanswered placeholders stay as written.
pub fn expand_placeholders(
    text: &str,
    lookup: &mut dyn FnMut(&str) -> Option<String>,
) -> String {
    let Some(regex) = PLACEHOLDER.as_ref() else {
        return text.to_string();
    };
    if !text.contains("${") {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for captures in regex.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        result.push_str(&text[last..whole.start()]);
        match lookup(name.as_str().trim()) {
            Some(value) => result.push_str(&value),
            None => result.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    result.push_str(&text[last..]);
    result
}

/// Regex-based [`Interpolator`] with recursive expansion.
///
/// A substituted value is itself expanded, up to a fixed depth, so
/// `a = "${b}"`, `b = "x"` gives `x`. Self references stop at the depth bound and
/// are left unexpanded.
#[derive(Debug, Clone, Copy)]
pub struct RegexInterpolator {
    max_depth: usize,
}

impl Default for RegexInterpolator {
    fn default() -> Self {
        Self {
            max_depth: MAX_INTERPOLATION_DEPTH,
        }
    }
}

impl RegexInterpolator {
    /// Create an interpolator with the default depth bound.
    pub fn new() -> Self {
        Self::default()
    }

    fn expand(&self, text: &str, lookup: &dyn Fn(&str) -> Option<String>, stack: &mut Vec<String>) -> String {
        expand_placeholders(text, &mut |name| {
            if stack.len() >= self.max_depth || stack.iter().any(|n| n == name) {
                return None;
            }
            let value = lookup(name)?;
            stack.push(name.to_string());
            let expanded = self.expand(&value, lookup, stack);
            stack.pop();
            Some(expanded)
        })
    }
}

impl Interpolator for RegexInterpolator {
    fn interpolate(&self, text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        self.expand(text, lookup, &mut Vec::new())
    }
}

/// Lookup for a document: model values, then user properties, then system
/// properties.
///
/// Model values are `project.*` (alias `pom.*`) fields, `basedir`, and the
/// document's own properties.
pub fn model_lookup<'a>(
    document: &'a Document,
    user: &'a BTreeMap<String, String>,
    system: &'a BTreeMap<String, String>,
) -> impl Fn(&str) -> Option<String> + 'a {
    move |name: &str| {
        model_value(document, name)
            .or_else(|| user.get(name).cloned())
            .or_else(|| system.get(name).cloned())
    }
}

fn model_value(document: &Document, name: &str) -> Option<String> {
    let field = name.strip_prefix("project.").or_else(|| name.strip_prefix("pom."));
    if let Some(field) = field {
        return match field {
            "group-id" | "groupId" => document.effective_group_id().map(str::to_string),
            "artifact-id" | "artifactId" => document.artifact_id.clone(),
            "version" => document.effective_version().map(str::to_string),
            "packaging" => Some(document.packaging().to_string()),
            "name" => document.name.clone(),
            "description" => document.description.clone(),
            "basedir" => document.basedir().map(|d| d.to_string_lossy().into_owned()),
            "parent.group-id" | "parent.groupId" => {
                document.parent.as_ref().and_then(|p| p.group_id.clone())
            }
            "parent.artifact-id" | "parent.artifactId" => {
                document.parent.as_ref().and_then(|p| p.artifact_id.clone())
            }
            "parent.version" => document.parent.as_ref().and_then(|p| p.version.clone()),
            _ => document.properties.get(name).cloned(),
        };
    }
    if name == "basedir" {
        return document.basedir().map(|d| d.to_string_lossy().into_owned());
    }
    document.properties.get(name).cloned()
}

fn interpolate_opt(
    interpolator: &dyn Interpolator,
    value: &Option<String>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<String> {
    value.as_ref().map(|v| interpolator.interpolate(v, lookup))
}

fn interpolate_dependency(
    interpolator: &dyn Interpolator,
    dependency: &Dependency,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Dependency {
    Dependency {
        group_id: interpolate_opt(interpolator, &dependency.group_id, lookup),
        artifact_id: interpolate_opt(interpolator, &dependency.artifact_id, lookup),
        version: interpolate_opt(interpolator, &dependency.version, lookup),
        kind: interpolate_opt(interpolator, &dependency.kind, lookup),
        classifier: interpolate_opt(interpolator, &dependency.classifier, lookup),
        scope: interpolate_opt(interpolator, &dependency.scope, lookup),
        optional: dependency.optional,
        system_path: interpolate_opt(interpolator, &dependency.system_path, lookup),
        exclusions: dependency.exclusions.clone(),
    }
}

fn interpolate_plugin(
    interpolator: &dyn Interpolator,
    plugin: &Plugin,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Plugin {
    Plugin {
        group_id: interpolate_opt(interpolator, &plugin.group_id, lookup),
        artifact_id: interpolate_opt(interpolator, &plugin.artifact_id, lookup),
        version: interpolate_opt(interpolator, &plugin.version, lookup),
        configuration: plugin
            .configuration
            .iter()
            .map(|(k, v)| (k.clone(), interpolator.interpolate(v, lookup)))
            .collect(),
    }
}

/// Interpolate every value of a document.
///
/// The parent reference and profiles are left as declared.
pub fn interpolate_document(
    interpolator: &dyn Interpolator,
    document: &Document,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Document {
    let mut result = document.clone();
    result.group_id = interpolate_opt(interpolator, &document.group_id, lookup);
    result.artifact_id = interpolate_opt(interpolator, &document.artifact_id, lookup);
    result.version = interpolate_opt(interpolator, &document.version, lookup);
    result.packaging = interpolate_opt(interpolator, &document.packaging, lookup);
    result.name = interpolate_opt(interpolator, &document.name, lookup);
    result.description = interpolate_opt(interpolator, &document.description, lookup);
    result.properties = document
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), interpolator.interpolate(v, lookup)))
        .collect();
    result.modules = document.modules.iter().map(|m| interpolator.interpolate(m, lookup)).collect();
    result.repositories =
        document.repositories.iter().map(|r| interpolator.interpolate(r, lookup)).collect();
    result.dependencies = document
        .dependencies
        .iter()
        .map(|d| interpolate_dependency(interpolator, d, lookup))
        .collect();
    result.dependency_management = document
        .dependency_management
        .iter()
        .map(|d| interpolate_dependency(interpolator, d, lookup))
        .collect();
    result.build = document.build.as_ref().map(|build| Build {
        directory: interpolate_opt(interpolator, &build.directory, lookup),
        final_name: interpolate_opt(interpolator, &build.final_name, lookup),
        plugins: build.plugins.iter().map(|p| interpolate_plugin(interpolator, p, lookup)).collect(),
        plugin_management: build
            .plugin_management
            .iter()
            .map(|p| interpolate_plugin(interpolator, p, lookup))
            .collect(),
    });
    result
}
