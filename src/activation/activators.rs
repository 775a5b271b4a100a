//! Predicate evaluation and profile selection.

use std::sync::Arc;

use tracing::debug;

use super::ActivationContext;
use crate::core::{PomrError, ProblemCollector, Severity};
use crate::model::{Activation, Document, Profile};
use crate::spi::ConditionEvaluator;
use crate::spi::interpolation::expand_placeholders;
use crate::version::{Version, VersionRange};

/// One kind of activation predicate.
pub trait ProfileActivator: Send + Sync {
    /// Short name used in log output and problems.
    fn name(&self) -> &'static str;

    /// Whether the activation declares this predicate.
    fn present_in(&self, activation: &Activation) -> bool;

    /// Evaluate the predicate. Only called when [`present_in`](Self::present_in) holds.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed predicate (bad range, unparsable condition).
    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError>;
}

fn negated(value: &str) -> (bool, &str) {
    match value.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, value.trim()),
    }
}

/// `jdk = "11"`, `jdk = "!1.8"`, `jdk = "[11,17)"` against `java.version`.
pub struct JdkActivator;

impl ProfileActivator for JdkActivator {
    fn name(&self) -> &'static str {
        "jdk"
    }

    fn present_in(&self, activation: &Activation) -> bool {
        activation.jdk.as_deref().is_some_and(|jdk| !jdk.trim().is_empty())
    }

    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError> {
        let spec = activation.jdk.as_deref().unwrap_or_default();
        let (negate, spec) = negated(spec);
        let Some(java_version) = ctx.system_property("java.version") else {
            return Ok(false);
        };
        let version = Version::parse(&java_version);

        let matched = if VersionRange::is_range(spec) {
            VersionRange::parse(spec)?.contains(&version)
        } else {
            version.starts_with(&Version::parse(spec))
        };
        Ok(matched != negate)
    }
}

/// `[activation.os]` against `os.name`, `os.arch` and `os.version`.
pub struct OsActivator;

fn is_os_family(family: &str, os_name: &str) -> bool {
    let name = os_name.to_ascii_lowercase();
    let windows = name.contains("windows");
    match family.to_ascii_lowercase().as_str() {
        "windows" => windows,
        "mac" => name.contains("mac") || name.contains("darwin"),
        "unix" => !windows && !name.contains("os/2") && !name.contains("netware"),
        other => name.contains(other),
    }
}

fn os_value_matches(expected: &str, actual: Option<&str>) -> bool {
    let (negate, expected) = negated(expected);
    let matched = actual.is_some_and(|actual| actual.eq_ignore_ascii_case(expected));
    matched != negate
}

impl ProfileActivator for OsActivator {
    fn name(&self) -> &'static str {
        "os"
    }

    fn present_in(&self, activation: &Activation) -> bool {
        activation.os.as_ref().is_some_and(|os| {
            os.name.is_some() || os.family.is_some() || os.arch.is_some() || os.version.is_some()
        })
    }

    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError> {
        let Some(os) = &activation.os else {
            return Ok(false);
        };

        if let Some(family) = &os.family {
            let name = ctx.system_property("os.name").unwrap_or_default();
            let (negate, family) = negated(family);
            if is_os_family(family, &name) == negate {
                return Ok(false);
            }
        }
        if let Some(name) = &os.name
            && !os_value_matches(name, ctx.system_property("os.name").as_deref())
        {
            return Ok(false);
        }
        if let Some(arch) = &os.arch
            && !os_value_matches(arch, ctx.system_property("os.arch").as_deref())
        {
            return Ok(false);
        }
        if let Some(version) = &os.version
            && !os_value_matches(version, ctx.system_property("os.version").as_deref())
        {
            return Ok(false);
        }
        Ok(true)
    }
}

/// `[activation.property]`: presence, absence (`!name`), equality and inequality
/// (`!value`). An absent property is unequal to every value.
pub struct PropertyActivator;

impl ProfileActivator for PropertyActivator {
    fn name(&self) -> &'static str {
        "property"
    }

    fn present_in(&self, activation: &Activation) -> bool {
        activation.property.is_some()
    }

    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError> {
        let Some(property) = &activation.property else {
            return Ok(false);
        };
        let (absent, name) = negated(&property.name);
        if name.is_empty() {
            return Err(PomrError::InvalidCondition {
                condition: property.name.clone(),
                reason: "the property name is required to activate the profile".to_string(),
            });
        }
        let value = ctx.property(name);

        match &property.value {
            Some(expected) if !absent => {
                let (negate, expected) = negated(expected);
                Ok((value.as_deref() == Some(expected)) != negate)
            }
            _ => {
                let present = value.is_some_and(|v| !v.is_empty());
                Ok(present != absent)
            }
        }
    }
}

/// `[activation.file]`: `exists` or `missing`, with `${project.basedir}` and
/// property expansion and glob support. `exists` wins when both are set.
pub struct FileActivator;

impl ProfileActivator for FileActivator {
    fn name(&self) -> &'static str {
        "file"
    }

    fn present_in(&self, activation: &Activation) -> bool {
        activation.file.as_ref().is_some_and(|f| f.exists.is_some() || f.missing.is_some())
    }

    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError> {
        let Some(file) = &activation.file else {
            return Ok(false);
        };
        let (path, want_exists) = match (&file.exists, &file.missing) {
            (Some(exists), _) => (exists.as_str(), true),
            (None, Some(missing)) => (missing.as_str(), false),
            (None, None) => return Ok(false),
        };

        let mut unresolved = false;
        let expanded = expand_placeholders(path, &mut |name| {
            let value = match name {
                "basedir" | "project.basedir" => ctx.model_field("project.basedir"),
                other => ctx.property(other),
            };
            if value.is_none() {
                unresolved = true;
            }
            value
        });
        if unresolved {
            return Err(PomrError::InvalidCondition {
                condition: path.to_string(),
                reason: "failed to interpolate file location".to_string(),
            });
        }

        let absolute = if std::path::Path::new(&expanded).is_absolute() {
            expanded
        } else {
            match ctx.model_field("project.basedir") {
                Some(basedir) => std::path::Path::new(&basedir)
                    .join(&expanded)
                    .to_string_lossy()
                    .into_owned(),
                None => expanded,
            }
        };

        Ok(ctx.exists(&absolute) == want_exists)
    }
}

/// `packaging = "war"` (or `"!war"`) against the document's packaging.
pub struct PackagingActivator;

impl ProfileActivator for PackagingActivator {
    fn name(&self) -> &'static str {
        "packaging"
    }

    fn present_in(&self, activation: &Activation) -> bool {
        activation.packaging.is_some()
    }

    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError> {
        let (negate, expected) = negated(activation.packaging.as_deref().unwrap_or_default());
        let packaging = ctx.model_field("packaging");
        Ok((packaging.as_deref() == Some(expected)) != negate)
    }
}

/// `condition = "..."` delegated to the injected evaluator.
pub struct ConditionActivator {
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl ConditionActivator {
    /// Wrap an evaluator.
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            evaluator,
        }
    }
}

impl ProfileActivator for ConditionActivator {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn present_in(&self, activation: &Activation) -> bool {
        activation.condition.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    fn is_active(
        &self,
        activation: &Activation,
        ctx: &mut ActivationContext,
    ) -> Result<bool, PomrError> {
        self.evaluator.evaluate(activation.condition.as_deref().unwrap_or_default(), ctx)
    }
}

enum Decision {
    Active,
    Inactive,
    DefaultCandidate,
}

/// Decides which profiles of a document are active.
pub struct ProfileSelector {
    activators: Vec<Box<dyn ProfileActivator>>,
}

impl ProfileSelector {
    /// The standard predicate set with the given condition evaluator.
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self::with_activators(vec![
            Box::new(JdkActivator),
            Box::new(OsActivator),
            Box::new(PropertyActivator),
            Box::new(FileActivator),
            Box::new(PackagingActivator),
            Box::new(ConditionActivator::new(evaluator)),
        ])
    }

    /// A selector over a custom predicate set.
    pub fn with_activators(activators: Vec<Box<dyn ProfileActivator>>) -> Self {
        Self {
            activators,
        }
    }

    /// The active profiles of `document`, in declaration order.
    ///
    /// Explicitly inactive profiles never activate, explicitly active ones always do.
    /// Otherwise every declared predicate must hold. When nothing activated,
    /// `active-by-default` profiles do. A malformed predicate is reported as an
    /// Error and leaves its profile inactive.
    pub fn select(
        &self,
        document: &Document,
        ctx: &mut ActivationContext,
        problems: &mut ProblemCollector,
    ) -> Vec<Profile> {
        let mut active = Vec::new();
        let mut defaults = Vec::new();

        for (index, profile) in document.profiles.iter().enumerate() {
            let prune = ctx.is_recording() && ctx.prunes_inactive();
            let previous = prune.then(|| ctx.start());

            let decision = self.decide(document, index, profile, ctx, problems);

            if let Some(previous) = previous {
                if matches!(decision, Decision::Active) {
                    ctx.stop(previous);
                } else {
                    ctx.discard(previous);
                }
            }

            match decision {
                Decision::Active => active.push(profile.clone()),
                Decision::DefaultCandidate => defaults.push(profile.clone()),
                Decision::Inactive => {}
            }
        }

        if active.is_empty() {
            active = defaults;
        }
        debug!(
            "{}: active profiles [{}]",
            document.id(),
            active.iter().map(|p| p.id.as_str()).collect::<Vec<_>>().join(", ")
        );
        active
    }

    fn decide(
        &self,
        document: &Document,
        index: usize,
        profile: &Profile,
        ctx: &mut ActivationContext,
        problems: &mut ProblemCollector,
    ) -> Decision {
        if ctx.is_profile_inactive(&profile.id) {
            return Decision::Inactive;
        }
        if ctx.is_profile_active(&profile.id) {
            return Decision::Active;
        }
        let Some(activation) = &profile.activation else {
            return Decision::Inactive;
        };

        let fallback = if activation.active_by_default {
            Decision::DefaultCandidate
        } else {
            Decision::Inactive
        };

        let mut any_present = false;
        for activator in &self.activators {
            if !activator.present_in(activation) {
                continue;
            }
            any_present = true;
            match activator.is_active(activation, ctx) {
                Ok(true) => {}
                Ok(false) => return fallback,
                Err(error) => {
                    let field = format!("profiles[{index}].activation");
                    problems.push(
                        crate::core::Problem::new(
                            Severity::Error,
                            format!(
                                "Failed to determine activation for profile {}: invalid {} predicate",
                                profile.id,
                                activator.name()
                            ),
                        )
                        .with_field(field.clone())
                        .with_location(document.location(&field))
                        .with_cause(error.to_string()),
                    );
                    return Decision::Inactive;
                }
            }
        }

        if any_present {
            Decision::Active
        } else {
            fallback
        }
    }
}
