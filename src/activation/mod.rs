//! Profile activation.
//!
//! Profiles are conditional blocks of configuration. Whether a profile is active
//! depends on the environment a document is built in: profile ids requested on the
//! command line, system and user properties, the file system, and fields of the
//! document itself. This module evaluates those predicates.
//!
//! # Module Organization
//!
//! - [`ActivationContext`] - the environment, answering lookups and recording them
//! - [`record`] - [`ActivationRecord`], the ledger of lookups made during one evaluation
//! - [`activators`] - one [`ProfileActivator`] per predicate kind and the
//!   [`ProfileSelector`] combining them
//!
//! # Recording
//!
//! Every lookup goes through the context. While a recording is open the context
//! memoizes each answer into the current [`ActivationRecord`]; a result computed
//! under a record can later be reused in any context the record
//! [`matches`](ActivationRecord::matches). Recordings nest:
//!
//! ```rust
//! use pomr::activation::ActivationContext;
//!
//! let mut ctx = ActivationContext::default();
//! let outer = ctx.start();
//! let inner = ctx.start();
//! ctx.user_property("release");
//! let closed = ctx.stop(inner);
//! assert_eq!(closed.len(), 1);
//! let outer_record = ctx.stop(outer);
//! assert_eq!(outer_record.len(), 1);
//! ```
//!
//! The recording state lives in the context value, which each task owns. A derived
//! resolution clones the context.

pub mod activators;
pub mod record;

pub use activators::{ProfileActivator, ProfileSelector};
pub use record::{ActivationRecord, Answer, Lookup};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::constants::MAX_ACTIVATION_WALK_ENTRIES;
use crate::core::{Problem, Severity};
use crate::model::Document;
use crate::pattern::{PatternMatcher, is_glob, split_glob};

/// The environment profiles are activated against.
#[derive(Debug, Clone, Default)]
pub struct ActivationContext {
    active_ids: Arc<BTreeSet<String>>,
    inactive_ids: Arc<BTreeSet<String>>,
    system_properties: Arc<BTreeMap<String, String>>,
    user_properties: Arc<BTreeMap<String, String>>,
    model: Option<(Arc<Document>, String)>,
    recording: Option<ActivationRecord>,
    prune_inactive: bool,
}

impl ActivationContext {
    /// Create a context from explicit profile ids and property layers.
    pub fn new(
        active_ids: BTreeSet<String>,
        inactive_ids: BTreeSet<String>,
        system_properties: BTreeMap<String, String>,
        user_properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            active_ids: Arc::new(active_ids),
            inactive_ids: Arc::new(inactive_ids),
            system_properties: Arc::new(system_properties),
            user_properties: Arc::new(user_properties),
            ..Self::default()
        }
    }

    /// Drop the lookups of profiles that ended up inactive from the record.
    ///
    /// Smaller records match more contexts, at the price of not noticing when a
    /// changed lookup would have turned an inactive profile on.
    #[must_use]
    pub fn with_inactive_pruning(mut self, prune: bool) -> Self {
        self.prune_inactive = prune;
        self
    }

    /// Whether inactive-profile lookups are pruned.
    pub fn prunes_inactive(&self) -> bool {
        self.prune_inactive
    }

    /// Make `model` the document whose fields and properties model lookups read.
    ///
    /// Returns the previous model so it can be restored.
    pub fn set_model(
        &mut self,
        model: Arc<Document>,
        location: impl Into<String>,
    ) -> Option<(Arc<Document>, String)> {
        self.model.replace((model, location.into()))
    }

    /// Restore a model returned by [`set_model`](Self::set_model).
    pub fn restore_model(&mut self, previous: Option<(Arc<Document>, String)>) {
        self.model = previous;
    }

    /// Location of the document being activated.
    pub fn model_location(&self) -> Option<&str> {
        self.model.as_ref().map(|(_, location)| location.as_str())
    }

    /// Requested active ids, without recording.
    pub fn requested_active_ids(&self) -> &BTreeSet<String> {
        &self.active_ids
    }

    /// Requested inactive ids, without recording.
    pub fn requested_inactive_ids(&self) -> &BTreeSet<String> {
        &self.inactive_ids
    }

    /// System properties, without recording. For interpolation.
    pub fn system_properties(&self) -> &BTreeMap<String, String> {
        &self.system_properties
    }

    /// User properties, without recording. For interpolation.
    pub fn user_properties(&self) -> &BTreeMap<String, String> {
        &self.user_properties
    }

    // Recording

    /// Open a new record. Returns the enclosing one, to be passed to [`stop`](Self::stop).
    pub fn start(&mut self) -> Option<ActivationRecord> {
        self.recording.replace(ActivationRecord::new())
    }

    /// Close the current record, fold it into `previous` and reopen `previous`.
    pub fn stop(&mut self, previous: Option<ActivationRecord>) -> ActivationRecord {
        let closed = self.recording.take().unwrap_or_default();
        self.recording = previous.map(|mut outer| {
            outer.merge(&closed);
            outer
        });
        closed
    }

    /// Close the current record without folding it into `previous`.
    pub fn discard(&mut self, previous: Option<ActivationRecord>) -> ActivationRecord {
        let closed = self.recording.take().unwrap_or_default();
        self.recording = previous;
        closed
    }

    /// Fold a record obtained elsewhere (a reused cached result) into the open one.
    pub fn absorb(&mut self, record: &ActivationRecord) {
        if let Some(current) = &mut self.recording {
            current.merge(record);
        }
    }

    /// Whether a record is open.
    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    // Lookups

    fn lookup(&mut self, lookup: Lookup) -> Answer {
        let answer = self.answer(&lookup);
        if let Some(record) = &mut self.recording {
            record.record(lookup, answer.clone());
        }
        answer
    }

    fn lookup_flag(&mut self, lookup: Lookup) -> bool {
        matches!(self.lookup(lookup), Answer::Flag(true))
    }

    fn lookup_value(&mut self, lookup: Lookup) -> Option<String> {
        match self.lookup(lookup) {
            Answer::Value(value) => value,
            Answer::Flag(_) => None,
        }
    }

    /// Answer a lookup from the live environment without recording it.
    pub fn answer(&self, lookup: &Lookup) -> Answer {
        match lookup {
            Lookup::ProfileActive(id) => Answer::Flag(self.active_ids.contains(id)),
            Lookup::ProfileInactive(id) => Answer::Flag(self.inactive_ids.contains(id)),
            Lookup::SystemProperty(name) => Answer::Value(self.system_properties.get(name).cloned()),
            Lookup::UserProperty(name) => Answer::Value(self.user_properties.get(name).cloned()),
            Lookup::ModelProperty { name, .. } => Answer::Value(
                self.model.as_ref().and_then(|(doc, _)| doc.properties.get(name).cloned()),
            ),
            Lookup::ModelField { name, .. } => Answer::Value(
                self.model.as_ref().and_then(|(doc, _)| model_field_value(doc, name)),
            ),
            Lookup::Exists(path) => Answer::Flag(path_exists(path)),
        }
    }

    /// Whether the profile id was requested as active.
    pub fn is_profile_active(&mut self, id: &str) -> bool {
        self.lookup_flag(Lookup::ProfileActive(id.to_string()))
    }

    /// Whether the profile id was requested as inactive.
    pub fn is_profile_inactive(&mut self, id: &str) -> bool {
        self.lookup_flag(Lookup::ProfileInactive(id.to_string()))
    }

    /// A system property.
    pub fn system_property(&mut self, name: &str) -> Option<String> {
        self.lookup_value(Lookup::SystemProperty(name.to_string()))
    }

    /// A user property.
    pub fn user_property(&mut self, name: &str) -> Option<String> {
        self.lookup_value(Lookup::UserProperty(name.to_string()))
    }

    /// A property declared by the document being activated.
    pub fn model_property(&mut self, name: &str) -> Option<String> {
        let model = self.model_location()?.to_string();
        self.lookup_value(Lookup::ModelProperty {
            model,
            name: name.to_string(),
        })
    }

    /// A field of the document being activated: `packaging`, `project.basedir`,
    /// `project.group-id`, `project.artifact-id`, `project.version`.
    pub fn model_field(&mut self, name: &str) -> Option<String> {
        let model = self.model_location()?.to_string();
        self.lookup_value(Lookup::ModelField {
            model,
            name: name.to_string(),
        })
    }

    /// A property by precedence: user, then system, then the document.
    ///
    /// Only the layers actually consulted are recorded.
    pub fn property(&mut self, name: &str) -> Option<String> {
        self.user_property(name)
            .or_else(|| self.system_property(name))
            .or_else(|| self.model_property(name))
    }

    /// Whether anything exists at the path. Globs match if any entry matches.
    pub fn exists(&mut self, path: &str) -> bool {
        self.lookup_flag(Lookup::Exists(path.to_string()))
    }
}

fn model_field_value(document: &Document, name: &str) -> Option<String> {
    match name {
        "packaging" | "project.packaging" => Some(document.packaging().to_string()),
        "basedir" | "project.basedir" => {
            document.basedir().map(|dir| dir.to_string_lossy().into_owned())
        }
        "project.group-id" | "project.groupId" => document.effective_group_id().map(str::to_string),
        "project.artifact-id" | "project.artifactId" => document.artifact_id.clone(),
        "project.version" => document.effective_version().map(str::to_string),
        _ => None,
    }
}

fn path_exists(path: &str) -> bool {
    if !is_glob(path) {
        return Path::new(path).exists();
    }
    let (base, relative) = split_glob(path);
    match PatternMatcher::new(&relative) {
        Ok(matcher) => {
            base.is_dir() && matcher.find_first(&base, MAX_ACTIVATION_WALK_ENTRIES).is_some()
        }
        Err(_) => false,
    }
}

/// System properties describing the running process.
///
/// `env.*` for every environment variable, `os.name`, `os.arch`, `user.dir` and
/// `user.home`. `java.version` is not detected; pass it with `-D`.
pub fn default_system_properties() -> BTreeMap<String, String> {
    let mut properties: BTreeMap<String, String> =
        std::env::vars().map(|(key, value)| (format!("env.{key}"), value)).collect();

    let os_name = match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Mac OS X",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    };
    properties.insert("os.name".to_string(), os_name.to_string());
    properties.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
    if let Ok(cwd) = std::env::current_dir() {
        properties.insert("user.dir".to_string(), cwd.to_string_lossy().into_owned());
    }
    if let Some(home) = dirs::home_dir() {
        properties.insert("user.home".to_string(), home.to_string_lossy().into_owned());
    }
    properties
}

/// Warnings for requested profile ids that no document declares.
///
/// Each warning suggests the closest declared id when one is near enough.
pub fn unknown_profile_problems<'a>(
    requested: impl IntoIterator<Item = &'a String>,
    declared: &BTreeSet<String>,
) -> Vec<Problem> {
    requested
        .into_iter()
        .filter(|id| !declared.contains(*id))
        .map(|id| {
            let mut message =
                format!("The requested profile \"{id}\" could not be activated because it does not exist");
            if let Some(suggestion) = closest_id(id, declared) {
                message.push_str(&format!(" (did you mean \"{suggestion}\"?)"));
            }
            Problem::new(Severity::Warning, message)
        })
        .collect()
}

fn closest_id<'a>(target: &str, declared: &'a BTreeSet<String>) -> Option<&'a String> {
    declared
        .iter()
        .map(|id| (id, strsim::levenshtein(target, id)))
        .filter(|(_, distance)| *distance <= (target.len() / 2).max(1))
        .min_by_key(|(_, distance)| *distance)
        .map(|(id, _)| id)
}
