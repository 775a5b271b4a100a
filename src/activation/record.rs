//! The ledger of lookups made while activating profiles.

use std::collections::BTreeMap;

use super::ActivationContext;

/// One question asked of the activation environment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lookup {
    /// Was the profile id requested as active?
    ProfileActive(String),
    /// Was the profile id requested as inactive?
    ProfileInactive(String),
    /// A system property
    SystemProperty(String),
    /// A user property
    UserProperty(String),
    /// A property declared by the document being activated
    ModelProperty {
        /// Location of the document
        model: String,
        /// Property name
        name: String,
    },
    /// A field of the document being activated (`packaging`, `project.basedir`, …)
    ModelField {
        /// Location of the document
        model: String,
        /// Field name
        name: String,
    },
    /// Whether a path (or glob) matches anything on disk
    Exists(String),
}

/// The answer a lookup produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Answer {
    /// Yes/no lookups (profile ids, file existence)
    Flag(bool),
    /// Value lookups (properties, model fields)
    Value(Option<String>),
}

/// Fingerprint of one profile-activation evaluation.
///
/// Holds every lookup performed and the answer it got. A result computed under one
/// context is valid under another context iff [`matches`](Self::matches) holds:
/// replaying every recorded lookup against the other context yields the same
/// answers. Lookups that were never made cannot have influenced the result, so two
/// environments differing only in unreferenced properties share results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationRecord {
    entries: BTreeMap<Lookup, Answer>,
}

impl ActivationRecord {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoize an answer. The first answer for a lookup is kept.
    pub fn record(&mut self, lookup: Lookup, answer: Answer) {
        self.entries.entry(lookup).or_insert(answer);
    }

    /// Fold another record into this one.
    pub fn merge(&mut self, other: &ActivationRecord) {
        for (lookup, answer) in &other.entries {
            self.entries.entry(lookup.clone()).or_insert_with(|| answer.clone());
        }
    }

    /// Replay every recorded lookup against a live context.
    ///
    /// Model lookups are only replayed when the context evaluates the same document;
    /// their answers are a function of that document alone.
    pub fn matches(&self, ctx: &ActivationContext) -> bool {
        self.entries.iter().all(|(lookup, answer)| match lookup {
            Lookup::ModelProperty { model, .. } | Lookup::ModelField { model, .. }
                if ctx.model_location() != Some(model.as_str()) =>
            {
                true
            }
            _ => ctx.answer(lookup) == *answer,
        })
    }

    /// Recorded lookups in a stable order.
    pub fn entries(&self) -> impl Iterator<Item = (&Lookup, &Answer)> {
        self.entries.iter()
    }

    /// Number of recorded lookups.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was looked up.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
