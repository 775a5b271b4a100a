//! The document model.
//!
//! A [`Document`] is the decoded form of one `pom.toml`: the artifact's identity, a
//! reference to its parent, the sub-documents it aggregates, properties,
//! dependencies, dependency management, build configuration and profiles. Documents
//! are immutable once built; every stage of resolution produces a new value and
//! documents are passed around as `Arc<Document>`.
//!
//! The on-disk form uses kebab-case keys:
//!
//! ```toml
//! group-id = "org.acme"
//! artifact-id = "app"
//! version = "1.0"
//! packaging = "jar"
//!
//! [parent]
//! group-id = "org.acme"
//! artifact-id = "acme-parent"
//! version = "[1.0,2.0)"
//! relative-path = "../parent"
//!
//! [properties]
//! "java.release" = "17"
//!
//! [[dependencies]]
//! group-id = "org.acme"
//! artifact-id = "lib"
//!
//! [[profiles]]
//! id = "ci"
//! [profiles.activation.property]
//! name = "env.CI"
//! ```

mod source;

pub use source::{DocumentSource, normalize_path};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::InputLocation;

fn is_false(value: &bool) -> bool {
    !*value
}

/// `group:artifact:version` of a document or reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinates {
    /// Group id
    pub group_id: String,
    /// Artifact id
    pub artifact_id: String,
    /// Version or version range
    pub version: String,
}

impl Coordinates {
    /// Create coordinates from their parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// `group:artifact`, the version-less identity.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Reference from a document to its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParentRef {
    /// Group id of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Artifact id of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Literal version or version range of the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Path to the parent relative to the child's directory.
    ///
    /// `None` means the default (`..`); an empty string disables the file-system
    /// lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
}

impl ParentRef {
    /// The referenced coordinates, with `[unknown]` placeholders for missing parts.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(
            self.group_id.clone().unwrap_or_else(|| "[unknown]".to_string()),
            self.artifact_id.clone().unwrap_or_else(|| "[unknown]".to_string()),
            self.version.clone().unwrap_or_else(|| "[unknown]".to_string()),
        )
    }
}

/// An exclusion on a dependency or an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Exclusion {
    /// Excluded group id, `*` for any
    pub group_id: String,
    /// Excluded artifact id, `*` for any
    pub artifact_id: String,
}

impl Exclusion {
    /// Whether this exclusion matches a dependency.
    pub fn matches(&self, dependency: &Dependency) -> bool {
        let group_matches =
            self.group_id == "*" || dependency.group_id.as_deref() == Some(self.group_id.as_str());
        let artifact_matches = self.artifact_id == "*"
            || dependency.artifact_id.as_deref() == Some(self.artifact_id.as_str());
        group_matches && artifact_matches
    }
}

/// A dependency or dependency-management entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dependency {
    /// Group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Artifact id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Version; may be filled from dependency management
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Artifact type, `jar` when absent
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Classifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Scope; `import` in dependency management marks a bundle import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Whether the dependency is optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    /// Path for `system` scoped dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_path: Option<String>,
    /// Transitive exclusions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    /// Create a dependency from group, artifact and optional version.
    pub fn new(group_id: &str, artifact_id: &str, version: Option<&str>) -> Self {
        Self {
            group_id: Some(group_id.to_string()),
            artifact_id: Some(artifact_id.to_string()),
            version: version.map(str::to_string),
            ..Self::default()
        }
    }

    /// Artifact type with its default applied.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("jar")
    }

    /// The key dependencies are merged and managed by:
    /// `group:artifact:type[:classifier]`.
    pub fn management_key(&self) -> String {
        let mut key = format!(
            "{}:{}:{}",
            self.group_id.as_deref().unwrap_or_default(),
            self.artifact_id.as_deref().unwrap_or_default(),
            self.kind()
        );
        if let Some(classifier) = self.classifier.as_deref().filter(|c| !c.is_empty()) {
            key.push(':');
            key.push_str(classifier);
        }
        key
    }

    /// Whether this management entry imports a bundle.
    pub fn is_import(&self) -> bool {
        self.scope.as_deref() == Some("import")
    }
}

/// A build plugin declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Plugin {
    /// Group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Artifact id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Flat key/value configuration
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<String, String>,
}

impl Plugin {
    /// `group:artifact`, the key plugins merge by.
    pub fn key(&self) -> String {
        format!(
            "{}:{}",
            self.group_id.as_deref().unwrap_or_default(),
            self.artifact_id.as_deref().unwrap_or_default()
        )
    }
}

/// Build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Build {
    /// Output directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Final artifact name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_name: Option<String>,
    /// Plugins bound to the build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<Plugin>,
    /// Plugin versions and configuration managed for children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_management: Vec<Plugin>,
}

/// OS predicate of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActivationOs {
    /// OS name, `!` negates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// OS family (`unix`, `windows`, `mac`, …), `!` negates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Architecture, `!` negates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    /// OS version, `!` negates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Property predicate of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActivationProperty {
    /// Property name; `!name` requires absence
    pub name: String,
    /// Expected value; `!value` requires a different value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// File predicate of an activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActivationFile {
    /// Path (or glob) that must exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,
    /// Path (or glob) that must not exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
}

/// The conditions under which a profile activates. All present predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Activation {
    /// Activate when no other profile of the document activated
    #[serde(default, skip_serializing_if = "is_false")]
    pub active_by_default: bool,
    /// JDK version prefix or range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jdk: Option<String>,
    /// OS predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<ActivationOs>,
    /// Property predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<ActivationProperty>,
    /// File predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ActivationFile>,
    /// Packaging the document must have
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    /// Free-form boolean condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A conditionally activated block of configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    /// Profile id, unique within a document
    pub id: String,
    /// Activation predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
    /// Properties overlaid when active
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Modules added when active
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
    /// Dependencies merged when active
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Dependency management merged when active
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_management: Vec<Dependency>,
    /// Build configuration merged when active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Build>,
}

/// The decoded form of one build description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Document {
    /// Schema version of the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Group id; inherited from the parent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Artifact id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Version; inherited from the parent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Packaging kind, `jar` when absent; `pom` for aggregators and parents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marks the top of a multi-document tree
    #[serde(default, skip_serializing_if = "is_false")]
    pub root: bool,
    /// Parent reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    /// Sub-document directories, relative to this document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
    /// Properties available for interpolation and activation
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Dependency management entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependency_management: Vec<Dependency>,
    /// Extra repository roots used to resolve parents and imports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
    /// Build configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Build>,
    /// Profiles
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
    /// Field path → where it was declared
    #[serde(skip)]
    pub locations: BTreeMap<String, InputLocation>,
    /// The file the document was read from
    #[serde(skip)]
    pub pom_path: Option<PathBuf>,
}

impl Document {
    /// Group id, falling back to the parent reference.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// Version, falling back to the parent reference.
    pub fn effective_version(&self) -> Option<&str> {
        self.version.as_deref().or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    /// Packaging with its default applied.
    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or("jar")
    }

    /// Coordinates of this document, `None` when artifact id is missing.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(
            self.effective_group_id().unwrap_or("[unknown]"),
            self.artifact_id.clone()?,
            self.effective_version().unwrap_or("[unknown]"),
        ))
    }

    /// Human-readable id: `group:artifact:version` with `[unknown]` placeholders.
    pub fn id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.effective_group_id().unwrap_or("[unknown]"),
            self.artifact_id.as_deref().unwrap_or("[unknown]"),
            self.effective_version().unwrap_or("[unknown]")
        )
    }

    /// Directory of the document file.
    pub fn basedir(&self) -> Option<&Path> {
        self.pom_path.as_deref().and_then(Path::parent)
    }

    /// Where a field was declared.
    pub fn location(&self, field: &str) -> Option<InputLocation> {
        self.locations.get(field).cloned()
    }

    /// A copy with the given properties merged over the existing ones.
    #[must_use]
    pub fn with_properties(&self, properties: &BTreeMap<String, String>) -> Self {
        let mut copy = self.clone();
        copy.properties.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        copy
    }

    /// A copy with the dependency management replaced.
    #[must_use]
    pub fn with_dependency_management(&self, management: Vec<Dependency>) -> Self {
        let mut copy = self.clone();
        copy.dependency_management = management;
        copy
    }

    /// A copy with the dependencies replaced.
    #[must_use]
    pub fn with_dependencies(&self, dependencies: Vec<Dependency>) -> Self {
        let mut copy = self.clone();
        copy.dependencies = dependencies;
        copy
    }

    /// A copy with the parent reference replaced.
    #[must_use]
    pub fn with_parent(&self, parent: Option<ParentRef>) -> Self {
        let mut copy = self.clone();
        copy.parent = parent;
        copy
    }
}
