//! Glob matching for file-based profile activation.
//!
//! A file activation may name a concrete path (`${project.basedir}/src/main/rust`) or a
//! glob (`${project.basedir}/src/**/*.proto`). Concrete paths are a plain existence
//! check; globs need a directory walk from the longest wildcard-free prefix.
//!
//! # Pattern Syntax
//!
//! - `*` matches any sequence of characters within a single path component
//! - `**` matches any sequence of path components
//! - `?` matches any single character
//! - `[abc]` / `[a-z]` match one character of a set or range

use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::PomrError;

/// Whether the text contains glob metacharacters.
pub fn is_glob(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// Split a glob into the directory to walk and the pattern relative to it.
///
/// `/repo/src/**/*.rs` becomes (`/repo/src`, `**/*.rs`).
pub fn split_glob(path: &str) -> (PathBuf, String) {
    let normalized = path.replace('\\', "/");
    let components: Vec<&str> = normalized.split('/').collect();
    let first_glob = components.iter().position(|c| is_glob(c)).unwrap_or(components.len());

    let base = components[..first_glob].join("/");
    let base = if base.is_empty() && normalized.starts_with('/') {
        "/".to_string()
    } else if base.is_empty() {
        ".".to_string()
    } else {
        base
    };
    (PathBuf::from(base), components[first_glob..].join("/"))
}

/// A compiled glob.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
    original_pattern: String,
}

impl PatternMatcher {
    /// Compile a glob.
    ///
    /// # Errors
    ///
    /// Returns [`PomrError::Other`] when the pattern has invalid glob syntax.
    pub fn new(pattern_str: &str) -> Result<Self, PomrError> {
        let pattern = Pattern::new(pattern_str).map_err(|e| PomrError::Other {
            message: format!("Invalid glob pattern '{pattern_str}': {e}"),
        })?;

        Ok(Self {
            pattern,
            original_pattern: pattern_str.to_string(),
        })
    }

    /// Whether a (relative) path matches.
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.pattern.matches(&path_str)
    }

    /// The first entry under `base_path` whose relative path matches.
    ///
    /// Symlinks are not followed; the walk stops after `max_entries` entries.
    pub fn find_first(&self, base_path: &Path, max_entries: usize) -> Option<PathBuf> {
        debug!("Searching for pattern '{}' in {}", self.original_pattern, base_path.display());

        for entry in WalkDir::new(base_path)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .take(max_entries)
        {
            let Ok(relative_path) = entry.path().strip_prefix(base_path) else {
                continue;
            };
            trace!("Checking path: {}", relative_path.display());
            if self.matches(relative_path) {
                debug!("Found match: {}", entry.path().display());
                return Some(entry.path().to_path_buf());
            }
        }
        None
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.original_pattern
    }
}
