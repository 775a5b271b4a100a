//! Global configuration management for pomr.
//!
//! This module handles the user configuration file (`~/.pomr/config.toml`) which
//! stores user-wide settings: where the local repository lives, extra repository
//! roots searched for parents and imported bundles, the default validation level,
//! the parallelism of project builds and default user properties.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.pomr/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\pomr\config.toml`
//!
//! The location can be overridden using the `POMR_CONFIG_PATH` environment variable.
//!
//! # File Format
//!
//! ```toml
//! local-repository = "~/.pomr/repository"
//! max-parallel = 8
//! validation = "lenient"
//! repositories = ["~/work/shared-repo"]
//!
//! [properties]
//! "java.release" = "17"
//! ```
//!
//! # Environment Overrides
//!
//! | Variable            | Overrides          |
//! |---------------------|--------------------|
//! | `POMR_REPOSITORY`   | `local-repository` |
//! | `POMR_MAX_PARALLEL` | `max-parallel`     |
//!
//! Command-line flags override both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::default_parallelism;
use crate::spi::Strictness;

/// Global configuration structure for pomr.
///
/// # Examples
///
/// ```rust
/// use pomr::config::GlobalConfig;
///
/// let config: GlobalConfig = toml::from_str("max-parallel = 2").unwrap();
/// assert_eq!(config.max_parallel, Some(2));
/// assert!(config.repositories.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Root of the local repository. `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_repository: Option<String>,

    /// Maximum number of documents loaded or resolved concurrently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    /// Default validation level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Strictness>,

    /// Extra repository roots, searched after the local repository.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,

    /// User property defaults, overridden by `-D` flags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl GlobalConfig {
    /// Load global configuration from the default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the default path cannot be determined, or the file exists
    /// but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from the given path, or from the default location when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Save the configuration to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// Path of the configuration file.
    ///
    /// `POMR_CONFIG_PATH` wins over the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("POMR_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn config_dir() -> Result<PathBuf> {
        let dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("pomr")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".pomr")
        };
        Ok(dir)
    }

    /// Root of the local repository.
    ///
    /// Priority: `POMR_REPOSITORY`, then `local-repository`, then
    /// `~/.pomr/repository`.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded or no home directory exists.
    pub fn local_repository_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var("POMR_REPOSITORY") {
            return expand_path(&path);
        }
        match &self.local_repository {
            Some(path) => expand_path(path),
            None => Ok(Self::config_dir()?.join("repository")),
        }
    }

    /// Every repository root in search order: the local repository first.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured path cannot be expanded.
    pub fn repository_roots(&self) -> Result<Vec<PathBuf>> {
        let mut roots = vec![self.local_repository_path()?];
        for repository in &self.repositories {
            let path = expand_path(repository)?;
            if !roots.contains(&path) {
                roots.push(path);
            }
        }
        Ok(roots)
    }

    /// Effective parallelism: `POMR_MAX_PARALLEL`, then `max-parallel`, then the
    /// number of available cores. Never less than one.
    pub fn max_parallel(&self) -> usize {
        std::env::var("POMR_MAX_PARALLEL")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .or(self.max_parallel)
            .unwrap_or_else(default_parallelism)
            .max(1)
    }

    /// Validation level, `strict` when unset.
    pub fn validation(&self) -> Strictness {
        self.validation.unwrap_or_default()
    }
}

/// Expand `~` and environment variables in a configured path.
pub(crate) fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand configured path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
