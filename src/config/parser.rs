//! Partial reads of TOML files.
//!
//! Some callers only need a few keys of a file, such as the `root` flag of a
//! `pom.toml` while looking for the top of a tree. [`parse_config`] reads a file
//! into any `DeserializeOwned` type; unknown keys are ignored unless the target
//! type denies them.

use anyhow::{Context, Result};
use std::path::Path;

/// Read `path` and deserialize it as `T`.
///
/// ```rust,no_run
/// use pomr::config::parse_config;
/// use serde::Deserialize;
/// use std::path::Path;
///
/// #[derive(Deserialize)]
/// struct Packaging {
///     packaging: Option<String>,
/// }
///
/// # fn example() -> anyhow::Result<()> {
/// let head: Packaging = parse_config(Path::new("pom.toml"))?;
/// println!("{:?}", head.packaging);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error naming `path` if it cannot be read or does not deserialize.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
