//! Configuration management for pomr
//!
//! The only configuration pomr reads outside the build descriptions themselves is
//! the user-wide [`GlobalConfig`] (`~/.pomr/config.toml`). It supplies the local
//! repository root, extra repository roots, the default validation level, the
//! parallelism of project builds and default user properties.
//!
//! # Precedence
//!
//! 1. Command-line flags
//! 2. Environment variables (`POMR_REPOSITORY`, `POMR_MAX_PARALLEL`)
//! 3. The configuration file (`POMR_CONFIG_PATH` or the default location)
//! 4. Built-in defaults
//!
//! # Usage
//!
//! ```rust,no_run
//! use pomr::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! println!("Local repository: {}", config.local_repository_path()?.display());
//! # Ok(())
//! # }
//! ```

mod global;
mod parser;

pub use global::GlobalConfig;
pub(crate) use global::expand_path;
pub use parser::parse_config;
