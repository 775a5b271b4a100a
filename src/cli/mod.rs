//! Command-line interface for pomr.
//!
//! # Commands
//!
//! - `effective <PATH>` - print the effective model of one document
//! - `project [DIR]` - build a whole tree and print every document with its
//!   activated profiles and problems
//! - `raw <PATH>` - print a document as read and normalized
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging of the resolution stages
//! - `--quiet` / `-q` - no logging unless `RUST_LOG` is set
//! - `--config` / `-c` - configuration file instead of `~/.pomr/config.toml`
//!
//! # Examples
//!
//! ```bash
//! pomr effective app/pom.toml -P ci,!slow -D revision=2.0 --format json
//! pomr project --max-parallel 4
//! pomr raw app
//! ```

pub mod common;
mod effective;
mod project;
mod raw;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use effective::EffectiveCommand;
pub use project::ProjectCommand;
pub use raw::RawCommand;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level for the crate's targets; `None` disables logging unless `RUST_LOG`
    /// is set.
    pub log_level: Option<String>,

    /// Configuration file given on the command line.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Default settings: no logging override, default configuration file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tracing subscriber. `RUST_LOG` wins over the flags.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(format!("pomr={level}"))
        } else {
            return;
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Resolve hierarchical build descriptions into effective documents.
#[derive(Parser)]
#[command(
    name = "pomr",
    about = "Resolve pom.toml build descriptions into effective documents",
    version,
    long_about = "pomr reads pom.toml build descriptions, resolves their parents, profiles and \
                  dependency-management imports, and prints the effective result."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging of every resolution stage
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// No logging (unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file to use instead of ~/.pomr/config.toml
    #[arg(short, long, global = true, env = "POMR_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective model of one document
    Effective(EffectiveCommand),

    /// Build every document of a tree
    Project(ProjectCommand),

    /// Print a document as read and normalized
    Raw(RawCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the caller renders it.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// The settings the global flags describe.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Effective(cmd) => cmd.execute(config.config_path).await,
            Commands::Project(cmd) => cmd.execute(config.config_path).await,
            Commands::Raw(cmd) => cmd.execute(config.config_path).await,
        }
    }
}
