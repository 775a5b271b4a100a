//! Arguments and helpers shared by the commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use crate::config::GlobalConfig;
use crate::constants::DOCUMENT_FILE_NAME;
use crate::model::{Document, DocumentSource};
use crate::session::{BuildRequest, ModelBuilder, ModelBuilderSession, RequestKind};
use crate::spi::{DocumentIo, Strictness, TomlDocumentIo};

/// How documents are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `pom.toml` syntax
    #[default]
    Toml,
    /// Pretty-printed JSON
    Json,
}

/// Options every resolving command accepts.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolutionArgs {
    /// Profiles to activate, comma separated; prefix an id with `!` or `-` to deactivate it
    #[arg(short = 'P', long = "activate-profiles", value_delimiter = ',')]
    pub profiles: Vec<String>,

    /// User property, `name=value`; may be repeated
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Validation level (defaults to the configured one)
    #[arg(long, value_enum)]
    pub validation: Option<Strictness>,

    /// Repository root searched before the configured ones; may be repeated
    #[arg(long = "repository", value_name = "DIR")]
    pub repositories: Vec<String>,
}

/// Parse `name=value`. A bare `name` means `name=true`.
pub fn parse_property(text: &str) -> Result<(String, String), String> {
    let (name, value) = text.split_once('=').unwrap_or((text, "true"));
    if name.trim().is_empty() {
        return Err(format!("invalid property '{text}': the name is empty"));
    }
    Ok((name.trim().to_string(), value.to_string()))
}

impl ResolutionArgs {
    /// Requested active and inactive profile ids.
    pub fn profile_selection(&self) -> (Vec<String>, Vec<String>) {
        let mut active = Vec::new();
        let mut inactive = Vec::new();
        for id in self.profiles.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            match id.strip_prefix('!').or_else(|| id.strip_prefix('-')) {
                Some(id) => inactive.push(id.to_string()),
                None => active.push(id.strip_prefix('+').unwrap_or(id).to_string()),
            }
        }
        (active, inactive)
    }

    /// A request for `source` with these options layered over `config`.
    pub fn request(&self, source: DocumentSource, kind: RequestKind, config: &GlobalConfig) -> BuildRequest {
        let (active, inactive) = self.profile_selection();
        BuildRequest::new(source, kind)
            .with_active_profiles(active)
            .with_inactive_profiles(inactive)
            .with_user_properties(config.properties.clone())
            .with_user_properties(self.properties.iter().cloned().collect())
            .with_strictness(self.validation.unwrap_or_else(|| config.validation()))
            .with_repositories(self.repositories.clone())
    }
}

/// The document a path names: the path itself, or the `pom.toml` inside it.
pub fn document_source(path: &Path) -> Result<DocumentSource> {
    let path: PathBuf = if path.is_dir() { path.join(DOCUMENT_FILE_NAME) } else { path.to_path_buf() };
    if !path.is_file() {
        anyhow::bail!("No {DOCUMENT_FILE_NAME} found at {}", path.display());
    }
    Ok(DocumentSource::from_path(path))
}

/// Load the configuration and open a session over it.
pub async fn open_session(config_path: Option<PathBuf>) -> Result<(GlobalConfig, ModelBuilderSession)> {
    let config = GlobalConfig::load_with_optional(config_path)
        .await
        .context("Failed to load the global configuration")?;
    let session = ModelBuilder::from_config(&config)?.new_session();
    Ok((config, session))
}

/// Render a document in `format`.
pub fn render_document(document: &Document, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Toml => Ok(TomlDocumentIo.write(document)?),
        OutputFormat::Json => {
            serde_json::to_string_pretty(document).context("Failed to serialize the document as JSON")
        }
    }
}
