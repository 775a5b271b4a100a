//! `pomr raw`: print a document as read and normalized.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::common::{OutputFormat, ResolutionArgs, document_source, open_session, render_document};
use crate::session::RequestKind;

/// Print the raw form of a document: no parent, no profiles, no interpolation.
#[derive(Args, Debug)]
pub struct RawCommand {
    /// The document, or the directory holding its pom.toml
    pub path: PathBuf,

    /// Validation level (defaults to the configured one)
    #[arg(long, value_enum)]
    pub validation: Option<crate::spi::Strictness>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Toml)]
    pub format: OutputFormat,
}

impl RawCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or fails validation.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let (config, session) = open_session(config_path).await?;
        let source = document_source(&self.path)?;
        let resolution = ResolutionArgs {
            validation: self.validation,
            ..ResolutionArgs::default()
        };
        let request = resolution.request(source, RequestKind::RawOnly, &config);

        let result = session.build_raw_only(&request).await?;
        for problem in result.problems.problems() {
            eprintln!("{problem}");
        }
        if let Some(document) = &result.raw_document {
            print!("{}", render_document(document, self.format)?);
        }
        Ok(())
    }
}
