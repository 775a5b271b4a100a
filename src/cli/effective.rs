//! `pomr effective`: print the effective model of one document.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::debug;

use super::common::{OutputFormat, ResolutionArgs, document_source, open_session, render_document};
use crate::session::RequestKind;

/// Resolve one document and print its effective model.
#[derive(Args, Debug)]
pub struct EffectiveCommand {
    /// The document, or the directory holding its pom.toml
    pub path: PathBuf,

    #[command(flatten)]
    pub resolution: ResolutionArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Toml)]
    pub format: OutputFormat,
}

impl EffectiveCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be resolved without errors.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let (config, session) = open_session(config_path).await?;
        let source = document_source(&self.path)?;
        let request = self.resolution.request(source, RequestKind::Effective, &config);

        let result = session.build_effective(&request).await?;
        for problem in result.problems.problems() {
            eprintln!("{problem}");
        }
        debug!("active profiles: {:?}", result.active_profiles);
        if let Some(document) = &result.effective_document {
            print!("{}", render_document(document, self.format)?);
        }
        Ok(())
    }
}
