//! `pomr project`: build every document of a tree.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{ResolutionArgs, document_source, open_session};
use crate::core::PomrError;
use crate::session::RequestKind;

/// Load a tree of documents and print each one with its profiles and problems.
#[derive(Args, Debug)]
pub struct ProjectCommand {
    /// Where to start: a document or a directory
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub resolution: ResolutionArgs,

    /// Maximum number of documents loaded or resolved concurrently
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Start at the given document instead of the nearest root above it
    #[arg(long)]
    pub no_root_lookup: bool,
}

impl ProjectCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if any document of the tree has an Error or Fatal problem.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let (config, session) = open_session(config_path).await?;
        let source = document_source(&self.dir)?;
        let mut request = self
            .resolution
            .request(source, RequestKind::Project, &config)
            .with_root_lookup(!self.no_root_lookup);
        if let Some(max_parallel) = self.max_parallel {
            request = request.with_max_parallel(max_parallel);
        }

        match session.build(&request).await {
            Ok(result) => {
                print!("{result}");
                println!(
                    "{} {} documents",
                    "Built".green().bold(),
                    result.flatten().len()
                );
                Ok(())
            }
            Err(PomrError::ModelBuilding(error)) => {
                if let Some(result) = &error.result {
                    print!("{result}");
                }
                Err(PomrError::ModelBuilding(error).into())
            }
            Err(error) => Err(error.into()),
        }
    }
}
