//! pomr CLI entry point
//!
//! Parses the command line, runs the command and renders errors:
//! - `effective` - print the effective model of one document
//! - `project` - build a tree of documents
//! - `raw` - print a document as read and normalized

use anyhow::Result;
use clap::Parser;
use pomr::cli;
use pomr::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
