//! Locating the root of a multi-document tree.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::RootLocator;
use crate::config::parse_config;
use crate::constants::{DOCUMENT_FILE_NAME, ROOT_MARKER_DIR};

#[derive(Debug, Default, Deserialize)]
struct RootFlag {
    #[serde(default)]
    root: bool,
}

/// Walks up from the start directory to the nearest ancestor that contains a
/// `.pomr` directory or whose `pom.toml` declares `root = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerRootLocator;

impl MarkerRootLocator {
    fn is_root(dir: &Path) -> bool {
        if dir.join(ROOT_MARKER_DIR).is_dir() {
            return true;
        }
        let document = dir.join(DOCUMENT_FILE_NAME);
        document.is_file() && parse_config::<RootFlag>(&document).is_ok_and(|flag| flag.root)
    }
}

impl RootLocator for MarkerRootLocator {
    fn find_root(&self, start: &Path) -> PathBuf {
        for dir in start.ancestors() {
            if Self::is_root(dir) {
                debug!("root of {} is {}", start.display(), dir.display());
                return dir.to_path_buf();
            }
        }
        start.to_path_buf()
    }
}
