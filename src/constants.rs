//! Global constants used throughout the pomr codebase.
//!
//! File names, parallelism parameters and other values that several modules
//! agree on. Defining them centrally keeps magic values discoverable.

/// File name of a build description inside a project directory.
pub const DOCUMENT_FILE_NAME: &str = "pom.toml";

/// Extension of documents stored in a local repository.
pub const REPOSITORY_DOCUMENT_EXTENSION: &str = "pom.toml";

/// Directory whose presence marks the root of a multi-document tree.
pub const ROOT_MARKER_DIR: &str = ".pomr";

/// Default relative path from a child to its parent.
pub const DEFAULT_PARENT_RELATIVE_PATH: &str = "..";

/// Minimum number of parallel document loads regardless of CPU count.
pub const MIN_PARALLELISM: usize = 1;

/// Default CPU core count when detection fails.
///
/// Used as a fallback when `std::thread::available_parallelism()` returns an error.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Maximum nesting of `${...}` expansions before interpolation gives up.
///
/// Guards against self-referencing properties like `a = "${a}"`.
pub const MAX_INTERPOLATION_DEPTH: usize = 32;

/// Maximum number of directory entries a glob in a file activation may visit.
pub const MAX_ACTIVATION_WALK_ENTRIES: usize = 10_000;

/// Default parallelism: the number of available cores.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(FALLBACK_CORE_COUNT)
        .max(MIN_PARALLELISM)
}
