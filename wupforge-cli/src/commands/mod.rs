//! CLI command implementations.

pub mod build;
pub mod provision;

use std::path::PathBuf;

/// Default base-file cache location under the system temporary directory.
pub(crate) fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("wupforge_base_files")
}
