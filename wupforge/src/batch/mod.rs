//! Batch driver: fan independent per-title builds out over a worker pool.
//!
//! Each title owns a private scratch tree, so workers need no locking. The
//! one shared mutable resource, the base-file cache, is provisioned before
//! the pool starts (see [`crate::provision`]). A failed title is captured in
//! the report and never halts its siblings; nothing is retried.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::fsutil;
use crate::pipeline::{BuildError, BuildRequest, BuildStatus, TitleBuilder, SUSPECT_BUNDLE_SIZE};
use crate::title::{create_title, SourceImage, TitleOptions};

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Filename markers of the two-disc naming convention.
const DISC_1_MARKER: &str = "(Disc 1)";
const DISC_2_MARKER: &str = "(Disc 2)";

/// Errors that can occur while setting up a batch run.
#[derive(Debug)]
pub enum BatchError {
    /// Failed to scan an input path.
    ScanFailed { path: PathBuf, source: io::Error },

    /// Failed to build the worker pool.
    PoolBuild(String),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::ScanFailed { path, source } => {
                write!(f, "failed to scan {}: {}", path.display(), source)
            }
            BatchError::PoolBuild(msg) => write!(f, "failed to build worker pool: {}", msg),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchError::ScanFailed { source, .. } => Some(source),
            BatchError::PoolBuild(_) => None,
        }
    }
}

/// One completed title.
#[derive(Debug)]
pub struct BuiltTitle {
    /// Primary disc image the title was built from.
    pub source: PathBuf,

    /// Path of the output bundle.
    pub bundle: PathBuf,

    /// Whether the pipeline ran or short-circuited.
    pub status: BuildStatus,
}

/// One failed title.
#[derive(Debug)]
pub struct FailedTitle {
    /// Primary disc image the title was classified from.
    pub source: PathBuf,

    /// The failure that aborted this title.
    pub error: BuildError,
}

/// Aggregated outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<BuiltTitle>,
    pub failed: Vec<FailedTitle>,
}

impl BatchReport {
    /// Whether every title completed.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Discover buildable source images from files and directories.
///
/// Directories are scanned non-recursively for `.iso` files; dotfiles are
/// skipped. Files named with the `"(Disc 2)"` marker are never standalone
/// inputs; a `"(Disc 1)"` file is paired with its sibling when that sibling
/// exists.
pub fn discover_inputs(paths: &[PathBuf]) -> BatchResult<Vec<SourceImage>> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| BatchError::ScanFailed {
                    path: path.clone(),
                    source: e,
                })?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            for entry in entries {
                if let Some(image) = classify_input(&entry) {
                    images.push(image);
                }
            }
        } else if let Some(image) = classify_input(path) {
            images.push(image);
        }
    }
    Ok(images)
}

/// Apply the filename convention to a single candidate file.
fn classify_input(path: &Path) -> Option<SourceImage> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    let is_iso = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("iso"))
        .unwrap_or(false);
    if !is_iso {
        return None;
    }

    if name.contains(DISC_2_MARKER) {
        // Picked up through its disc-1 sibling.
        return None;
    }
    if name.contains(DISC_1_MARKER) {
        let second = path.with_file_name(name.replace(DISC_1_MARKER, DISC_2_MARKER));
        if second.is_file() {
            return Some(SourceImage::pair(path, second));
        }
        warn!(
            path = %path.display(),
            "disc 1 without a matching disc 2, treating as single disc"
        );
    }
    Some(SourceImage::single(path))
}

/// Build every source image on a bounded worker pool of `jobs` workers.
///
/// Classification and build failures are captured per title; the remaining
/// titles keep running. The default pool width of one is always correct;
/// wider pools trade memory and disk churn for throughput.
pub fn run_batch(
    builder: &TitleBuilder<'_>,
    images: &[SourceImage],
    output_dir: &Path,
    title_options: &TitleOptions,
    request: &BuildRequest,
    jobs: usize,
) -> BatchResult<BatchReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| BatchError::PoolBuild(e.to_string()))?;

    let results: Vec<(PathBuf, Result<crate::pipeline::BuildOutput, BuildError>)> =
        pool.install(|| {
            images
                .par_iter()
                .map(|image| {
                    info!(source = %image.primary.display(), "starting build");
                    let result = create_title(
                        &image.primary,
                        image.second_disc.clone(),
                        title_options,
                    )
                    .map_err(BuildError::from)
                    .and_then(|title| builder.build(&title, output_dir, request));
                    (image.primary.clone(), result)
                })
                .collect()
        });

    let mut report = BatchReport::default();
    for (source, result) in results {
        match result {
            Ok(output) => {
                info!(
                    source = %source.display(),
                    bundle = %output.path.display(),
                    "build finished"
                );
                check_bundle_size(&output.path);
                report.succeeded.push(BuiltTitle {
                    source,
                    bundle: output.path,
                    status: output.status,
                });
            }
            Err(error) => {
                warn!(source = %source.display(), error = %error, "build failed");
                report.failed.push(FailedTitle { source, error });
            }
        }
    }
    Ok(report)
}

/// An implausibly small bundle usually means a collaborator quietly
/// produced garbage; surface it without failing the title.
fn check_bundle_size(bundle: &Path) {
    match fsutil::dir_size(bundle) {
        Ok(size) if size < SUSPECT_BUNDLE_SIZE => {
            warn!(
                bundle = %bundle.display(),
                size,
                "bundle is implausibly small"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(bundle = %bundle.display(), "could not size bundle: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_discover_scans_directory_non_recursively() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("one.iso"));
        touch(&temp.path().join("two.ISO"));
        touch(&temp.path().join("notes.txt"));
        touch(&temp.path().join(".hidden.iso"));
        fs::create_dir(temp.path().join("nested")).unwrap();
        touch(&temp.path().join("nested/three.iso"));

        let images = discover_inputs(&[temp.path().to_path_buf()]).unwrap();
        let mut names: Vec<String> = images
            .iter()
            .map(|i| {
                i.primary
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["one.iso", "two.ISO"]);
    }

    #[test]
    fn test_discover_pairs_two_disc_releases() {
        let temp = TempDir::new().unwrap();
        let disc1 = temp.path().join("Example Quest (Disc 1).iso");
        let disc2 = temp.path().join("Example Quest (Disc 2).iso");
        touch(&disc1);
        touch(&disc2);

        let images = discover_inputs(&[temp.path().to_path_buf()]).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].primary, disc1);
        assert_eq!(images[0].second_disc.as_ref(), Some(&disc2));
    }

    #[test]
    fn test_discover_disc_1_without_sibling_is_single() {
        let temp = TempDir::new().unwrap();
        let disc1 = temp.path().join("Example Quest (Disc 1).iso");
        touch(&disc1);

        let images = discover_inputs(&[temp.path().to_path_buf()]).unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].second_disc.is_none());
    }

    #[test]
    fn test_discover_accepts_explicit_files() {
        let temp = TempDir::new().unwrap();
        let iso = temp.path().join("game.iso");
        touch(&iso);

        let images = discover_inputs(&[iso.clone()]).unwrap();
        assert_eq!(images, vec![SourceImage::single(iso)]);
    }

    #[test]
    fn test_discover_nonexistent_path_yields_nothing() {
        let result = discover_inputs(&[PathBuf::from("/nonexistent/dir/")]);
        assert!(result.unwrap().is_empty());
    }
}
