//! Shared base-file provisioning.
//!
//! Every bundle repackages into the same launcher shell, which needs a small
//! fixed set of platform system files plus the launcher title's own base
//! files. This module keeps one shared cache of those files, guarded by
//! existence plus MD5 digest, and fills it through the downloader tool when
//! anything is missing or corrupt.
//!
//! Provisioning is the one cross-cutting mutable resource of a batch run: it
//! must complete before any build worker starts and is read-only afterwards.

mod checksum;

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::KeyConfig;
use crate::fsutil;
use crate::toolkit::{Tool, ToolError, ToolSet};

pub use checksum::{file_digest, verify_digest};

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// CDN root the downloader tool fetches from.
const CDN_URL: &str = "http://ccs.cdn.wup.shop.nintendo.net/ccs/download";

/// Directory name of the launcher shell every bundle is seeded from.
pub const LAUNCHER_DIR: &str = "Rhythm Heaven Fever [VAKE01]";

/// One provisioned title: the files it contributes and their digests.
#[derive(Debug, Clone, Copy)]
pub struct FileManifest {
    /// Title id passed to the downloader.
    pub title_id: &'static str,

    /// Directory the downloader stages this title's files under.
    pub title_dir: &'static str,

    /// Whether the download needs the launcher title key.
    pub needs_title_key: bool,

    /// Relative path and expected MD5 digest of every file.
    pub files: &'static [(&'static str, &'static str)],
}

/// Base files required by every bundle.
const BASE_MANIFESTS: &[FileManifest] = &[
    FileManifest {
        title_id: "0005001010004000",
        title_dir: "0005001010004000",
        needs_title_key: false,
        files: &[
            ("code/deint.txt", "E707A62EE5491DD16E5494631EA9870A"),
            ("code/font.bin", "CDDAC70FDDB9428F220B048102DAAD40"),
        ],
    },
    FileManifest {
        title_id: "0005001010004001",
        title_dir: "0005001010004001",
        needs_title_key: false,
        files: &[
            ("code/c2w.img", "FC5EE480F58796C3681BEE78BD3E5D1C"),
            ("code/boot.bin", "F4D5F095CBA9504A5CB8A94A4781114C"),
            ("code/dmcu.d.hex", "E32FCBCC817C443E0832DE5CA9032808"),
        ],
    },
    FileManifest {
        title_id: "00050000101b0700",
        title_dir: LAUNCHER_DIR,
        needs_title_key: true,
        files: &[
            ("code/cos.xml", "42215713D951C2023F90164ED9DF900F"),
            ("code/frisbiiU.rpx", "69E191E8B0DF1D5304B36F1375C4F127"),
            ("code/fw.img", "3CAF52A9A440EEE4F125A3AD22E305C8"),
            ("code/fw.tmd", "AE4E06CAD3BEF60AE5C49E22CCDC3254"),
            ("code/htk.bin", "C99CAF5995E395F39C3FCAB4A8AF20E0"),
            ("code/nn_hai_user.rpl", "C4BF586BA0071BD8477986C1AA37E1F1"),
            (
                "content/assets/shaders/cafe/banner.gsh",
                "5F2FA196DFC158F0FCC69272073AE07E",
            ),
            (
                "content/assets/shaders/cafe/fade.gsh",
                "307221985A7B46F0386A2637DC15DA3E",
            ),
            ("meta/bootMovie.h264", "CA0DAC3E3C5654209C754357EF5A2507"),
            ("meta/bootLogoTex.tga", "67B312145ECB70514D5BD36FCAAE0193"),
            ("meta/bootSound.btsnd", "43CD445B8569A445F97ECCC098C93B38"),
        ],
    },
];

/// Errors that can occur during provisioning.
#[derive(Debug)]
pub enum ProvisionError {
    /// Failed to read a file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write, copy or remove a file or directory.
    WriteFailed { path: PathBuf, source: io::Error },

    /// A provisioned file failed digest verification.
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The downloader reported success but the expected file is absent.
    MissingDownload { path: PathBuf },

    /// The downloader tool failed.
    Tool(ToolError),
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ProvisionError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            ProvisionError::ChecksumMismatch {
                filename,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "checksum mismatch for {}: expected {}, got {}",
                    filename, expected, actual
                )
            }
            ProvisionError::MissingDownload { path } => {
                write!(f, "downloader produced no file at {}", path.display())
            }
            ProvisionError::Tool(e) => write!(f, "downloader failed: {}", e),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::ReadFailed { source, .. } => Some(source),
            ProvisionError::WriteFailed { source, .. } => Some(source),
            ProvisionError::Tool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ToolError> for ProvisionError {
    fn from(e: ToolError) -> Self {
        ProvisionError::Tool(e)
    }
}

/// Provisions and verifies the shared base-file cache.
pub struct Provisioner<'a> {
    downloader: Tool,
    downloader_dir: PathBuf,
    keys: &'a KeyConfig,
    cache_dir: PathBuf,
    manifests: &'static [FileManifest],
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner for the standard base-file manifests.
    pub fn new(tools: &ToolSet, keys: &'a KeyConfig, cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_manifests(tools, keys, cache_dir, BASE_MANIFESTS)
    }

    /// Create a provisioner over custom manifests.
    pub fn with_manifests(
        tools: &ToolSet,
        keys: &'a KeyConfig,
        cache_dir: impl Into<PathBuf>,
        manifests: &'static [FileManifest],
    ) -> Self {
        Self {
            downloader: tools.downloader(),
            downloader_dir: tools.downloader_dir(),
            keys,
            cache_dir: cache_dir.into(),
            manifests,
        }
    }

    /// The shared cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cached base files of the launcher shell bundles are seeded from.
    pub fn launcher_base_dir(&self) -> PathBuf {
        self.cache_dir.join(LAUNCHER_DIR)
    }

    /// Ensure every base file is present in the cache with a matching
    /// digest, downloading whatever is missing. Idempotent; a fully
    /// verified cache performs no downloads.
    pub fn ensure_base_files(&self) -> ProvisionResult<()> {
        if self.all_files_verified()? {
            debug!(cache = %self.cache_dir.display(), "base files already provisioned");
            return Ok(());
        }

        info!(cache = %self.cache_dir.display(), "provisioning shared base files");
        self.write_downloader_config()?;

        for manifest in self.manifests {
            for (rel_path, digest) in manifest.files {
                let staged = self.downloader_dir.join(manifest.title_dir).join(rel_path);
                if !staged.is_file() {
                    self.download_file(manifest, rel_path)?;
                    if !staged.is_file() {
                        return Err(ProvisionError::MissingDownload { path: staged });
                    }
                }
                checksum::verify_digest(&staged, digest)?;
            }
        }

        self.promote_staged_files()?;

        let config_path = self.downloader_dir.join("config");
        fs::remove_file(&config_path).map_err(|e| ProvisionError::WriteFailed {
            path: config_path,
            source: e,
        })?;
        Ok(())
    }

    /// Existence-plus-checksum guard over the cache. A missing file or a
    /// stale digest triggers re-provisioning; it is not an error here.
    fn all_files_verified(&self) -> ProvisionResult<bool> {
        for manifest in self.manifests {
            for (rel_path, digest) in manifest.files {
                let path = self.cache_dir.join(manifest.title_dir).join(rel_path);
                if !path.is_file() {
                    return Ok(false);
                }
                if !checksum::file_digest(&path)?.eq_ignore_ascii_case(digest) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// The downloader reads its CDN endpoint and decryption key from a
    /// two-line config file beside the executable.
    fn write_downloader_config(&self) -> ProvisionResult<()> {
        let config_path = self.downloader_dir.join("config");
        let contents = format!("{}\n{}", CDN_URL, self.keys.wiiu_common_key);
        fs::write(&config_path, contents).map_err(|e| ProvisionError::WriteFailed {
            path: config_path,
            source: e,
        })
    }

    fn download_file(&self, manifest: &FileManifest, rel_path: &str) -> ProvisionResult<()> {
        let mut args: Vec<OsString> = vec![manifest.title_id.into()];
        if manifest.needs_title_key {
            args.push(self.keys.launcher_title_key.clone().into());
        }
        args.push("-file".into());
        args.push(format!("/{}", rel_path).into());

        self.downloader.run_in(&self.downloader_dir, &args)?;
        Ok(())
    }

    /// Move the staged title directories into the shared cache, replacing
    /// any stale copies.
    fn promote_staged_files(&self) -> ProvisionResult<()> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| ProvisionError::WriteFailed {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        for manifest in self.manifests {
            let staged_dir = self.downloader_dir.join(manifest.title_dir);
            let cached_dir = self.cache_dir.join(manifest.title_dir);

            if cached_dir.exists() {
                fs::remove_dir_all(&cached_dir).map_err(|e| ProvisionError::WriteFailed {
                    path: cached_dir.clone(),
                    source: e,
                })?;
            }
            fsutil::copy_dir_all(&staged_dir, &cached_dir).map_err(|e| {
                ProvisionError::WriteFailed {
                    path: cached_dir.clone(),
                    source: e,
                }
            })?;
            fs::remove_dir_all(&staged_dir).map_err(|e| ProvisionError::WriteFailed {
                path: staged_dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_MANIFESTS: &[FileManifest] = &[FileManifest {
        title_id: "0005000000000000",
        title_dir: "TestTitle",
        needs_title_key: false,
        // MD5 of "hello world"
        files: &[("code/hello.bin", "5eb63bbbe01eeed093cb22bb8f5acdc3")],
    }];

    fn test_keys() -> KeyConfig {
        KeyConfig {
            wiiu_common_key: "aa55".to_string(),
            launcher_title_key: "bb66".to_string(),
        }
    }

    fn toolset_with_jar_dir(temp: &TempDir) -> ToolSet {
        let root = temp.path().join("tools");
        fs::create_dir_all(root.join("JAR")).unwrap();
        ToolSet::new(root)
    }

    #[test]
    fn test_ensure_with_verified_cache_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let tools = toolset_with_jar_dir(&temp);
        let cache = temp.path().join("cache");
        fs::create_dir_all(cache.join("TestTitle/code")).unwrap();
        fs::write(cache.join("TestTitle/code/hello.bin"), b"hello world").unwrap();

        let keys = test_keys();
        let provisioner = Provisioner::with_manifests(&tools, &keys, &cache, TEST_MANIFESTS);

        // The downloader tool does not exist; a verified cache must never
        // reach for it.
        provisioner.ensure_base_files().unwrap();
    }

    #[test]
    fn test_ensure_missing_file_reaches_for_downloader() {
        let temp = TempDir::new().unwrap();
        let tools = toolset_with_jar_dir(&temp);
        let cache = temp.path().join("cache");

        let keys = test_keys();
        let provisioner = Provisioner::with_manifests(&tools, &keys, &cache, TEST_MANIFESTS);

        let result = provisioner.ensure_base_files();
        assert!(matches!(
            result,
            Err(ProvisionError::Tool(ToolError::Launch { .. }))
        ));
    }

    #[test]
    fn test_ensure_stale_digest_triggers_reprovision() {
        let temp = TempDir::new().unwrap();
        let tools = toolset_with_jar_dir(&temp);
        let cache = temp.path().join("cache");
        fs::create_dir_all(cache.join("TestTitle/code")).unwrap();
        fs::write(cache.join("TestTitle/code/hello.bin"), b"corrupted").unwrap();

        let keys = test_keys();
        let provisioner = Provisioner::with_manifests(&tools, &keys, &cache, TEST_MANIFESTS);

        // Stale digest invalidates the cache; provisioning restarts and
        // fails on the absent downloader tool.
        let result = provisioner.ensure_base_files();
        assert!(matches!(result, Err(ProvisionError::Tool(_))));
    }

    #[test]
    fn test_staged_files_are_promoted_without_download() {
        let temp = TempDir::new().unwrap();
        let tools = toolset_with_jar_dir(&temp);
        let cache = temp.path().join("cache");

        // A previous interrupted run left verified files staged beside the
        // downloader.
        let staged = temp.path().join("tools/JAR/TestTitle/code");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("hello.bin"), b"hello world").unwrap();

        let keys = test_keys();
        let provisioner = Provisioner::with_manifests(&tools, &keys, &cache, TEST_MANIFESTS);
        provisioner.ensure_base_files().unwrap();

        assert!(cache.join("TestTitle/code/hello.bin").is_file());
        assert!(!temp.path().join("tools/JAR/TestTitle").exists());
        assert!(!temp.path().join("tools/JAR/config").exists());
    }

    #[test]
    fn test_launcher_base_dir_is_under_cache() {
        let temp = TempDir::new().unwrap();
        let tools = toolset_with_jar_dir(&temp);
        let keys = test_keys();
        let provisioner = Provisioner::new(&tools, &keys, temp.path().join("cache"));

        assert_eq!(
            provisioner.launcher_base_dir(),
            temp.path().join("cache").join(LAUNCHER_DIR)
        );
    }
}
