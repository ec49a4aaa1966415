//! The per-title build pipeline.
//!
//! [`TitleBuilder::build`] turns one classified [`Title`] into one
//! installable bundle at a deterministic output path, running the staged
//! transformations in strict order inside a private scratch tree:
//!
//! 1. ensure shared base files (provisioning, idempotent)
//! 2. seed the build tree from the launcher shell
//! 3. render the app and meta descriptors
//! 4. resolve icon/banner sources
//! 5. convert textures
//! 6. normalize the disc image (variant-specific)
//! 7. extract ticket and metadata blobs
//! 8. convert to the streaming container format
//! 9. encrypt into the final bundle
//!
//! A bundle that already exists on disk short-circuits to
//! [`BuildStatus::AlreadyBuilt`] without invoking any collaborator. Scratch
//! directories are released on every exit path; only the bundle persists.

mod log;
mod prepare;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;

use crate::artwork::{ArtworkError, ArtworkResolver, HttpClient};
use crate::config::KeyConfig;
use crate::fsutil;
use crate::manifest::{self, ManifestError};
use crate::provision::{ProvisionError, Provisioner};
use crate::texture::{self, TextureError};
use crate::title::{Title, TitleError};
use crate::toolkit::{DiscToolkit, FormatConverter, Packager, ToolError, ToolSet};

use log::BuildLog;

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Platform namespace prefix of every output bundle.
pub const BUNDLE_PREFIX: &str = "WUP-N";

/// Fixed category code embedded in every bundle name.
pub const CATEGORY_CODE: &str = "00050002";

/// Bundles smaller than this are almost certainly broken; the batch driver
/// logs a warning for them.
pub(crate) const SUSPECT_BUNDLE_SIZE: u64 = 50 * 1024 * 1024;

/// Deterministic bundle directory name for a title.
pub fn bundle_name(title: &Title) -> Result<String, TitleError> {
    Ok(format!(
        "{}-{}_{}{}",
        BUNDLE_PREFIX,
        title.title_id_text()?,
        CATEGORY_CODE,
        title.title_id_hex()
    ))
}

/// Errors that can occur during a build.
#[derive(Debug)]
pub enum BuildError {
    /// Title classification or identity derivation failed.
    Title(TitleError),

    /// Base-file provisioning failed.
    Provision(ProvisionError),

    /// Artwork resolution failed.
    Artwork(ArtworkError),

    /// Texture conversion failed.
    Texture(TextureError),

    /// Manifest rendering failed.
    Manifest(ManifestError),

    /// A collaborator invocation reported non-success.
    Stage(ToolError),

    /// A filesystem operation inside the scratch tree failed.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Title(e) => write!(f, "title error: {}", e),
            BuildError::Provision(e) => write!(f, "provisioning failed: {}", e),
            BuildError::Artwork(e) => write!(f, "artwork resolution failed: {}", e),
            BuildError::Texture(e) => write!(f, "texture conversion failed: {}", e),
            BuildError::Manifest(e) => write!(f, "{}", e),
            BuildError::Stage(e) => write!(f, "build stage failed: {}", e),
            BuildError::Io { path, source } => {
                write!(f, "I/O error at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Title(e) => Some(e),
            BuildError::Provision(e) => Some(e),
            BuildError::Artwork(e) => Some(e),
            BuildError::Texture(e) => Some(e),
            BuildError::Manifest(e) => Some(e),
            BuildError::Stage(e) => Some(e),
            BuildError::Io { source, .. } => Some(source),
        }
    }
}

impl From<TitleError> for BuildError {
    fn from(e: TitleError) -> Self {
        BuildError::Title(e)
    }
}

impl From<ProvisionError> for BuildError {
    fn from(e: ProvisionError) -> Self {
        BuildError::Provision(e)
    }
}

impl From<ArtworkError> for BuildError {
    fn from(e: ArtworkError) -> Self {
        BuildError::Artwork(e)
    }
}

impl From<TextureError> for BuildError {
    fn from(e: TextureError) -> Self {
        BuildError::Texture(e)
    }
}

impl From<ManifestError> for BuildError {
    fn from(e: ManifestError) -> Self {
        BuildError::Manifest(e)
    }
}

impl From<ToolError> for BuildError {
    fn from(e: ToolError) -> Self {
        BuildError::Stage(e)
    }
}

/// How a build produced its output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The pipeline ran and produced a fresh bundle.
    Built,

    /// The bundle already existed; nothing was invoked.
    AlreadyBuilt,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Path of the output bundle.
    pub path: PathBuf,

    /// Whether the pipeline actually ran.
    pub status: BuildStatus,
}

/// Explicit per-build inputs beyond the title itself.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Caller-supplied icon source, taking precedence over overrides and
    /// remote lookup.
    pub icon: Option<PathBuf>,

    /// Caller-supplied TV banner source.
    pub banner: Option<PathBuf>,
}

/// Drives the staged build of single titles.
///
/// The builder borrows all collaborators and shared configuration; it holds
/// no per-build state, so one builder can serve every worker of a batch.
pub struct TitleBuilder<'a> {
    keys: &'a KeyConfig,
    tools: &'a ToolSet,
    http: &'a dyn HttpClient,
    provisioner: Provisioner<'a>,
    artwork_base_url: Option<String>,
    scratch_root: Option<PathBuf>,
}

impl<'a> TitleBuilder<'a> {
    /// Create a builder from shared configuration and collaborators.
    pub fn new(
        keys: &'a KeyConfig,
        tools: &'a ToolSet,
        http: &'a dyn HttpClient,
        provisioner: Provisioner<'a>,
    ) -> Self {
        Self {
            keys,
            tools,
            http,
            provisioner,
            artwork_base_url: None,
            scratch_root: None,
        }
    }

    /// Override the remote artwork repository root.
    pub fn with_artwork_base_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_base_url = Some(url.into());
        self
    }

    /// Create scratch directories under `root` instead of the system
    /// temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// The provisioner this builder seeds bundles from.
    pub fn provisioner(&self) -> &Provisioner<'a> {
        &self.provisioner
    }

    /// Build one title into `output_dir`.
    ///
    /// Returns the deterministic bundle path. If the bundle already exists
    /// the build short-circuits with [`BuildStatus::AlreadyBuilt`] and
    /// invokes no collaborator; otherwise any stage failure aborts this
    /// title only, releasing all scratch state.
    pub fn build(
        &self,
        title: &Title,
        output_dir: &Path,
        request: &BuildRequest,
    ) -> BuildResult<BuildOutput> {
        let name = bundle_name(title)?;
        let output_path = output_dir.join(&name);

        fs::create_dir_all(output_dir).map_err(|e| BuildError::Io {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        let log_path = output_dir.join(format!("{}.log", name));
        let mut log = BuildLog::create(&log_path).map_err(|e| BuildError::Io {
            path: log_path,
            source: e,
        })?;

        if output_path.is_dir() {
            warn!(
                path = %output_path.display(),
                "refusing to write to existing bundle, skipping build"
            );
            log.stage("bundle already exists, nothing to do");
            return Ok(BuildOutput {
                path: output_path,
                status: BuildStatus::AlreadyBuilt,
            });
        }

        let text = title.title_id_text()?;
        let build_dir = self.scratch_dir(&format!("build_{}_", text))?;
        let work_dir = self.scratch_dir(&format!("work_{}_", text))?;
        let code_dir = build_dir.path().join("code");
        let meta_dir = build_dir.path().join("meta");
        let content_dir = build_dir.path().join("content");

        log.stage("ensuring shared base files");
        self.provisioner.ensure_base_files()?;

        log.stage("seeding build tree from launcher base files");
        fsutil::copy_dir_all(&self.provisioner.launcher_base_dir(), build_dir.path()).map_err(
            |e| BuildError::Io {
                path: build_dir.path().to_path_buf(),
                source: e,
            },
        )?;

        log.stage("rendering app.xml and meta.xml");
        self.render_manifests(title, &code_dir, &meta_dir)?;

        log.stage("resolving icon and banner artwork");
        let image_dir = work_dir.path().join("imgs");
        fs::create_dir_all(&image_dir).map_err(|e| BuildError::Io {
            path: image_dir.clone(),
            source: e,
        })?;
        let mut resolver = ArtworkResolver::new(self.http);
        if let Some(base_url) = &self.artwork_base_url {
            resolver = resolver.with_base_url(base_url.clone());
        }
        let artwork = resolver.resolve(
            title,
            &image_dir,
            request.icon.as_deref(),
            request.banner.as_deref(),
        )?;

        log.stage("converting artwork to native textures");
        texture::convert(&artwork.icon, "iconTex.tga", &meta_dir, 128, 128, 32)?;
        texture::convert(&artwork.banner, "bootTvTex.tga", &meta_dir, 1280, 720, 24)?;
        // The gamepad banner is derived from the same TV banner source.
        texture::convert(&artwork.banner, "bootDrcTex.tga", &meta_dir, 854, 480, 24)?;

        log.stage("preparing normalized disc image");
        let image = prepare::prepare_iso(title, self.tools, work_dir.path())?;

        log.stage("extracting ticket and metadata");
        DiscToolkit::new(self.tools).extract_tickets(&image, &code_dir)?;

        log.stage("converting disc image to streaming container");
        FormatConverter::new(self.tools).convert(&image, &content_dir, title.nfs_patch_flags())?;

        log.stage("encrypting contents into installable bundle");
        Packager::new(self.tools).pack(
            build_dir.path(),
            &output_path,
            &self.keys.wiiu_common_key,
        )?;

        log.stage("build complete");
        Ok(BuildOutput {
            path: output_path,
            status: BuildStatus::Built,
        })
    }

    fn render_manifests(
        &self,
        title: &Title,
        code_dir: &Path,
        meta_dir: &Path,
    ) -> BuildResult<()> {
        let hex = title.title_id_hex();
        let text = title.title_id_text()?;

        for dir in [code_dir, meta_dir] {
            fs::create_dir_all(dir).map_err(|e| BuildError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let app_xml = manifest::render_app_xml(&hex)?;
        let app_path = code_dir.join("app.xml");
        fs::write(&app_path, app_xml).map_err(|e| BuildError::Io {
            path: app_path,
            source: e,
        })?;

        let meta_xml =
            manifest::render_meta_xml(&text, &hex, title.drc_use(), title.game_name(), None)?;
        let meta_path = meta_dir.join("meta.xml");
        fs::write(&meta_path, meta_xml).map_err(|e| BuildError::Io {
            path: meta_path,
            source: e,
        })?;
        Ok(())
    }

    fn scratch_dir(&self, prefix: &str) -> BuildResult<TempDir> {
        let builder_err = |e: io::Error| BuildError::Io {
            path: self
                .scratch_root
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            source: e,
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root).map_err(builder_err),
            None => builder.tempdir().map_err(builder_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::{TitleVariant, WiiRetailOptions};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn test_title() -> Title {
        Title::new(
            PathBuf::from("/isos/game.iso"),
            u32::from_le_bytes(*b"GALE"),
            "Example Game".to_string(),
            "GALE01".to_string(),
            TitleVariant::WiiRetail(WiiRetailOptions::default()),
        )
    }

    fn test_keys() -> KeyConfig {
        KeyConfig {
            wiiu_common_key: "aa55".to_string(),
            launcher_title_key: "bb66".to_string(),
        }
    }

    #[test]
    fn test_bundle_name_format() {
        assert_eq!(
            bundle_name(&test_title()).unwrap(),
            "WUP-N-GALE_0005000247414C45"
        );
    }

    #[test]
    fn test_existing_bundle_short_circuits_without_collaborators() {
        let temp = TempDir::new().unwrap();
        let output_dir = temp.path().join("out");
        let bundle = output_dir.join("WUP-N-GALE_0005000247414C45");
        fs::create_dir_all(&bundle).unwrap();

        let keys = test_keys();
        // Bogus tool root: any collaborator invocation would fail loudly.
        let tools = ToolSet::new("/nonexistent/tools");
        let mock =
            crate::artwork::http::tests::MockHttpClient::new(HashMap::new());
        let provisioner = Provisioner::new(&tools, &keys, temp.path().join("cache"));
        let builder = TitleBuilder::new(&keys, &tools, &mock, provisioner);

        let title = test_title();
        let first = builder
            .build(&title, &output_dir, &BuildRequest::default())
            .unwrap();
        let second = builder
            .build(&title, &output_dir, &BuildRequest::default())
            .unwrap();

        assert_eq!(first.status, BuildStatus::AlreadyBuilt);
        assert_eq!(second.status, BuildStatus::AlreadyBuilt);
        assert_eq!(first.path, second.path);
        assert_eq!(first.path, bundle);
        assert!(mock.requested().is_empty());
    }

    #[test]
    fn test_short_circuit_writes_build_log() {
        let temp = TempDir::new().unwrap();
        let output_dir = temp.path().join("out");
        let bundle = output_dir.join("WUP-N-GALE_0005000247414C45");
        fs::create_dir_all(&bundle).unwrap();

        let keys = test_keys();
        let tools = ToolSet::new("/nonexistent/tools");
        let mock =
            crate::artwork::http::tests::MockHttpClient::new(HashMap::new());
        let provisioner = Provisioner::new(&tools, &keys, temp.path().join("cache"));
        let builder = TitleBuilder::new(&keys, &tools, &mock, provisioner);

        builder
            .build(&test_title(), &output_dir, &BuildRequest::default())
            .unwrap();

        let log = output_dir.join("WUP-N-GALE_0005000247414C45.log");
        assert!(log.is_file());
    }
}
