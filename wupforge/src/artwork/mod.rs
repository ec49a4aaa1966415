//! Icon and banner resolution for one title.
//!
//! Resolution order per asset:
//! 1. an explicit caller-supplied file
//! 2. a local override colocated with the source disc image
//!    (`icons/<disc-stem>.png`, `banners/<disc-stem>.png`)
//! 3. remote candidates derived from the title's region-substituted image
//!    ids, probed in order, first success per asset independently
//!
//! Probing stops as soon as both assets are resolved. A non-200 response
//! means "try the next candidate"; there are no retries. Exhausting every
//! candidate with either asset still missing is a permanent failure.

pub(crate) mod http;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::title::Title;

pub use http::{HttpClient, ReqwestClient};

/// Root of the remote artwork repository.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/cucholix/wiivc-bis/master/";

/// Remote and staged filename of the icon texture source.
const ICON_FILENAME: &str = "iconTex.png";

/// Remote and staged filename of the TV banner texture source.
const BANNER_FILENAME: &str = "bootTvTex.png";

/// Result type for artwork operations.
pub type ArtworkResult<T> = Result<T, ArtworkError>;

/// Errors that can occur during artwork resolution.
#[derive(Debug)]
pub enum ArtworkError {
    /// An HTTP request could not be performed.
    Http(String),

    /// A local file operation failed.
    Io { path: PathBuf, source: io::Error },

    /// Every candidate was exhausted without resolving the asset.
    Retrieval {
        asset: &'static str,
        game_id: String,
    },
}

impl fmt::Display for ArtworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtworkError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ArtworkError::Io { path, source } => {
                write!(f, "failed to stage {}: {}", path.display(), source)
            }
            ArtworkError::Retrieval { asset, game_id } => {
                write!(f, "unable to retrieve {} for {}", asset, game_id)
            }
        }
    }
}

impl std::error::Error for ArtworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtworkError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Source image paths for the icon and TV banner, ready for texture
/// conversion. The gamepad banner is derived from the same TV banner image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtwork {
    pub icon: PathBuf,
    pub banner: PathBuf,
}

/// Resolves icon/banner sources for titles.
pub struct ArtworkResolver<'a> {
    http: &'a dyn HttpClient,
    base_url: String,
}

impl<'a> ArtworkResolver<'a> {
    /// Create a resolver probing the default remote repository.
    pub fn new(http: &'a dyn HttpClient) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the remote repository root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Candidate directory URLs for this title, in probe order.
    pub fn candidate_urls(&self, title: &Title) -> Vec<String> {
        title
            .possible_image_ids()
            .iter()
            .map(|id| format!("{}{}/image/{}/", self.base_url, title.system_type(), id))
            .collect()
    }

    /// Resolve both assets for `title`, staging downloaded files under
    /// `dest_dir`.
    ///
    /// # Errors
    ///
    /// [`ArtworkError::Retrieval`] when either asset is still missing after
    /// every candidate was probed.
    pub fn resolve(
        &self,
        title: &Title,
        dest_dir: &Path,
        icon_override: Option<&Path>,
        banner_override: Option<&Path>,
    ) -> ArtworkResult<ResolvedArtwork> {
        let mut icon = match icon_override {
            Some(path) => Some(path.to_path_buf()),
            None => local_override(title.source(), "icons", dest_dir, ICON_FILENAME)?,
        };
        let mut banner = match banner_override {
            Some(path) => Some(path.to_path_buf()),
            None => local_override(title.source(), "banners", dest_dir, BANNER_FILENAME)?,
        };

        if icon.is_none() || banner.is_none() {
            for url in self.candidate_urls(title) {
                if icon.is_none() {
                    icon = self.fetch_asset(&url, ICON_FILENAME, dest_dir)?;
                }
                if banner.is_none() {
                    banner = self.fetch_asset(&url, BANNER_FILENAME, dest_dir)?;
                }
                if icon.is_some() && banner.is_some() {
                    break;
                }
            }
        }

        let icon = icon.ok_or_else(|| ArtworkError::Retrieval {
            asset: "icon",
            game_id: title.full_game_id().to_string(),
        })?;
        let banner = banner.ok_or_else(|| ArtworkError::Retrieval {
            asset: "banner",
            game_id: title.full_game_id().to_string(),
        })?;

        Ok(ResolvedArtwork { icon, banner })
    }

    /// Probe one candidate for one asset. A non-200 response yields `None`.
    fn fetch_asset(
        &self,
        candidate_url: &str,
        filename: &str,
        dest_dir: &Path,
    ) -> ArtworkResult<Option<PathBuf>> {
        let url = format!("{}{}", candidate_url, filename);
        debug!(url = %url, "probing artwork candidate");
        match self.http.get(&url)? {
            Some(bytes) => {
                let dest = dest_dir.join(filename);
                fs::write(&dest, bytes).map_err(|e| ArtworkError::Io {
                    path: dest.clone(),
                    source: e,
                })?;
                info!(url = %url, "resolved {}", filename);
                Ok(Some(dest))
            }
            None => Ok(None),
        }
    }
}

/// Look for a local override beside the source disc image and stage it under
/// `dest_dir` when present.
fn local_override(
    source: &Path,
    subdir: &str,
    dest_dir: &Path,
    dest_name: &str,
) -> ArtworkResult<Option<PathBuf>> {
    let (Some(parent), Some(stem)) = (source.parent(), source.file_stem()) else {
        return Ok(None);
    };

    let mut filename = stem.to_os_string();
    filename.push(".png");
    let override_path = parent.join(subdir).join(filename);
    if !override_path.is_file() {
        return Ok(None);
    }

    let dest = dest_dir.join(dest_name);
    fs::copy(&override_path, &dest).map_err(|e| ArtworkError::Io {
        path: dest.clone(),
        source: e,
    })?;
    debug!(path = %override_path.display(), "using local artwork override");
    Ok(Some(dest))
}
