//! Variant-specific disc normalization.
//!
//! Each buildable variant turns its source material into one normalized disc
//! image inside the build's private work tree. The channel-style and
//! homebrew variants define identity rules only; normalizing them fails with
//! `FeatureNotImplemented` rather than producing a partial bundle.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::fsutil;
use crate::title::{GamecubeOptions, Title, TitleError, TitleVariant, WiiRetailOptions};
use crate::toolkit::{DiscToolkit, ToolSet};

use super::BuildError;

/// Filename of the normalized disc image inside the work tree.
const NORMALIZED_IMAGE: &str = "game.iso";

/// Catalog stub forcing the locked aspect ratio with autoboot.
const STUB_FORCE_43: &str = "FIX94_nintendont_force43_autoboot.dol";

/// Catalog stub that forwards into the loader menu without autobooting.
const STUB_FORWARDER: &str = "FIX94_nintendont_forwarder.dol";

/// Default autoboot catalog stub.
const STUB_DEFAULT_AUTOBOOT: &str = "FIX94_nintendont_default_autoboot.dol";

/// Produce the normalized disc image for `title` inside `work_dir`.
pub(crate) fn prepare_iso(
    title: &Title,
    tools: &ToolSet,
    work_dir: &Path,
) -> Result<PathBuf, BuildError> {
    match title.variant() {
        TitleVariant::WiiRetail(opts) => prepare_wii(title, opts, tools, work_dir),
        TitleVariant::GamecubeRetail(opts) => prepare_gamecube(title, opts, tools, work_dir),
        TitleVariant::WiiWare => Err(BuildError::Title(TitleError::FeatureNotImplemented(
            "building channel-style titles",
        ))),
        TitleVariant::WiiHomebrew => Err(BuildError::Title(TitleError::FeatureNotImplemented(
            "building homebrew titles",
        ))),
    }
}

/// Wii retail: extract the disc filesystem and rebuild it as one normalized
/// image, optionally tagged for the alternate online-service endpoint.
fn prepare_wii(
    title: &Title,
    opts: &WiiRetailOptions,
    tools: &ToolSet,
    work_dir: &Path,
) -> Result<PathBuf, BuildError> {
    info!(source = %title.source().display(), "extracting disc for normalization");
    let extract_dir = tempfile::Builder::new()
        .prefix("extract_")
        .tempdir_in(work_dir)
        .map_err(|e| BuildError::Io {
            path: work_dir.to_path_buf(),
            source: e,
        })?;

    let toolkit = DiscToolkit::new(tools);
    toolkit.extract_image(title.source(), extract_dir.path())?;

    let dest = work_dir.join(NORMALIZED_IMAGE);
    let image = toolkit.rebuild_image(extract_dir.path(), &dest, opts.use_wiimmfi)?;
    Ok(image)
}

/// GameCube retail: populate the loader skeleton with a stub and the disc
/// image(s), then rebuild the tree as one normalized image.
fn prepare_gamecube(
    title: &Title,
    opts: &GamecubeOptions,
    tools: &ToolSet,
    work_dir: &Path,
) -> Result<PathBuf, BuildError> {
    let stage_dir = tempfile::Builder::new()
        .prefix("skeleton_")
        .tempdir_in(work_dir)
        .map_err(|e| BuildError::Io {
            path: work_dir.to_path_buf(),
            source: e,
        })?;

    fsutil::copy_dir_all(&tools.skeleton_dir(), stage_dir.path()).map_err(|e| BuildError::Io {
        path: stage_dir.path().to_path_buf(),
        source: e,
    })?;

    let main_dol = stage_dir.path().join("sys").join("main.dol");
    let stub = select_stub(opts, tools);
    info!(stub = %stub.display(), "installing loader stub");
    fs::copy(&stub, &main_dol).map_err(|e| BuildError::Io {
        path: main_dol.clone(),
        source: e,
    })?;

    let game_dest = stage_dir.path().join("files").join("game.iso");
    fs::copy(title.source(), &game_dest).map_err(|e| BuildError::Io {
        path: game_dest,
        source: e,
    })?;
    if let Some(second) = &opts.second_disc {
        let disc2_dest = stage_dir.path().join("files").join("disc2.iso");
        fs::copy(second, &disc2_dest).map_err(|e| BuildError::Io {
            path: disc2_dest,
            source: e,
        })?;
    }

    let dest = work_dir.join(NORMALIZED_IMAGE);
    let image = DiscToolkit::new(tools).rebuild_image(stage_dir.path(), &dest, false)?;
    Ok(image)
}

/// Loader stub precedence: a caller-supplied stub is copied verbatim and
/// bypasses the catalog; the catalog stubs follow in fixed order.
fn select_stub(opts: &GamecubeOptions, tools: &ToolSet) -> PathBuf {
    if let Some(custom) = &opts.custom_forwarder {
        return custom.clone();
    }
    let catalog = tools.stub_catalog_dir();
    if opts.force_43 {
        catalog.join(STUB_FORCE_43)
    } else if opts.disable_autoboot {
        catalog.join(STUB_FORWARDER)
    } else {
        catalog.join(STUB_DEFAULT_AUTOBOOT)
    }
}
