//! Title model: one buildable unit per source game release.
//!
//! A [`Title`] is produced once by [`create_title`] from a disc image header
//! and is immutable afterwards. The variant tag fixes every platform-specific
//! decision the build pipeline has to make: artwork lookup ids, disc
//! normalization strategy, streaming-conversion patch flags, and the
//! second-screen manifest flag.

mod error;
mod header;
mod ids;

use std::path::{Path, PathBuf};

pub use error::{TitleError, TitleResult};
pub use header::{create_title, GAMECUBE_GAME_TYPE, WII_GAME_TYPE};
pub use ids::{image_id_candidates, title_id_hex};

/// One or two disc-image paths forming a single buildable input.
///
/// The second path is only ever present for multi-disc GameCube releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// Path to the primary disc image.
    pub primary: PathBuf,

    /// Path to the second disc, when the release ships on two.
    pub second_disc: Option<PathBuf>,
}

impl SourceImage {
    /// Create a single-disc input.
    pub fn single(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            second_disc: None,
        }
    }

    /// Create a two-disc input.
    pub fn pair(primary: impl Into<PathBuf>, second: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            second_disc: Some(second.into()),
        }
    }
}

/// Construction-time options applied by the factory to whichever variant the
/// header dispatches to. Options that do not apply to the detected variant
/// are ignored; options naming an unimplemented feature hook fail
/// construction with [`TitleError::FeatureNotImplemented`].
#[derive(Debug, Clone, Default)]
pub struct TitleOptions {
    /// Tag rebuilt Wii images for the alternate online-service endpoint.
    pub use_wiimmfi: bool,

    /// Force the aspect-ratio-locked autoboot loader stub (GameCube).
    pub force_43: bool,

    /// Use a caller-supplied loader stub verbatim, bypassing the stub
    /// catalog (GameCube).
    pub custom_forwarder: Option<PathBuf>,

    /// Select the forwarder stub that does not autoboot the disc (GameCube).
    pub disable_autoboot: bool,

    /// Requested video-mode remapping. Declared but unimplemented; any value
    /// fails construction.
    pub video_mode: Option<String>,

    /// Force classic-controller input. Declared but unimplemented; `true`
    /// fails construction.
    pub force_classic_controller: bool,
}

/// Wii-retail build options retained on the variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WiiRetailOptions {
    /// Tag the rebuilt image for the alternate online-service endpoint.
    pub use_wiimmfi: bool,
}

/// GameCube-retail build options retained on the variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamecubeOptions {
    /// Second disc of a two-disc release, kept verbatim as supplied.
    pub second_disc: Option<PathBuf>,

    /// Use the aspect-ratio-locked autoboot stub.
    pub force_43: bool,

    /// Caller-supplied stub copied verbatim; takes precedence over the
    /// catalog stubs.
    pub custom_forwarder: Option<PathBuf>,

    /// Use the non-autobooting forwarder stub.
    pub disable_autoboot: bool,
}

/// Platform/category tag fixing which algorithms apply to a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleVariant {
    /// Wii retail disc image.
    WiiRetail(WiiRetailOptions),

    /// GameCube retail disc image, optionally spanning two discs.
    GamecubeRetail(GamecubeOptions),

    /// Channel-style (WiiWare) title. Identity rules only; the build
    /// pipeline for this variant is intentionally unrealized.
    WiiWare,

    /// Native homebrew application. Identity rules only; the build pipeline
    /// for this variant is intentionally unrealized.
    WiiHomebrew,
}

/// The manifest value declaring second-screen companion-display support.
pub const DRC_USE_ENABLED: u32 = 65_537;

/// The manifest value for titles without second-screen support.
pub const DRC_USE_DISABLED: u32 = 1;

/// One buildable unit representing a single source game release.
///
/// Identity fields are read once from the disc header and never change.
#[derive(Debug, Clone)]
pub struct Title {
    source: PathBuf,
    title_id: u32,
    game_name: String,
    full_game_id: String,
    variant: TitleVariant,
}

impl Title {
    pub(crate) fn new(
        source: PathBuf,
        title_id: u32,
        game_name: String,
        full_game_id: String,
        variant: TitleVariant,
    ) -> Self {
        Self {
            source,
            title_id,
            game_name,
            full_game_id,
            variant,
        }
    }

    /// Path to the primary disc image this title was classified from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Numeric release identifier read from the header start.
    pub fn title_id(&self) -> u32 {
        self.title_id
    }

    /// Human-readable title read from the header.
    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    /// Textual disc code read from the header start.
    pub fn full_game_id(&self) -> &str {
        &self.full_game_id
    }

    /// The platform/category tag.
    pub fn variant(&self) -> &TitleVariant {
        &self.variant
    }

    /// Byte-swapped hexadecimal encoding of the title id.
    pub fn title_id_hex(&self) -> String {
        ids::title_id_hex(self.title_id)
    }

    /// Four-letter short code derived from the title id, or the fixed
    /// `"BOOT"` literal for the homebrew variant.
    ///
    /// # Errors
    ///
    /// Fails when the derived bytes are not printable ASCII.
    pub fn title_id_text(&self) -> TitleResult<String> {
        match self.variant {
            TitleVariant::WiiHomebrew => Ok("BOOT".to_string()),
            _ => ids::ascii_short_code(self.title_id).ok_or(TitleError::NonAsciiShortCode {
                title_id: self.title_id,
            }),
        }
    }

    /// Region-substitution candidates for remote artwork lookup, in probe
    /// order: the disc's own region first, then the fixed fallbacks E, P, J.
    ///
    /// Disc-based variants yield exactly four candidates (duplicates kept);
    /// the homebrew variant has no artwork lookup and yields none.
    pub fn possible_image_ids(&self) -> Vec<String> {
        match self.variant {
            TitleVariant::WiiRetail(_) | TitleVariant::GamecubeRetail(_) => {
                ids::image_id_candidates(&self.full_game_id, true)
            }
            TitleVariant::WiiWare => ids::image_id_candidates(&self.full_game_id, false),
            TitleVariant::WiiHomebrew => Vec::new(),
        }
    }

    /// Path segment selecting this title's platform in the remote artwork
    /// repository.
    pub fn system_type(&self) -> &'static str {
        match self.variant {
            TitleVariant::WiiRetail(_) => "wii",
            TitleVariant::GamecubeRetail(_) => "gcn",
            TitleVariant::WiiWare => "wiiware",
            TitleVariant::WiiHomebrew => "dol",
        }
    }

    /// Patch flags for the disc-to-streaming-format conversion.
    pub fn nfs_patch_flags(&self) -> &'static [&'static str] {
        match self.variant {
            TitleVariant::GamecubeRetail(_) => &["-enc", "-homebrew", "-passthrough"],
            _ => &["-enc"],
        }
    }

    /// Second-screen manifest flag. On by default; un-forced Wii retail
    /// titles turn it off.
    pub fn drc_use(&self) -> u32 {
        match self.variant {
            TitleVariant::WiiRetail(_) => DRC_USE_DISABLED,
            _ => DRC_USE_ENABLED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wii_title() -> Title {
        Title::new(
            PathBuf::from("/isos/game.iso"),
            0x454C4147, // "GALE" little-endian
            "Example Game".to_string(),
            "GALE01".to_string(),
            TitleVariant::WiiRetail(WiiRetailOptions::default()),
        )
    }

    #[test]
    fn test_title_id_text_matches_game_id_prefix() {
        assert_eq!(wii_title().title_id_text().unwrap(), "GALE");
    }

    #[test]
    fn test_homebrew_title_id_text_is_fixed_literal() {
        let title = Title::new(
            PathBuf::from("/apps/boot.dol"),
            0x12345678,
            "N/A".to_string(),
            String::new(),
            TitleVariant::WiiHomebrew,
        );
        assert_eq!(title.title_id_text().unwrap(), "BOOT");
    }

    #[test]
    fn test_possible_image_ids_disc_variant() {
        let ids = wii_title().possible_image_ids();
        assert_eq!(ids, vec!["GALE01", "GALE01", "GALP01", "GALJ01"]);
    }

    #[test]
    fn test_possible_image_ids_no_dedup_when_own_region_is_fallback() {
        let title = Title::new(
            PathBuf::from("/isos/game.iso"),
            0x50414C47,
            "Example Game".to_string(),
            "GALP01".to_string(),
            TitleVariant::WiiRetail(WiiRetailOptions::default()),
        );
        let ids = title.possible_image_ids();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids, vec!["GALP01", "GALE01", "GALP01", "GALJ01"]);
    }

    #[test]
    fn test_possible_image_ids_wiiware_drops_suffix() {
        let title = Title::new(
            PathBuf::from("/isos/title.wad"),
            0x45414157,
            "Example Channel".to_string(),
            "WAAE".to_string(),
            TitleVariant::WiiWare,
        );
        assert_eq!(
            title.possible_image_ids(),
            vec!["WAAE", "WAAE", "WAAP", "WAAJ"]
        );
    }

    #[test]
    fn test_possible_image_ids_homebrew_is_empty() {
        let title = Title::new(
            PathBuf::from("/apps/boot.dol"),
            0,
            "N/A".to_string(),
            String::new(),
            TitleVariant::WiiHomebrew,
        );
        assert!(title.possible_image_ids().is_empty());
    }

    #[test]
    fn test_nfs_patch_flags_per_variant() {
        assert_eq!(wii_title().nfs_patch_flags(), &["-enc"]);

        let gc = Title::new(
            PathBuf::from("/isos/game.iso"),
            0x454C4147,
            "Example Game".to_string(),
            "GALE01".to_string(),
            TitleVariant::GamecubeRetail(GamecubeOptions::default()),
        );
        assert_eq!(gc.nfs_patch_flags(), &["-enc", "-homebrew", "-passthrough"]);
    }

    #[test]
    fn test_drc_use_per_variant() {
        assert_eq!(wii_title().drc_use(), DRC_USE_DISABLED);

        let gc = Title::new(
            PathBuf::from("/isos/game.iso"),
            0x454C4147,
            "Example Game".to_string(),
            "GALE01".to_string(),
            TitleVariant::GamecubeRetail(GamecubeOptions::default()),
        );
        assert_eq!(gc.drc_use(), DRC_USE_ENABLED);

        let ware = Title::new(
            PathBuf::from("/isos/title.wad"),
            0x45414157,
            "Example Channel".to_string(),
            "WAAE".to_string(),
            TitleVariant::WiiWare,
        );
        assert_eq!(ware.drc_use(), DRC_USE_ENABLED);
    }

    #[test]
    fn test_system_type_per_variant() {
        assert_eq!(wii_title().system_type(), "wii");
    }
}
