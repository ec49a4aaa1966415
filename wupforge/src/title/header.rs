//! Disc-image header sniffing and title construction.
//!
//! The factory reads a small probe from the start of the image, classifies
//! the container from its magic bytes, and dispatches on the 64-bit game-type
//! field to the matching [`TitleVariant`]. Recognized-but-unsupported
//! containers fail with [`TitleError::FeatureNotImplemented`]; an unknown
//! game type fails with [`TitleError::UnsupportedFormat`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{TitleError, TitleResult};
use super::{GamecubeOptions, Title, TitleOptions, TitleVariant, WiiRetailOptions};

/// Game-type constant identifying a Wii retail disc.
pub const WII_GAME_TYPE: u64 = 2_745_048_157;

/// Game-type constant identifying a GameCube retail disc.
pub const GAMECUBE_GAME_TYPE: u64 = 4_440_324_665_927_270_400;

/// Magic value of a raw DOL executable (homebrew) container.
const DOL_MAGIC: u32 = 65_536;

/// Offset of the 64-bit game-type discriminant in the header.
const GAME_TYPE_OFFSET: usize = 0x18;

/// Offset of the internal game name: 8 bytes past the game-type field.
const GAME_NAME_OFFSET: usize = GAME_TYPE_OFFSET + 8;

/// Bytes probed from the start of the image. Large enough to hold every
/// field the sniffer reads, including both NUL-terminated strings.
const HEADER_PROBE_LEN: usize = 0x100;

/// Classify a disc image and construct the matching [`Title`].
///
/// `second_disc` is retained verbatim on GameCube titles and ignored
/// otherwise; omitting it leaves the field absent, never defaulted.
///
/// # Errors
///
/// - [`TitleError::FeatureNotImplemented`] for recognized-but-unsupported
///   containers (DOL, WBFS, NKIT, NASOS) and for options naming an
///   unimplemented feature hook
/// - [`TitleError::UnsupportedFormat`] when the game-type field matches
///   neither platform constant
pub fn create_title(
    path: &Path,
    second_disc: Option<PathBuf>,
    options: &TitleOptions,
) -> TitleResult<Title> {
    let header = read_header_probe(path)?;
    if header.len() < 8 {
        return Err(TitleError::TruncatedHeader {
            path: path.to_path_buf(),
        });
    }

    let magic = &header[0..4];
    if u32::from_le_bytes([magic[0], magic[1], magic[2], magic[3]]) == DOL_MAGIC {
        return Err(TitleError::FeatureNotImplemented(
            "homebrew DOL executable images",
        ));
    }
    if magic == b"WBFS" {
        return Err(TitleError::FeatureNotImplemented("WBFS scrubbed containers"));
    }
    if &header[4..8] == b"NKIT" {
        return Err(TitleError::FeatureNotImplemented("NKIT compressed images"));
    }
    // NASOS images carry their data at a format-specific start offset
    // (0x1182800 for WII5, 0x1FB5000 for WII9).
    if magic == b"WII5" || magic == b"WII9" {
        return Err(TitleError::FeatureNotImplemented("NASOS scrubbed images"));
    }

    if header.len() < GAME_NAME_OFFSET + 1 {
        return Err(TitleError::TruncatedHeader {
            path: path.to_path_buf(),
        });
    }

    let title_id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let game_type = u64::from_le_bytes([
        header[GAME_TYPE_OFFSET],
        header[GAME_TYPE_OFFSET + 1],
        header[GAME_TYPE_OFFSET + 2],
        header[GAME_TYPE_OFFSET + 3],
        header[GAME_TYPE_OFFSET + 4],
        header[GAME_TYPE_OFFSET + 5],
        header[GAME_TYPE_OFFSET + 6],
        header[GAME_TYPE_OFFSET + 7],
    ]);

    let game_name = null_terminated_string(&header, GAME_NAME_OFFSET)?;
    // Independent second read of the header region as text. The disc code
    // starts back at offset 0; this is not the same field as the name.
    let full_game_id = null_terminated_string(&header, 0)?;

    debug!(
        path = %path.display(),
        title_id,
        game_type,
        game_name = %game_name,
        full_game_id = %full_game_id,
        "classified disc header"
    );

    let variant = match game_type {
        WII_GAME_TYPE => {
            reject_unimplemented_hooks(options)?;
            TitleVariant::WiiRetail(WiiRetailOptions {
                use_wiimmfi: options.use_wiimmfi,
            })
        }
        GAMECUBE_GAME_TYPE => {
            reject_unimplemented_hooks(options)?;
            TitleVariant::GamecubeRetail(GamecubeOptions {
                second_disc,
                force_43: options.force_43,
                custom_forwarder: options.custom_forwarder.clone(),
                disable_autoboot: options.disable_autoboot,
            })
        }
        other => return Err(TitleError::UnsupportedFormat { game_type: other }),
    };

    Ok(Title::new(
        path.to_path_buf(),
        title_id,
        game_name,
        full_game_id,
        variant,
    ))
}

/// Feature hooks that are declared on [`TitleOptions`] but have no working
/// implementation yet. They must fail construction, never silently no-op.
fn reject_unimplemented_hooks(options: &TitleOptions) -> TitleResult<()> {
    if options.video_mode.is_some() {
        return Err(TitleError::FeatureNotImplemented("video-mode remapping"));
    }
    if options.force_classic_controller {
        return Err(TitleError::FeatureNotImplemented("controller-type forcing"));
    }
    Ok(())
}

/// Read up to [`HEADER_PROBE_LEN`] bytes from the start of the image.
fn read_header_probe(path: &Path) -> TitleResult<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| TitleError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut buf = vec![0u8; HEADER_PROBE_LEN];
    let mut filled = 0;
    loop {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| TitleError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == buf.len() {
            break;
        }
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Extract a NUL-terminated ASCII string from `buf` starting at `offset`.
fn null_terminated_string(buf: &[u8], offset: usize) -> TitleResult<String> {
    let slice = buf
        .get(offset..)
        .ok_or(TitleError::UnterminatedString { offset })?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(TitleError::UnterminatedString { offset })?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}
