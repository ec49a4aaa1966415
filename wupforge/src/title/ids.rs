//! Identifier encodings shared by naming, artwork lookup and packaging.
//!
//! This module is the single source of truth for the two derived title-id
//! encodings and for the region-substituted artwork candidate ids. All other
//! modules go through these functions rather than re-deriving the strings.

/// Fallback regions probed after the disc's own region, in fixed order.
const FALLBACK_REGIONS: [char; 3] = ['E', 'P', 'J'];

/// Byte-swapped hexadecimal encoding of a title id.
///
/// The id is zero-padded to 8 uppercase hex digits, split into four 2-digit
/// groups, and the group order is reversed. This is a byte swap, not the
/// identity transform.
///
/// # Examples
///
/// ```
/// use wupforge::title::title_id_hex;
///
/// assert_eq!(title_id_hex(0x0700), "00070000");
/// ```
pub fn title_id_hex(title_id: u32) -> String {
    let padded = format!("{:0>8X}", title_id);
    let mut out = String::with_capacity(8);
    for i in (0..8).step_by(2).rev() {
        out.push_str(&padded[i..i + 2]);
    }
    out
}

/// Decode the 4 bytes encoded by [`title_id_hex`] as a printable ASCII short
/// code.
///
/// Returns `None` when any byte falls outside the printable ASCII range.
pub fn ascii_short_code(title_id: u32) -> Option<String> {
    let hex = title_id_hex(title_id);
    let mut bytes = Vec::with_capacity(4);
    for i in (0..8).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
        if !(0x20..=0x7e).contains(&byte) {
            return None;
        }
        bytes.push(byte);
    }
    String::from_utf8(bytes).ok()
}

/// Region-substitution candidates for artwork lookup.
///
/// The candidate order is the disc's own region character followed by the
/// fixed fallbacks, with no de-duplication. Disc codes keep their 2-character
/// version suffix when `keep_version_suffix` is set; channel-style ids drop
/// it. Ids too short to substitute yield no candidates.
pub fn image_id_candidates(game_id: &str, keep_version_suffix: bool) -> Vec<String> {
    let required = if keep_version_suffix { 6 } else { 4 };
    let bytes = game_id.as_bytes();
    if bytes.len() < required || !game_id.is_ascii() {
        return Vec::new();
    }

    let own_region = bytes[3] as char;
    let mut candidates = Vec::with_capacity(4);
    for region in std::iter::once(own_region).chain(FALLBACK_REGIONS) {
        let mut id = String::with_capacity(required);
        id.push_str(&game_id[..3]);
        id.push(region);
        if keep_version_suffix {
            id.push_str(&game_id[4..6]);
        }
        candidates.push(id);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    // Regression vector: pad to "00000700", group, reverse, concatenate.
    #[test]
    fn test_title_id_hex_byte_swap() {
        assert_eq!(title_id_hex(0x0700), "00070000");
    }

    #[test]
    fn test_title_id_hex_full_width() {
        assert_eq!(title_id_hex(0x454C4147), "47414C45");
    }

    #[test]
    fn test_title_id_hex_zero() {
        assert_eq!(title_id_hex(0), "00000000");
    }

    #[test]
    fn test_ascii_short_code_round_trips_disc_code() {
        // "GALE" read little-endian from the header start.
        assert_eq!(ascii_short_code(0x454C4147).as_deref(), Some("GALE"));
    }

    #[test]
    fn test_ascii_short_code_rejects_unprintable() {
        assert_eq!(ascii_short_code(0x0700), None);
    }

    #[test]
    fn test_image_id_candidates_order_and_count() {
        let ids = image_id_candidates("GALE01", true);
        assert_eq!(ids, vec!["GALE01", "GALE01", "GALP01", "GALJ01"]);
    }

    #[test]
    fn test_image_id_candidates_without_suffix() {
        let ids = image_id_candidates("WAAE", false);
        assert_eq!(ids, vec!["WAAE", "WAAE", "WAAP", "WAAJ"]);
    }

    #[test]
    fn test_image_id_candidates_short_id_yields_none() {
        assert!(image_id_candidates("GAL", true).is_empty());
        assert!(image_id_candidates("GALE0", true).is_empty());
    }
}
