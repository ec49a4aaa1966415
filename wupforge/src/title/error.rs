//! Error types for title classification.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for title operations.
pub type TitleResult<T> = Result<T, TitleError>;

/// Errors that can occur while classifying a disc image.
#[derive(Debug)]
pub enum TitleError {
    /// Failed to read the disc image header.
    ReadFailed { path: PathBuf, source: io::Error },

    /// The file is too small to hold a disc header.
    TruncatedHeader { path: PathBuf },

    /// A header string field has no terminator inside the probed region.
    UnterminatedString { offset: usize },

    /// The header matched no recognized container or game type.
    UnsupportedFormat { game_type: u64 },

    /// The container or requested feature is recognized but not buildable
    /// yet. Semantically "known, not yet supported" - distinct from
    /// [`TitleError::UnsupportedFormat`].
    FeatureNotImplemented(&'static str),

    /// The title id does not decode to a printable ASCII short code.
    NonAsciiShortCode { title_id: u32 },
}

impl fmt::Display for TitleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleError::ReadFailed { path, source } => {
                write!(f, "failed to read header of {}: {}", path.display(), source)
            }
            TitleError::TruncatedHeader { path } => {
                write!(f, "{} is too small to hold a disc header", path.display())
            }
            TitleError::UnterminatedString { offset } => {
                write!(f, "unterminated header string at offset {:#x}", offset)
            }
            TitleError::UnsupportedFormat { game_type } => {
                write!(f, "unrecognized game type {:#x}", game_type)
            }
            TitleError::FeatureNotImplemented(what) => {
                write!(f, "{} not implemented", what)
            }
            TitleError::NonAsciiShortCode { title_id } => {
                write!(
                    f,
                    "title id {:#010x} does not decode to an ASCII short code",
                    title_id
                )
            }
        }
    }
}

impl std::error::Error for TitleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TitleError::ReadFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_display() {
        let err = TitleError::UnsupportedFormat { game_type: 0x1234 };
        assert_eq!(err.to_string(), "unrecognized game type 0x1234");
    }

    #[test]
    fn test_feature_not_implemented_display() {
        let err = TitleError::FeatureNotImplemented("WBFS scrubbed containers");
        assert_eq!(err.to_string(), "WBFS scrubbed containers not implemented");
    }
}
