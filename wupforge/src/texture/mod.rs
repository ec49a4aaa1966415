//! Texture conversion to the platform's native uncompressed TGA format.

use std::fmt;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Result type for texture operations.
pub type TextureResult<T> = Result<T, TextureError>;

/// Errors that can occur during texture conversion.
#[derive(Debug)]
pub enum TextureError {
    /// The source image could not be opened or decoded.
    Decode { path: PathBuf, reason: String },

    /// The converted image could not be encoded or written.
    Encode { path: PathBuf, reason: String },

    /// The requested bit depth has no conversion. 8-bit is declared by the
    /// contract but unimplemented.
    UnsupportedDepth(u8),
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Decode { path, reason } => {
                write!(f, "failed to decode {}: {}", path.display(), reason)
            }
            TextureError::Encode { path, reason } => {
                write!(f, "failed to encode {}: {}", path.display(), reason)
            }
            TextureError::UnsupportedDepth(bits) => {
                write!(f, "no conversion to {}bpp", bits)
            }
        }
    }
}

impl std::error::Error for TextureError {}

/// Convert a source image to an uncompressed TGA of the given geometry.
///
/// The source is resampled to exactly `width`x`height` with a Lanczos
/// filter, converted to the channel layout implied by `bits_per_pixel`
/// (24 = RGB, 32 = RGBA), and written to `output_dir/output_filename`.
///
/// # Errors
///
/// [`TextureError::UnsupportedDepth`] for any depth other than 24 or 32;
/// decode/encode failures otherwise.
pub fn convert(
    src: &Path,
    output_filename: &str,
    output_dir: &Path,
    width: u32,
    height: u32,
    bits_per_pixel: u8,
) -> TextureResult<PathBuf> {
    let source = image::open(src).map_err(|e| TextureError::Decode {
        path: src.to_path_buf(),
        reason: e.to_string(),
    })?;

    let resized = source.resize_exact(width, height, FilterType::Lanczos3);
    let converted = match bits_per_pixel {
        24 => DynamicImage::ImageRgb8(resized.to_rgb8()),
        32 => DynamicImage::ImageRgba8(resized.to_rgba8()),
        other => return Err(TextureError::UnsupportedDepth(other)),
    };

    let output_path = output_dir.join(output_filename);
    converted
        .save_with_format(&output_path, ImageFormat::Tga)
        .map_err(|e| TextureError::Encode {
            path: output_path.clone(),
            reason: e.to_string(),
        })?;

    debug!(
        src = %src.display(),
        dest = %output_path.display(),
        width,
        height,
        bits_per_pixel,
        "converted texture"
    );
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_source_png(dir: &Path) -> PathBuf {
        let path = dir.join("source.png");
        let img = RgbaImage::from_pixel(16, 8, Rgba([200, 100, 50, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_convert_resizes_to_exact_geometry() {
        let temp = TempDir::new().unwrap();
        let src = write_source_png(temp.path());

        let out = convert(&src, "iconTex.tga", temp.path(), 128, 128, 32).unwrap();

        let converted = image::open(&out).unwrap();
        assert_eq!(converted.width(), 128);
        assert_eq!(converted.height(), 128);
    }

    #[test]
    fn test_convert_24bpp_drops_alpha() {
        let temp = TempDir::new().unwrap();
        let src = write_source_png(temp.path());

        let out = convert(&src, "bootTvTex.tga", temp.path(), 64, 32, 24).unwrap();

        let converted = image::open(&out).unwrap();
        assert_eq!(converted.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_convert_8bpp_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let src = write_source_png(temp.path());

        let result = convert(&src, "out.tga", temp.path(), 64, 64, 8);
        assert!(matches!(result, Err(TextureError::UnsupportedDepth(8))));
    }

    #[test]
    fn test_convert_missing_source_fails_decode() {
        let temp = TempDir::new().unwrap();
        let result = convert(
            Path::new("/nonexistent/icon.png"),
            "out.tga",
            temp.path(),
            64,
            64,
            32,
        );
        assert!(matches!(result, Err(TextureError::Decode { .. })));
    }
}
