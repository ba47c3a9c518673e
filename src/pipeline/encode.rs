//! Image encoding: page image file → base64 data URI.
//!
//! The bytes on disk go out unchanged. Whatever the rasteriser (or the user)
//! produced, PNG, JPEG, BMP or GIF, is tagged with the media type sniffed from
//! its signature so the provider decodes it correctly.

use crate::error::MarkPdfDownError;
use crate::pipeline::detect::detect_file_type;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// Media type used when the signature is not recognised.
const FALLBACK_MIME: &str = "image/png";

/// Read `path` fully and return `data:<mime>;base64,<payload>`.
///
/// A missing or unreadable file is an [`MarkPdfDownError::ImageEncoding`],
/// which the completion client does not retry.
pub async fn encode_image_file(path: &Path) -> Result<String, MarkPdfDownError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| MarkPdfDownError::ImageEncoding {
            path: path.to_path_buf(),
            source,
        })?;
    let uri = to_data_uri(&bytes);
    debug!("Encoded {} → {} bytes data URI", path.display(), uri.len());
    Ok(uri)
}

/// Wrap raw image bytes in a base64 data URI.
pub fn to_data_uri(bytes: &[u8]) -> String {
    let mime = detect_file_type(bytes)
        .filter(|t| t.is_image())
        .map(|t| t.mime_type())
        .unwrap_or(FALLBACK_MIME);
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn write_image(dir: &Path, name: &str, format: image::ImageFormat) -> std::path::PathBuf {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])));
        let path = dir.join(name);
        img.save_with_format(&path, format).unwrap();
        path
    }

    #[tokio::test]
    async fn png_file_becomes_png_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "p.png", image::ImageFormat::Png);
        let uri = encode_image_file(&path).await.unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.split_once(',').unwrap().1;
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, std::fs::read(&path).unwrap());
    }

    #[tokio::test]
    async fn jpeg_file_is_tagged_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "p.jpg", image::ImageFormat::Jpeg);
        let uri = encode_image_file(&path).await.unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"), "got: {}", &uri[..30]);
    }

    #[tokio::test]
    async fn missing_file_is_encoding_error() {
        let err = encode_image_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarkPdfDownError::ImageEncoding { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn unknown_bytes_fall_back_to_png() {
        assert!(to_data_uri(b"????").starts_with("data:image/png;base64,"));
        // A PDF is not an image media type.
        assert!(to_data_uri(b"%PDF-1.7").starts_with("data:image/png;base64,"));
    }
}
