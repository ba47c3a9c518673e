//! File-type detection from leading magic bytes.
//!
//! Input arrives as raw bytes (often from stdin) with no trustworthy name, so
//! the type is read from the signature. Pure byte inspection, no I/O.

use std::fmt;
use std::path::Path;

/// A document type the pipeline can convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Pdf,
    Png,
    Jpeg,
    Bmp,
    Gif,
}

impl FileType {
    /// Canonical extension, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            FileType::Pdf => ".pdf",
            FileType::Png => ".png",
            FileType::Jpeg => ".jpg",
            FileType::Bmp => ".bmp",
            FileType::Gif => ".gif",
        }
    }

    /// Media type used in data URIs.
    pub fn mime_type(self) -> &'static str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Png => "image/png",
            FileType::Jpeg => "image/jpeg",
            FileType::Bmp => "image/bmp",
            FileType::Gif => "image/gif",
        }
    }

    /// Whether the type is a single raster image rather than a paged document.
    pub fn is_image(self) -> bool {
        !matches!(self, FileType::Pdf)
    }

    /// Map an extension (with or without the dot, any case) to a type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileType::Pdf),
            "png" => Some(FileType::Png),
            "jpg" | "jpeg" => Some(FileType::Jpeg),
            "bmp" => Some(FileType::Bmp),
            "gif" => Some(FileType::Gif),
            _ => None,
        }
    }

    /// Type implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

const PDF_MAGIC: &[u8] = b"%PDF";
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const BMP_MAGIC: &[u8] = b"BM";
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";

/// Detect the file type from the buffer's leading bytes.
///
/// Returns `None` for an empty buffer or an unknown signature. JPEG matches
/// on `FF D8 FF` regardless of the marker byte that follows (`E0`, `DB`,
/// `E1`, …).
pub fn detect_file_type(data: &[u8]) -> Option<FileType> {
    if data.is_empty() {
        return None;
    }
    if data.starts_with(PDF_MAGIC) {
        Some(FileType::Pdf)
    } else if data.starts_with(PNG_MAGIC) {
        Some(FileType::Png)
    } else if data.starts_with(JPEG_MAGIC) {
        Some(FileType::Jpeg)
    } else if data.starts_with(BMP_MAGIC) {
        Some(FileType::Bmp)
    } else if data.starts_with(GIF87_MAGIC) || data.starts_with(GIF89_MAGIC) {
        Some(FileType::Gif)
    } else {
        None
    }
}
