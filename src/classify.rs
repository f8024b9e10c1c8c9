// src/classify.rs
//
// File classification pre-filter: "is this path plausibly an image file?"
// Extension check plus best-effort MIME lookup. The pipeline still performs
// its own authoritative extension check before decoding.

use crate::formats;
use std::path::{Path, PathBuf};

/// MIME types accepted as image input.
static IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
    "image/avif",
    "image/x-icon",
    "image/x-portable-pixmap",
    "image/x-portable-graymap",
    "image/x-portable-bitmap",
];

static MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("ico", "image/x-icon"),
    ("ppm", "image/x-portable-pixmap"),
    ("pgm", "image/x-portable-graymap"),
    ("pbm", "image/x-portable-bitmap"),
];

/// Best-effort MIME type from the file extension.
pub fn mime_type(path: &Path) -> Option<&'static str> {
    let extension = formats::extension_of(path)?;
    MIME_BY_EXTENSION
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// True when the path plausibly names an image file.
/// The extension must be in the supported set; a known MIME type confirms,
/// an unknown one falls back to the extension verdict.
pub fn is_image_file(path: &Path) -> bool {
    let Some(extension) = formats::extension_of(path) else {
        return false;
    };
    if !formats::is_supported_input_extension(&extension) {
        return false;
    }
    match mime_type(path) {
        Some(mime) => IMAGE_MIME_TYPES.contains(&mime),
        None => true,
    }
}

/// Keep only the entries that exist on disk and classify as images.
pub fn filter_image_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| path.is_file() && is_image_file(path))
        .cloned()
        .collect()
}

/// Human-readable file size, used by shells when listing selected files.
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
