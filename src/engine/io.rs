// src/engine/io.rs
//
// Source loading, ICC profile extraction, and output path management.

use crate::error::{ConvertError, Result};
use img_parts::{jpeg::Jpeg, png::Png, webp::WebP, ImageICC};
use memmap2::Mmap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Bytes of a source file, memory-mapped when the platform allows it.
#[derive(Debug)]
pub enum SourceBytes {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl SourceBytes {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SourceBytes::Mapped(mmap) => mmap.as_ref(),
            SourceBytes::Buffered(data) => data.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a source file, preferring a private read-only mapping over copying
/// the bytes onto the heap. Empty or unmappable files fall back to a
/// buffered read.
pub fn read_source(path: &Path) -> Result<SourceBytes> {
    let file =
        File::open(path).map_err(|e| ConvertError::file_read(path.display().to_string(), e))?;

    // Safety: the mapping is read-only and private to this conversion; the
    // file handle lives as long as the map.
    match unsafe { Mmap::map(&file) } {
        Ok(mmap) if !mmap.is_empty() => Ok(SourceBytes::Mapped(mmap)),
        _ => fs::read(path)
            .map(SourceBytes::Buffered)
            .map_err(|e| ConvertError::file_read(path.display().to_string(), e)),
    }
}

/// Extract an ICC profile from JPEG/PNG/WebP containers. Returns None for
/// other formats, absent profiles, and profiles that fail validation.
pub fn extract_icc_profile(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 12 {
        return None;
    }

    let icc = if data[0] == 0xFF && data[1] == 0xD8 {
        Jpeg::from_bytes(data.to_vec().into())
            .ok()?
            .icc_profile()
            .map(|icc| icc.to_vec())?
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Png::from_bytes(data.to_vec().into())
            .ok()?
            .icc_profile()
            .map(|icc| icc.to_vec())?
    } else if &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        WebP::from_bytes(data.to_vec().into())
            .ok()?
            .icc_profile()
            .map(|icc| icc.to_vec())?
    } else {
        return None;
    };

    if validate_icc_profile(&icc) {
        Some(icc)
    } else {
        None
    }
}

/// Sanity-check an ICC profile header: 128-byte minimum, and the size field
/// (bytes 0-3, big-endian) must match the data length.
pub(crate) fn validate_icc_profile(icc: &[u8]) -> bool {
    if icc.len() < 128 {
        return false;
    }
    let declared = u32::from_be_bytes([icc[0], icc[1], icc[2], icc[3]]) as usize;
    declared == icc.len()
}

/// Compute a collision-free output path: `stem.ext`, then `stem_1.ext`,
/// `stem_2.ext`, ... at the first free suffix. Deterministic and monotonic;
/// existing files are never reused or overwritten.
pub fn unique_output_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.{extension}"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{counter}.{extension}"));
        counter += 1;
    }
    candidate
}

/// Write the encoded bytes. A failed write may leave a partial file behind;
/// it is removed best-effort so later runs do not suffix-collide with
/// garbage.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Err(e) = fs::write(path, bytes) {
        let _ = fs::remove_file(path);
        return Err(ConvertError::file_write(path.display().to_string(), e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::encoder::{embed_icc_jpeg, encode_jpeg};
    use image::{DynamicImage, RgbImage};

    fn minimal_icc() -> Vec<u8> {
        let mut data = vec![0u8; 128];
        data[0..4].copy_from_slice(&128u32.to_be_bytes());
        data[4..8].copy_from_slice(b"ADBE");
        data[8] = 2;
        data[12..16].copy_from_slice(b"mntr");
        data[16..20].copy_from_slice(b"RGB ");
        data[20..24].copy_from_slice(b"XYZ ");
        data
    }

    fn minimal_jpeg() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3])));
        encode_jpeg(&img, 80, None).unwrap()
    }

    #[test]
    fn test_read_source_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"hello bytes").unwrap();
        let source = read_source(&path).unwrap();
        assert_eq!(source.as_bytes(), b"hello bytes");
        assert_eq!(source.len(), 11);
    }

    #[test]
    fn test_read_source_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        fs::write(&path, b"").unwrap();
        let source = read_source(&path).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn test_read_source_missing_file() {
        let err = read_source(Path::new("/nonexistent/nowhere.png")).unwrap_err();
        assert!(matches!(err, ConvertError::FileRead { .. }));
    }

    #[test]
    fn test_unique_output_path_prefers_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_output_path(dir.path(), "photo", "png");
        assert_eq!(path, dir.path().join("photo.png"));
    }

    #[test]
    fn test_unique_output_path_takes_lowest_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.png"), b"x").unwrap();
        assert_eq!(
            unique_output_path(dir.path(), "photo", "png"),
            dir.path().join("photo_1.png")
        );

        fs::write(dir.path().join("photo_1.png"), b"x").unwrap();
        fs::write(dir.path().join("photo_2.png"), b"x").unwrap();
        assert_eq!(
            unique_output_path(dir.path(), "photo", "png"),
            dir.path().join("photo_3.png")
        );
    }

    #[test]
    fn test_unique_output_path_fills_gaps() {
        // The lowest free suffix wins even when later ones are taken
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.png"), b"x").unwrap();
        fs::write(dir.path().join("photo_2.png"), b"x").unwrap();
        assert_eq!(
            unique_output_path(dir.path(), "photo", "png"),
            dir.path().join("photo_1.png")
        );
    }

    #[test]
    fn test_write_output_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_output(&path, b"payload").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_write_output_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.bin");
        let err = write_output(&path, b"payload").unwrap_err();
        assert!(matches!(err, ConvertError::FileWrite { .. }));
    }

    #[test]
    fn test_validate_icc_profile() {
        assert!(validate_icc_profile(&minimal_icc()));
        assert!(!validate_icc_profile(&[0u8; 64]));
        let mut wrong_size = minimal_icc();
        wrong_size[3] = 0xFF;
        assert!(!validate_icc_profile(&wrong_size));
    }

    #[test]
    fn test_extract_icc_absent() {
        assert_eq!(extract_icc_profile(&minimal_jpeg()), None);
        assert_eq!(extract_icc_profile(b"not an image"), None);
        assert_eq!(extract_icc_profile(&[]), None);
    }

    #[test]
    fn test_extract_icc_jpeg_roundtrip() {
        let icc = minimal_icc();
        let jpeg = embed_icc_jpeg(minimal_jpeg(), &icc).unwrap();
        assert_eq!(extract_icc_profile(&jpeg).as_deref(), Some(icc.as_slice()));
    }
}
