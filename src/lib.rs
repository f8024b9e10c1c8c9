// src/lib.rs
//
// pixport: a batch raster-image conversion engine.
//
// Design goals:
// - One hard-gated pipeline per file: validate, decode, normalize
//   transparency, resize, orient, encode, write
// - A static capability table decides what each output format supports
// - Per-file failures are records, not aborts; a batch always runs to the
//   end of its file list
// - The worker owns no presentation: it publishes plain events over a
//   channel and any shell can subscribe

pub mod classify;
pub mod engine;
pub mod error;
pub mod formats;
pub mod logging;
pub mod worker;

pub use engine::{
    convert, ConversionResult, ConversionSettings, Failure, ResizeTarget, DEFAULT_QUALITY,
};
pub use error::{ConvertError, ErrorKind, Result};
pub use formats::{lookup, CapabilityEntry, CompressionHint, FormatCaps, OutputFormat};
pub use worker::{
    spawn_batch, BatchEvent, BatchHandle, BatchReport, CancelToken, WorkerConfig,
};

use image::ImageReader;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

/// Image metadata read from the header, without decoding pixels.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Detected format name (lowercase), when recognized.
    pub format: Option<String>,
}

fn read_metadata<R: BufRead + Seek>(reader: R) -> Result<ImageMetadata> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{f:?}").to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Inspect image metadata from in-memory bytes. Header-only, no pixel
/// decode.
pub fn inspect(data: &[u8]) -> Result<ImageMetadata> {
    read_metadata(Cursor::new(data))
}

/// Inspect image metadata from a file path. Header-only, no pixel decode.
pub fn inspect_file(path: &Path) -> Result<ImageMetadata> {
    let file = std::fs::File::open(path)
        .map_err(|e| ConvertError::file_read(path.display().to_string(), e))?;
    read_metadata(BufReader::new(file))
}

/// Library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Extensions accepted as conversion input.
pub fn supported_input_formats() -> Vec<&'static str> {
    formats::SUPPORTED_INPUT_EXTENSIONS.to_vec()
}

/// Format names accepted by the capability table.
pub fn supported_output_formats() -> Vec<&'static str> {
    vec!["png", "jpg", "jpeg", "webp", "tiff", "bmp", "gif", "ico"]
}
