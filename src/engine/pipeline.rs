// src/engine/pipeline.rs
//
// The conversion pipeline: one invocation per source file, every step a
// hard gate. Settings and results are plain serializable records; the
// decoded raster lives only inside the call.

use crate::engine::{decoder, encoder, io, orient, resize, transparency};
use crate::error::{ConvertError, ErrorKind, Result};
use crate::formats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upper bound for each resize target axis.
pub const MAX_TARGET_SIDE: u32 = 65_535;

/// Resize bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

/// Per-batch conversion settings, immutable for the duration of a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Requested output format name ("png", "jpeg", ...); resolved through
    /// the capability table, so unknown names fail fast.
    pub output_format: String,
    /// Destination directory; the source file's directory when absent.
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
    /// Enable best-fit resizing.
    #[serde(default)]
    pub resize: bool,
    /// Bounding box for the resize; ignored unless `resize` is set.
    #[serde(default)]
    pub resize_target: Option<ResizeTarget>,
    /// Encoder quality 1-100 for formats that take one; defaults to 95.
    #[serde(default)]
    pub quality: Option<u8>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            output_format: "png".to_string(),
            output_folder: None,
            resize: false,
            resize_target: None,
            quality: None,
        }
    }
}

impl ConversionSettings {
    pub fn new(output_format: impl Into<String>) -> Self {
        Self {
            output_format: output_format.into(),
            ..Self::default()
        }
    }
}

/// Why a file failed, as carried in results and batch reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one file's conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub input_path: PathBuf,
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub failure: Option<Failure>,
}

impl ConversionResult {
    fn ok(input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            input_path,
            success: true,
            output_path: Some(output_path),
            failure: None,
        }
    }

    fn failed(input_path: PathBuf, err: &ConvertError) -> Self {
        Self {
            input_path,
            success: false,
            output_path: None,
            failure: Some(Failure {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

/// Convert one file. Never panics across this boundary and never aborts a
/// batch: every failure comes back as a per-file record.
pub fn convert(input_path: &Path, settings: &ConversionSettings) -> ConversionResult {
    match run_pipeline(input_path, settings) {
        Ok(output_path) => {
            info!(
                input = %input_path.display(),
                output = %output_path.display(),
                "converted"
            );
            ConversionResult::ok(input_path.to_path_buf(), output_path)
        }
        Err(err) => {
            warn!(
                input = %input_path.display(),
                kind = err.kind().as_str(),
                error = %err,
                "conversion failed"
            );
            ConversionResult::failed(input_path.to_path_buf(), &err)
        }
    }
}

fn run_pipeline(input_path: &Path, settings: &ConversionSettings) -> Result<PathBuf> {
    // 1. Existence & input format gate
    if !input_path.exists() {
        return Err(ConvertError::input_not_found(
            input_path.display().to_string(),
        ));
    }
    let extension = formats::extension_of(input_path).unwrap_or_default();
    if !formats::is_supported_input_extension(&extension) {
        return Err(ConvertError::unsupported_input(extension));
    }

    // 2. Output format & settings gate (before any filesystem writes)
    let entry = formats::lookup(&settings.output_format)
        .ok_or_else(|| ConvertError::unsupported_output(settings.output_format.clone()))?;
    let target = validated_resize_target(settings)?;

    // 3. Output path
    let output_dir = match &settings.output_folder {
        Some(dir) => dir.clone(),
        None => input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| ConvertError::create_dir(output_dir.display().to_string(), e))?;
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("converted");
    let output_path = io::unique_output_path(&output_dir, stem, entry.format.extension());

    // 4. Read & decode
    let source = io::read_source(input_path)?;
    let bytes = source.as_bytes();
    let orientation = decoder::detect_exif_orientation(bytes);
    let icc = io::extract_icc_profile(bytes);
    let mut img = decoder::decode_image(bytes)?;
    debug!(
        width = img.width(),
        height = img.height(),
        orientation,
        icc = icc.is_some(),
        "decoded"
    );

    // 5. Transparency normalization
    if !entry.supports_transparency() && transparency::has_alpha(&img) {
        img = transparency::flatten_to_white(img);
    }

    // 6. Best-fit resize
    if let Some(target) = target {
        let (width, height) =
            resize::calc_fit_dimensions(img.width(), img.height(), target.width, target.height);
        if (width, height) != (img.width(), img.height()) {
            img = resize::fast_resize(img, width, height)?;
        }
    }

    // 7. Orientation correction
    if let Some(orientation) = orientation {
        img = orient::normalize_orientation(img, orientation);
    }

    // 8. Encode & write
    let encoded = encoder::encode(&img, entry, settings.quality, icc.as_deref())?;
    io::write_output(&output_path, &encoded)?;

    Ok(output_path)
}

fn validated_resize_target(settings: &ConversionSettings) -> Result<Option<ResizeTarget>> {
    if !settings.resize {
        return Ok(None);
    }
    let Some(target) = settings.resize_target else {
        return Ok(None);
    };
    if target.width == 0
        || target.height == 0
        || target.width > MAX_TARGET_SIDE
        || target.height > MAX_TARGET_SIDE
    {
        return Err(ConvertError::invalid_resize_target(
            target.width,
            target.height,
        ));
    }
    Ok(Some(target))
}
