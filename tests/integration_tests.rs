// tests/integration_tests.rs
//
// End-to-end pipeline coverage: the format matrix, resize behavior,
// transparency handling, and output-path collision policy.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use pixport::{convert, ConversionSettings, ErrorKind, ResizeTarget};
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn rgb_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 16 % 256) as u8, (y * 16 % 256) as u8, 128])
    }))
}

fn write_image(dir: &Path, name: &str, img: &DynamicImage, format: ImageFormat) -> PathBuf {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, &buf).unwrap();
    path
}

fn write_rgba_png(dir: &Path, name: &str, width: u32, height: u32, alpha: u8) -> PathBuf {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 40, 40, alpha]),
    ));
    write_image(dir, name, &img, ImageFormat::Png)
}

fn settings_for(format: &str, output_folder: &Path) -> ConversionSettings {
    let mut settings = ConversionSettings::new(format);
    settings.output_folder = Some(output_folder.to_path_buf());
    settings
}

#[test]
fn test_format_matrix_round_trips() {
    let inputs: &[(&str, ImageFormat)] = &[
        ("sample.png", ImageFormat::Png),
        ("sample.jpg", ImageFormat::Jpeg),
        ("sample.webp", ImageFormat::WebP),
        ("sample.bmp", ImageFormat::Bmp),
        ("sample.gif", ImageFormat::Gif),
        ("sample.tiff", ImageFormat::Tiff),
        ("sample.ico", ImageFormat::Ico),
    ];
    let outputs: &[(&str, ImageFormat)] = &[
        ("png", ImageFormat::Png),
        ("jpeg", ImageFormat::Jpeg),
        ("webp", ImageFormat::WebP),
        ("tiff", ImageFormat::Tiff),
        ("bmp", ImageFormat::Bmp),
        ("gif", ImageFormat::Gif),
        ("ico", ImageFormat::Ico),
    ];

    let dir = tempfile::tempdir().unwrap();
    let img = rgb_image(16, 16);

    for (input_name, input_format) in inputs {
        let input = write_image(dir.path(), input_name, &img, *input_format);
        for (output_name, expected_format) in outputs {
            let out_dir = dir.path().join(format!("out_{output_name}"));
            let result = convert(&input, &settings_for(output_name, &out_dir));
            assert!(
                result.success,
                "{input_name} -> {output_name}: {:?}",
                result.failure
            );

            // Re-decoded output must report the requested format
            let bytes = std::fs::read(result.output_path.unwrap()).unwrap();
            assert_eq!(
                image::guess_format(&bytes).unwrap(),
                *expected_format,
                "{input_name} -> {output_name}"
            );
        }
    }
}

#[test]
fn test_pnm_input_converts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "sample.ppm", &rgb_image(8, 8), ImageFormat::Pnm);
    let result = convert(&input, &ConversionSettings::new("png"));
    assert!(result.success, "{:?}", result.failure);
}

#[test]
fn test_resize_matching_aspect_fills_box() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "wide.png", &rgb_image(1600, 1200), ImageFormat::Png);
    let mut settings = ConversionSettings::new("png");
    settings.resize = true;
    settings.resize_target = Some(ResizeTarget {
        width: 800,
        height: 600,
    });

    let result = convert(&input, &settings);
    let output = image::open(result.output_path.unwrap()).unwrap();
    assert_eq!(output.dimensions(), (800, 600));
}

#[test]
fn test_resize_width_constrained() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "wide.png", &rgb_image(1600, 800), ImageFormat::Png);
    let mut settings = ConversionSettings::new("png");
    settings.resize = true;
    settings.resize_target = Some(ResizeTarget {
        width: 800,
        height: 800,
    });

    let result = convert(&input, &settings);
    let output = image::open(result.output_path.unwrap()).unwrap();
    assert_eq!(output.dimensions(), (800, 400));
}

#[test]
fn test_resize_can_upscale() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "small.png", &rgb_image(100, 50), ImageFormat::Png);
    let mut settings = ConversionSettings::new("png");
    settings.resize = true;
    settings.resize_target = Some(ResizeTarget {
        width: 400,
        height: 400,
    });

    let result = convert(&input, &settings);
    let output = image::open(result.output_path.unwrap()).unwrap();
    assert_eq!(output.dimensions(), (400, 200));
}

#[test]
fn test_rgba_to_jpeg_flattens_to_white() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_rgba_png(dir.path(), "transparent.png", 8, 8, 0);

    let result = convert(&input, &ConversionSettings::new("jpeg"));
    assert!(result.success, "{:?}", result.failure);

    let output = image::open(result.output_path.unwrap()).unwrap();
    assert!(!output.color().has_alpha());
    // Fully transparent pixels become white (JPEG is lossy; allow wiggle)
    let pixel = output.to_rgb8().get_pixel(4, 4).0;
    for channel in pixel {
        assert!(channel >= 250, "expected near-white, got {pixel:?}");
    }
}

#[test]
fn test_rgba_to_png_preserves_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_rgba_png(dir.path(), "transparent.png", 8, 8, 0);

    let result = convert(&input, &ConversionSettings::new("png"));
    let output = image::open(result.output_path.unwrap()).unwrap();
    assert!(output.color().has_alpha());
    assert_eq!(output.to_rgba8().get_pixel(4, 4).0[3], 0);
}

#[test]
fn test_rgba_to_webp_preserves_alpha() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_rgba_png(dir.path(), "transparent.png", 16, 16, 0);

    let result = convert(&input, &ConversionSettings::new("webp"));
    let output = image::open(result.output_path.unwrap()).unwrap();
    assert!(output.color().has_alpha());
}

#[test]
fn test_collision_suffixes_never_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "photo.png", &rgb_image(4, 4), ImageFormat::Png);
    let out_dir = dir.path().join("out");
    let settings = settings_for("png", &out_dir);

    // First conversion claims photo.png, the next three get _1.._3
    let mut outputs = Vec::new();
    for _ in 0..4 {
        let result = convert(&input, &settings);
        assert!(result.success);
        outputs.push(result.output_path.unwrap());
    }

    assert_eq!(outputs[0], out_dir.join("photo.png"));
    assert_eq!(outputs[1], out_dir.join("photo_1.png"));
    assert_eq!(outputs[2], out_dir.join("photo_2.png"));
    assert_eq!(outputs[3], out_dir.join("photo_3.png"));
    for path in &outputs {
        assert!(path.exists());
    }
}

#[test]
fn test_unsupported_output_format_is_clean_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "photo.png", &rgb_image(4, 4), ImageFormat::Png);
    let out_dir = dir.path().join("untouched");
    let result = convert(&input, &settings_for("xyz", &out_dir));

    assert!(!result.success);
    assert_eq!(
        result.failure.unwrap().kind,
        ErrorKind::UnsupportedOutputFormat
    );
    assert!(!out_dir.exists());
}

#[test]
fn test_quality_default_and_custom_differ() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "photo.png", &rgb_image(128, 128), ImageFormat::Png);

    let default_result = convert(&input, &settings_for("jpeg", &dir.path().join("d")));
    let mut low = settings_for("jpeg", &dir.path().join("l"));
    low.quality = Some(20);
    let low_result = convert(&input, &low);

    let default_size = std::fs::metadata(default_result.output_path.unwrap())
        .unwrap()
        .len();
    let low_size = std::fs::metadata(low_result.output_path.unwrap())
        .unwrap()
        .len();
    assert!(low_size <= default_size);
}

#[test]
fn test_output_lands_next_to_input_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(dir.path(), "photo.png", &rgb_image(4, 4), ImageFormat::Png);
    let result = convert(&input, &ConversionSettings::new("bmp"));
    assert_eq!(result.output_path.unwrap(), dir.path().join("photo.bmp"));
}
