// tests/property_based.rs
//
// Property coverage for the best-fit math and the capability table.

use pixport::engine::{calc_fit_dimensions, unique_output_path};
use pixport::formats;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_fit_never_exceeds_box(
        src_w in 1u32..=4096,
        src_h in 1u32..=4096,
        target_w in 1u32..=4096,
        target_h in 1u32..=4096,
    ) {
        let (w, h) = calc_fit_dimensions(src_w, src_h, target_w, target_h);
        prop_assert!(w >= 1 && h >= 1);
        prop_assert!(w <= target_w);
        prop_assert!(h <= target_h);
    }

    #[test]
    fn prop_fit_touches_box_on_one_axis(
        src_w in 1u32..=4096,
        src_h in 1u32..=4096,
        target_w in 2u32..=4096,
        target_h in 2u32..=4096,
    ) {
        let (w, h) = calc_fit_dimensions(src_w, src_h, target_w, target_h);
        // One axis matches the box exactly, unless rounding clamped the
        // other axis up to the 1-pixel floor.
        prop_assert!(w == target_w || h == target_h || w == 1 || h == 1);
    }

    #[test]
    fn prop_fit_preserves_aspect_ratio(
        src_w in 16u32..=4096,
        src_h in 16u32..=4096,
        target_w in 16u32..=4096,
        target_h in 16u32..=4096,
    ) {
        let (w, h) = calc_fit_dimensions(src_w, src_h, target_w, target_h);
        // The 1-pixel floor distorts the ratio for degenerate outputs
        prop_assume!(w > 1 && h > 1);
        let src_ratio = src_w as f64 / src_h as f64;
        let out_ratio = w as f64 / h as f64;
        // Rounding each axis to a pixel bounds the ratio drift
        let tolerance = src_ratio * (1.0 / w as f64 + 1.0 / h as f64 + 0.01);
        prop_assert!(
            (src_ratio - out_ratio).abs() <= tolerance,
            "src {src_ratio}, out {out_ratio}, tol {tolerance}"
        );
    }

    #[test]
    fn prop_fit_is_identity_when_box_matches_source(
        src_w in 1u32..=4096,
        src_h in 1u32..=4096,
    ) {
        prop_assert_eq!(calc_fit_dimensions(src_w, src_h, src_w, src_h), (src_w, src_h));
    }

    #[test]
    fn prop_lookup_accepts_any_casing(name in "(png|jpg|jpeg|webp|tiff|bmp|gif|ico)") {
        let upper = name.to_uppercase();
        prop_assert!(formats::lookup(&name).is_some());
        prop_assert!(formats::lookup(&upper).is_some());
    }

    #[test]
    fn prop_lookup_rejects_unknown_names(name in "[a-z]{1,8}") {
        let known = [
            "png", "jpg", "jpeg", "webp", "tiff", "bmp", "gif", "ico",
        ];
        prop_assume!(!known.contains(&name.as_str()));
        prop_assert!(formats::lookup(&name).is_none());
    }
}

#[test]
fn unique_path_suffixes_are_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let mut seen = Vec::new();
    for expected in ["photo.png", "photo_1.png", "photo_2.png", "photo_3.png"] {
        let path = unique_output_path(dir.path(), "photo", "png");
        assert_eq!(path, dir.path().join(expected));
        std::fs::write(&path, b"occupied").unwrap();
        seen.push(path);
    }
    assert_eq!(seen.len(), 4);
}
