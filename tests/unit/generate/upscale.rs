use std::path::PathBuf;

use image::RgbaImage;

use super::*;

#[test]
fn scaled_dimensions_round_and_never_shrink() {
    assert_eq!(scaled_dimensions((512, 512), 2.0).unwrap(), (1024, 1024));
    assert_eq!(scaled_dimensions((100, 50), 1.5).unwrap(), (150, 75));
    assert_eq!(scaled_dimensions((3, 3), 1.1).unwrap(), (3, 3));
    assert!(scaled_dimensions((u32::MAX, 1), 2.0).is_err());
}

#[test]
fn upscale_rewrites_file_in_place() {
    let dir = PathBuf::from("target").join("unit_upscale");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("img.png");
    RgbaImage::from_pixel(10, 8, image::Rgba([40, 80, 120, 255]))
        .save(&path)
        .unwrap();

    LanczosUpscaler.upscale_in_place(&path, 2.0).unwrap();
    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (20, 16));
    for (got, want) in img.get_pixel(10, 8).0.iter().zip([40u8, 80, 120, 255]) {
        assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
    }
}

#[test]
fn factors_below_one_are_rejected() {
    let err = LanczosUpscaler
        .upscale_in_place(std::path::Path::new("unused.png"), 0.5)
        .unwrap_err();
    assert!(matches!(err, ReelError::Config(_)));
}

#[test]
fn unreadable_file_is_model_invocation_error_naming_path() {
    let dir = PathBuf::from("target").join("unit_upscale");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.png");
    std::fs::write(&path, b"not an image").unwrap();

    let err = LanczosUpscaler.upscale_in_place(&path, 2.0).unwrap_err();
    assert!(matches!(err, ReelError::ModelInvocation(_)));
    assert!(err.to_string().contains("broken.png"));

    let missing = LanczosUpscaler
        .upscale_in_place(&dir.join("missing.png"), 2.0)
        .unwrap_err();
    assert!(matches!(missing, ReelError::ModelInvocation(_)));
}
