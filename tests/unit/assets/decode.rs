use std::path::PathBuf;

use super::*;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_decode").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn decode_png_normalizes_to_rgba8() {
    let dir = scratch("png");
    let path = dir.join("rgb.png");
    image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
        .save(&path)
        .unwrap();

    let img = decode_frame(&path).unwrap();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(2, 1).0, [10, 20, 30, 255]);
}

#[test]
fn format_is_sniffed_from_content() {
    let dir = scratch("sniff");
    let path = dir.join("frame.dat");
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, image::Rgba([1, 2, 3, 255])))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(&path, bytes).unwrap();

    assert_eq!(decode_frame(&path).unwrap().get_pixel(0, 0).0, [1, 2, 3, 255]);
}

#[test]
fn corrupt_file_reports_its_path() {
    let dir = scratch("corrupt");
    let path = dir.join("broken.png");
    std::fs::write(&path, b"definitely not a png").unwrap();

    let err = decode_frame(&path).unwrap_err();
    assert!(matches!(err, ReelError::Decode { .. }));
    assert!(err.to_string().contains("broken.png"));
}

#[test]
fn premultiply_then_unpremultiply_is_close() {
    let mut px = vec![100u8, 50u8, 200u8, 128u8];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(
        px,
        vec![
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
    unpremultiply_rgba8_in_place(&mut px);
    for (got, want) in px.iter().zip([100u8, 50, 200, 128]) {
        assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
    }
}
