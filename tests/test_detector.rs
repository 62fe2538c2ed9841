use analemma_overlay::detector::*;
use analemma_overlay::error::AnalemmaError;
use analemma_overlay::image_io::{load_oriented, normalize_orientation, orientation_from_exif};
use image::metadata::Orientation;
use image::{DynamicImage, Rgb, RgbImage};

macro_rules! assert_approx {
    ($left:expr, $right:expr, $tol:expr) => {
        let (l, r) = ($left as f64, $right as f64);
        assert!(
            (l - r).abs() <= $tol,
            "assert_approx failed: left={}, right={}, diff={}, tol={}",
            l, r, (l - r).abs(), $tol
        );
    };
}

/// Dark sky with a dim gradient and a saturated disc.
fn sky_with_sun(width: u32, height: u32, cx: f64, cy: f64, radius: f64) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (x as f64 - cx, y as f64 - cy);
        if dx * dx + dy * dy <= radius * radius {
            Rgb([255, 255, 255])
        } else {
            let sky = (40 + y * 40 / height) as u8;
            Rgb([sky / 2, sky / 2, sky])
        }
    })
}

fn paint_disc(img: &mut RgbImage, cx: f64, cy: f64, radius: f64, colour: Rgb<u8>) {
    for (x, y, px) in img.enumerate_pixels_mut() {
        let (dx, dy) = (x as f64 - cx, y as f64 - cy);
        if dx * dx + dy * dy <= radius * radius {
            *px = colour;
        }
    }
}

#[test]
fn test_detects_disc_centre() {
    let img = DynamicImage::ImageRgb8(sky_with_sun(200, 150, 120.0, 40.0, 6.0));
    let blob = SunDetector::default().detect_image(&img).unwrap();
    assert_approx!(blob.centroid_x, 120.0, 1e-9);
    assert_approx!(blob.centroid_y, 40.0, 1e-9);
    assert!(blob.pixel_area > 100);
    assert_approx!(blob.mean_intensity, 1.0, 1e-6);
}

#[test]
fn test_sub_pixel_centroid() {
    // a 2x2 block centred between pixel centres
    let mut img = RgbImage::from_pixel(40, 40, Rgb([10, 10, 10]));
    for (x, y) in [(20, 10), (21, 10), (20, 11), (21, 11)] {
        img.put_pixel(x, y, Rgb([250, 250, 250]));
    }
    let blob = SunDetector::default()
        .detect_image(&DynamicImage::ImageRgb8(img))
        .unwrap();
    assert_approx!(blob.centroid_x, 20.5, 1e-9);
    assert_approx!(blob.centroid_y, 10.5, 1e-9);
    assert_eq!(blob.pixel_area, 4);
}

#[test]
fn test_detection_is_deterministic() {
    let img = DynamicImage::ImageRgb8(sky_with_sun(160, 120, 33.3, 77.7, 5.5));
    let detector = SunDetector::default();
    let first = detector.detect_image(&img).unwrap();
    for _ in 0..5 {
        assert_eq!(detector.detect_image(&img).unwrap(), first);
    }
}

#[test]
fn test_black_image_reports_no_bright_source() {
    let img = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
    let err = SunDetector::default().detect_image(&img).unwrap_err();
    assert!(matches!(err, AnalemmaError::NoBrightSourceFound { min_area: 4, .. }), "{err}");
    assert!(err.is_recoverable());
}

#[test]
fn test_blob_smaller_than_min_area_is_rejected() {
    let mut img = RgbImage::new(50, 50);
    img.put_pixel(10, 10, Rgb([255, 255, 255]));
    img.put_pixel(11, 10, Rgb([255, 255, 255]));
    let detector = SunDetector::new(99.9, 4, 0.5).unwrap();
    assert!(detector.detect_image(&DynamicImage::ImageRgb8(img)).is_err());
}

#[test]
fn test_highest_scoring_blob_wins() {
    let mut img = RgbImage::from_pixel(300, 200, Rgb([5, 5, 20]));
    paint_disc(&mut img, 50.0, 50.0, 3.0, Rgb([255, 255, 255]));
    paint_disc(&mut img, 220.0, 120.0, 9.0, Rgb([255, 255, 255]));
    let detector = SunDetector::new(95.0, 4, 0.5).unwrap();
    let blob = detector.detect_image(&DynamicImage::ImageRgb8(img)).unwrap();
    assert_approx!(blob.centroid_x, 220.0, 1e-9);
    assert_approx!(blob.centroid_y, 120.0, 1e-9);
}

#[test]
fn test_any_saturated_channel_counts_as_bright() {
    let mut img = RgbImage::new(30, 30);
    paint_disc(&mut img, 15.0, 15.0, 3.0, Rgb([255, 0, 0]));
    let plane = brightness_plane(&DynamicImage::ImageRgb8(img.clone()));
    assert_eq!(plane.dim(), (30, 30));
    assert_approx!(plane[[15, 15]], 1.0, 1e-6);
    assert_eq!(plane[[0, 0]], 0.0);
    assert!(SunDetector::default().detect_image(&DynamicImage::ImageRgb8(img)).is_ok());
}

#[test]
fn test_brightness_plane_is_row_major() {
    let mut img = RgbImage::new(8, 4);
    img.put_pixel(7, 1, Rgb([0, 0, 255]));
    let plane = brightness_plane(&DynamicImage::ImageRgb8(img));
    assert_eq!(plane.dim(), (4, 8));
    assert_approx!(plane[[1, 7]], 1.0, 1e-6);
}

#[test]
fn test_detector_parameter_validation() {
    for result in [
        SunDetector::new(0.0, 4, 0.5),
        SunDetector::new(100.5, 4, 0.5),
        SunDetector::new(99.0, 0, 0.5),
        SunDetector::new(99.0, 4, 0.0),
    ] {
        assert!(matches!(result, Err(AnalemmaError::Configuration { .. })));
    }
}

// ── Orientation ──

#[test]
fn test_normalize_orientation_rotates_to_upright() {
    let mut img = RgbImage::new(4, 2);
    img.put_pixel(3, 0, Rgb([255, 255, 255]));
    let mut dynamic = DynamicImage::ImageRgb8(img);
    normalize_orientation(&mut dynamic, orientation_from_exif(6));
    assert_eq!((dynamic.width(), dynamic.height()), (2, 4));
    let rgb = dynamic.to_rgb8();
    assert_eq!(rgb.get_pixel(1, 3), &Rgb([255, 255, 255]));
}

#[test]
fn test_unknown_exif_value_is_upright() {
    assert_eq!(orientation_from_exif(0), Orientation::NoTransforms);
    assert_eq!(orientation_from_exif(9), Orientation::NoTransforms);
    assert_eq!(orientation_from_exif(3), Orientation::Rotate180);
}

#[test]
fn test_load_oriented_png_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sky.png");
    sky_with_sun(64, 48, 20.0, 30.0, 4.0).save(&path).unwrap();
    let loaded = load_oriented(&path).unwrap();
    assert_eq!((loaded.width(), loaded.height()), (64, 48));
    let blob = SunDetector::default().detect_image(&loaded).unwrap();
    assert_approx!(blob.centroid_x, 20.0, 1e-9);
    assert_approx!(blob.centroid_y, 30.0, 1e-9);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_oriented(dir.path().join("absent.jpg")).unwrap_err();
    assert!(matches!(err, AnalemmaError::Io(_)), "{err}");
}
