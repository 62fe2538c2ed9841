//! Anchors the 14:00 analemma to a synthetic sky photo and marks each day's
//! position. Pass a directory holding `metadata.txt` and a photo to use a real
//! image instead.

use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;
use image::{DynamicImage, Rgb, RgbImage};

use analemma_overlay::{
    load_metadata, load_oriented, locate_image, AnchorRequest, CalibrationInput, ImageAnchor, Observer, SunPixel,
};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 900;

fn synthetic_sky(sun: (f64, f64)) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let r2 = (x as f64 - sun.0).powi(2) + (y as f64 - sun.1).powi(2);
        if r2 <= 64.0 {
            Rgb([255, 252, 235])
        } else {
            let shade = 60 + (y * 90 / HEIGHT) as u8;
            Rgb([shade / 3, shade / 2, shade])
        }
    }))
}

fn mark(canvas: &mut RgbImage, x: f64, y: f64, colour: Rgb<u8>) {
    let (cx, cy) = (x.round() as i64, y.round() as i64);
    for dy in -2..=2 {
        for dx in -2..=2 {
            let (px, py) = (cx + dx, cy + dy);
            if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height() {
                canvas.put_pixel(px as u32, py as u32, colour);
            }
        }
    }
}

fn main() {
    env_logger::init();

    let (image, request) = match env::args().nth(1).map(PathBuf::from) {
        Some(dir) => {
            let metadata = load_metadata(dir.join("metadata.txt")).unwrap();
            let image = load_oriented(locate_image(&dir, &metadata).unwrap()).unwrap();
            (image, AnchorRequest::from_metadata(&metadata, SunPixel::Detect).unwrap())
        }
        None => {
            let observer = Observer::new(40.1, -88.2, Some(-6.0)).unwrap();
            let taken = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap().and_hms_opt(14, 0, 0).unwrap();
            let request = AnchorRequest::new(observer, taken, CalibrationInput::full_frame(24.0));
            (synthetic_sky((420.0, 380.0)), request)
        }
    };

    let report = ImageAnchor::new(request).run(&image).unwrap();
    println!("=== Image Overlay ===");
    println!("Image: {}x{}", image.width(), image.height());
    println!(
        "Anchor: ({:.1}, {:.1}) px from {:?}, sun at altitude {:.2}°, azimuth {:.2}°",
        report.anchor.anchor_pixel.0,
        report.anchor.anchor_pixel.1,
        report.anchor_source,
        report.anchor.anchor_horizon.altitude_deg,
        report.anchor.anchor_horizon.azimuth_deg
    );
    println!(
        "Scale: {:.2} x {:.2} px/deg",
        report.calibration.pixels_per_degree_horizontal, report.calibration.pixels_per_degree_vertical
    );

    let visible = report.path.clip_to_frame(image.width(), image.height());
    println!(
        "Points: {} above horizon, {} below, {} inside the frame",
        report.path.len(),
        report.path.dropped,
        visible.points.len()
    );
    if let Some(stats) = report.stats {
        println!(
            "Figure: {:.2}° tall, {:.2}° wide",
            stats.altitude_span, stats.azimuth_span
        );
    }

    let mut canvas = image.to_rgb8();
    for point in &visible.points {
        let colour = if point.day_of_year % 30 == 1 {
            Rgb([255, 64, 64])
        } else {
            Rgb([255, 210, 0])
        };
        mark(&mut canvas, point.pixel_x, point.pixel_y, colour);
    }
    let out = env::temp_dir().join("analemma_overlay.png");
    canvas.save(&out).unwrap();
    println!("Wrote {}", out.display());
}
