use log::{debug, info};

use crate::angles::{normalize_angle, normalize_delta};
use crate::types::{
    AnalemmaStats, AnchorPoint, CameraCalibration, HorizonCoordinate, OverlayPath, OverlayPoint, SkyPoint,
};

/// Pixel position of a sky coordinate, as an offset from the anchor. Image y
/// grows downward, so altitude gains move the point up.
pub fn sky_to_pixel(anchor: &AnchorPoint, calibration: &CameraCalibration, horizon: &HorizonCoordinate) -> (f64, f64) {
    let d_alt = horizon.altitude_deg - anchor.anchor_horizon.altitude_deg;
    let d_az = normalize_delta(horizon.azimuth_deg - anchor.anchor_horizon.azimuth_deg);
    let dx = d_az * calibration.pixels_per_degree_horizontal;
    let dy = -d_alt * calibration.pixels_per_degree_vertical;
    (anchor.anchor_pixel.0 + dx, anchor.anchor_pixel.1 + dy)
}

pub struct OverlayProjector;

impl OverlayProjector {
    /// Projects every above-horizon sample, keeping input order. Samples below
    /// the horizon are dropped and counted.
    pub fn project(anchor: &AnchorPoint, calibration: &CameraCalibration, path: &[SkyPoint]) -> OverlayPath {
        let points: Vec<OverlayPoint> = path
            .iter()
            .filter(|p| p.horizon.is_above_horizon())
            .map(|p| {
                let (pixel_x, pixel_y) = sky_to_pixel(anchor, calibration, &p.horizon);
                OverlayPoint {
                    date: p.sample.date,
                    day_of_year: p.sample.day_of_year,
                    pixel_x,
                    pixel_y,
                    altitude_deg: p.horizon.altitude_deg,
                    azimuth_deg: p.horizon.azimuth_deg,
                }
            })
            .collect();
        let dropped = path.len() - points.len();
        if dropped > 0 {
            debug!("dropped {dropped} samples below the horizon");
        }
        info!("projected {} of {} samples", points.len(), path.len());
        OverlayPath { points, dropped }
    }
}

/// Extent of the projected figure. Azimuths are unwrapped around the first
/// point so a path straddling north does not report a ~360 degree span.
pub fn path_statistics(path: &OverlayPath) -> Option<AnalemmaStats> {
    let first = path.points.first()?;
    let reference = first.azimuth_deg;
    let init = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    let (alt_min, alt_max, az_min, az_max) = path.points.iter().fold(init, |(lo, hi, az_lo, az_hi), p| {
        let az = reference + normalize_delta(p.azimuth_deg - reference);
        (lo.min(p.altitude_deg), hi.max(p.altitude_deg), az_lo.min(az), az_hi.max(az))
    });
    Some(AnalemmaStats {
        altitude_range: (alt_min, alt_max),
        azimuth_range: (normalize_angle(az_min), normalize_angle(az_max)),
        altitude_span: alt_max - alt_min,
        azimuth_span: az_max - az_min,
        point_count: path.points.len(),
    })
}
