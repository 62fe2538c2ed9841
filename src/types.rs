use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{AnalemmaError, Result};

/// One clock reading on one calendar day, local to the observer's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateSample {
    pub date: NaiveDate,
    /// 1 on January 1st.
    pub day_of_year: i32,
    pub hour: u32,
    pub minute: u32,
}

impl DateSample {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self {
            date: dt.date(),
            day_of_year: dt.ordinal() as i32,
            hour: dt.hour(),
            minute: dt.minute(),
        }
    }

    pub fn new(date: NaiveDate, hour: u32, minute: u32) -> Result<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            AnalemmaError::configuration(format!("invalid clock time {hour:02}:{minute:02}"))
        })?;
        Ok(Self::from_datetime(&date.and_time(time)))
    }

    pub fn clock_hours(&self) -> f64 {
        self.hour as f64 + self.minute as f64 / 60.0
    }

    pub fn datetime(&self) -> NaiveDateTime {
        // hour/minute were range-checked on construction
        self.date
            .and_hms_opt(self.hour, self.minute, 0)
            .unwrap_or_else(|| self.date.and_time(NaiveTime::MIN))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarPosition {
    pub declination_deg: f64,
    /// Apparent minus mean solar time, in minutes.
    pub equation_of_time_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizonCoordinate {
    pub altitude_deg: f64,
    /// Clockwise from north, in [0, 360).
    pub azimuth_deg: f64,
    /// Set at the poles and with the sun at the zenith; `azimuth_deg` is then 0.
    pub azimuth_indeterminate: bool,
}

impl HorizonCoordinate {
    pub fn new(altitude_deg: f64, azimuth_deg: f64) -> Self {
        Self {
            altitude_deg,
            azimuth_deg,
            azimuth_indeterminate: false,
        }
    }

    pub fn is_above_horizon(&self) -> bool {
        self.altitude_deg >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub timezone_offset_hours: f64,
}

impl Observer {
    /// Validates the location. Without an explicit offset the nominal zone
    /// `round(longitude / 15)` is used, with halves going to the even zone.
    pub fn new(latitude_deg: f64, longitude_deg: f64, timezone_offset_hours: Option<f64>) -> Result<Self> {
        if !latitude_deg.is_finite() || !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(AnalemmaError::configuration(format!(
                "latitude {latitude_deg} outside [-90, 90]"
            )));
        }
        if !longitude_deg.is_finite() || !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(AnalemmaError::configuration(format!(
                "longitude {longitude_deg} outside [-180, 180]"
            )));
        }
        let timezone_offset_hours = match timezone_offset_hours {
            Some(offset) if !offset.is_finite() || offset.abs() > 14.0 => {
                return Err(AnalemmaError::configuration(format!(
                    "timezone offset {offset} h outside [-14, 14]"
                )));
            }
            Some(offset) => offset,
            None => (longitude_deg / 15.0).round_ties_even(),
        };
        Ok(Self {
            latitude_deg,
            longitude_deg,
            timezone_offset_hours,
        })
    }

    pub fn timezone_meridian_deg(&self) -> f64 {
        self.timezone_offset_hours * 15.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectedBlob {
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub pixel_area: usize,
    pub mean_intensity: f64,
    /// Brightness cut used to binarize the image.
    pub threshold: f64,
}

impl DetectedBlob {
    pub fn score(&self) -> f64 {
        self.pixel_area as f64 * self.mean_intensity
    }
}

/// Linear pinhole calibration. No lens distortion is modelled, so points far
/// from the anchor drift with wide-angle lenses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraCalibration {
    pub pixels_per_degree_horizontal: f64,
    pub pixels_per_degree_vertical: f64,
    pub image_width: u32,
    pub image_height: u32,
    pub h_fov_deg: f64,
    pub v_fov_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorPoint {
    pub anchor_horizon: HorizonCoordinate,
    pub anchor_pixel: (f64, f64),
}

impl AnchorPoint {
    pub fn new(anchor_horizon: HorizonCoordinate, anchor_pixel: (f64, f64)) -> Self {
        Self {
            anchor_horizon,
            anchor_pixel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionSource {
    Approximate,
    HighPrecision,
    /// High precision was requested but the backend failed for this sample.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EphemerisSample {
    pub sample: DateSample,
    pub position: SolarPosition,
    pub source: PositionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyPoint {
    pub sample: DateSample,
    pub position: SolarPosition,
    pub hour_angle_deg: f64,
    pub horizon: HorizonCoordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayPoint {
    pub date: NaiveDate,
    pub day_of_year: i32,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPath {
    pub points: Vec<OverlayPoint>,
    /// Samples discarded for being below the horizon.
    pub dropped: usize,
}

impl OverlayPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_samples(&self) -> usize {
        self.points.len() + self.dropped
    }

    /// Points that land inside a `width` x `height` frame, in order.
    pub fn within_frame(&self, width: u32, height: u32) -> Vec<OverlayPoint> {
        self.points
            .iter()
            .filter(|p| {
                p.pixel_x >= 0.0
                    && p.pixel_y >= 0.0
                    && p.pixel_x < width as f64
                    && p.pixel_y < height as f64
            })
            .copied()
            .collect()
    }

    /// Splits off the in-frame points without touching the path itself.
    pub fn clip_to_frame(&self, width: u32, height: u32) -> FrameClip {
        let points = self.within_frame(width, height);
        FrameClip {
            out_of_frame: self.points.len() - points.len(),
            points,
        }
    }
}

/// In-frame subset of an [`OverlayPath`]. `points.len() + out_of_frame`
/// equals the path's kept count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameClip {
    pub points: Vec<OverlayPoint>,
    pub out_of_frame: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalemmaStats {
    pub altitude_range: (f64, f64),
    pub azimuth_range: (f64, f64),
    pub altitude_span: f64,
    pub azimuth_span: f64,
    pub point_count: usize,
}
