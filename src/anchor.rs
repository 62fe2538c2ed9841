//! Anchors a year of sun positions to a photograph.
//!
//! The sun's computed position at the moment the photo was taken is paired
//! with the sun's pixel in the photo; every other day of the year at the same
//! clock time is placed relative to that pair through the camera calibration.

use chrono::{Datelike, NaiveDateTime, Timelike};
use image::DynamicImage;
use log::{info, warn};
use serde::Serialize;

use crate::config::{CalibrationInput, ImageMetadata};
use crate::detector::SunDetector;
use crate::ephemeris::{EphemerisBackend, EphemerisProvider, DEFAULT_DAY_COUNT};
use crate::error::{AnalemmaError, Result};
use crate::overlay::{path_statistics, OverlayProjector};
use crate::sky_mapper::SkyMapper;
use crate::types::{
    AnalemmaStats, AnchorPoint, CameraCalibration, DateSample, DetectedBlob, FrameClip, Observer, OverlayPath,
    SkyPoint,
};

/// Where the anchor pixel comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SunPixel {
    /// Detect the sun; fall back to the image centre.
    Detect,
    /// Detect the sun; fall back to the given pixel.
    DetectOr(f64, f64),
    Manual(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorSource {
    Detected,
    Manual,
    ManualFallback,
    ImageCenter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRequest {
    pub observer: Observer,
    /// Clock time in the observer's timezone.
    pub anchor_time: NaiveDateTime,
    pub calibration: CalibrationInput,
    pub sun_pixel: SunPixel,
    pub day_count: u32,
}

impl AnchorRequest {
    pub fn new(observer: Observer, anchor_time: NaiveDateTime, calibration: CalibrationInput) -> Self {
        Self {
            observer,
            anchor_time,
            calibration,
            sun_pixel: SunPixel::Detect,
            day_count: DEFAULT_DAY_COUNT,
        }
    }

    /// Requires datetime, latitude, longitude and focal length in the metadata.
    pub fn from_metadata(metadata: &ImageMetadata, sun_pixel: SunPixel) -> Result<Self> {
        let missing = |key: &str| AnalemmaError::configuration(format!("metadata is missing '{key}'"));
        let anchor_time = metadata.datetime.ok_or_else(|| missing("datetime"))?;
        let latitude = metadata.latitude.ok_or_else(|| missing("latitude"))?;
        let longitude = metadata.longitude.ok_or_else(|| missing("longitude"))?;
        let calibration = metadata.calibration().ok_or_else(|| missing("focal_length_mm"))?;
        calibration.validate()?;
        let observer = Observer::new(latitude, longitude, None)?;
        Ok(Self {
            sun_pixel,
            ..Self::new(observer, anchor_time, calibration)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayReport {
    pub anchor: AnchorPoint,
    pub anchor_source: AnchorSource,
    pub detection: Option<DetectedBlob>,
    pub calibration: CameraCalibration,
    pub path: OverlayPath,
    pub stats: Option<AnalemmaStats>,
    /// High precision was requested but some or all samples used the approximation.
    pub degraded: bool,
    /// Points inside the image, once [`OverlayReport::clip_to_frame`] has run.
    /// `path` and `stats` always describe the full above-horizon path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_frame: Option<FrameClip>,
}

impl OverlayReport {
    pub fn clip_to_frame(&mut self) {
        self.in_frame = Some(
            self.path
                .clip_to_frame(self.calibration.image_width, self.calibration.image_height),
        );
    }
}

pub fn resolve_anchor_pixel(
    image: &DynamicImage,
    detector: &SunDetector,
    strategy: SunPixel,
) -> Result<((f64, f64), AnchorSource, Option<DetectedBlob>)> {
    let fallback = match strategy {
        SunPixel::Manual(x, y) => return Ok(((x, y), AnchorSource::Manual, None)),
        SunPixel::DetectOr(x, y) => ((x, y), AnchorSource::ManualFallback),
        SunPixel::Detect => (
            (image.width() as f64 / 2.0, image.height() as f64 / 2.0),
            AnchorSource::ImageCenter,
        ),
    };
    match detector.detect_image(image) {
        Ok(blob) => Ok(((blob.centroid_x, blob.centroid_y), AnchorSource::Detected, Some(blob))),
        Err(e) if e.is_recoverable() => {
            warn!("{e}; anchoring at ({:.1}, {:.1})", fallback.0 .0, fallback.0 .1);
            Ok((fallback.0, fallback.1, None))
        }
        Err(e) => Err(e),
    }
}

pub struct ImageAnchor {
    request: AnchorRequest,
    provider: EphemerisProvider,
    mapper: SkyMapper,
    detector: SunDetector,
}

impl ImageAnchor {
    /// Uses the approximate ephemeris and the default detector.
    pub fn new(request: AnchorRequest) -> Self {
        let provider = EphemerisProvider::approximate(request.anchor_time.year())
            .with_utc_offset(request.observer.timezone_offset_hours);
        Self {
            mapper: SkyMapper::new(request.observer),
            request,
            provider,
            detector: SunDetector::default(),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn EphemerisBackend>) -> Self {
        self.provider = EphemerisProvider::high_precision(self.request.anchor_time.year(), backend)
            .with_utc_offset(self.request.observer.timezone_offset_hours);
        self
    }

    pub fn with_detector(mut self, detector: SunDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn request(&self) -> &AnchorRequest {
        &self.request
    }

    /// Sun position at the moment the photo was taken.
    pub fn anchor_sky_point(&self) -> SkyPoint {
        let sample = DateSample::from_datetime(&self.request.anchor_time);
        self.mapper.map_point(&self.provider.position(&sample))
    }

    /// Same clock time on every day of the anchor's year, mapped to the sky.
    pub fn year_path(&self) -> Result<(Vec<SkyPoint>, bool)> {
        let year = self.provider.calculate_year(
            self.request.anchor_time.hour(),
            self.request.anchor_time.minute(),
            self.request.day_count,
        )?;
        Ok((self.mapper.map_year(&year.samples), year.degraded))
    }

    pub fn run(&self, image: &DynamicImage) -> Result<OverlayReport> {
        let calibration = self.request.calibration.calibrate(image.width(), image.height())?;
        let (pixel, anchor_source, detection) =
            resolve_anchor_pixel(image, &self.detector, self.request.sun_pixel)?;

        let anchor_point = self.anchor_sky_point();
        let anchor = AnchorPoint::new(anchor_point.horizon, pixel);
        if anchor.anchor_horizon.altitude_deg < 0.0 {
            warn!(
                "computed sun altitude at {} is {:.2} deg, below the horizon",
                self.request.anchor_time, anchor.anchor_horizon.altitude_deg
            );
        }

        let (sky, degraded) = self.year_path()?;
        let path = OverlayProjector::project(&anchor, &calibration, &sky);
        let stats = path_statistics(&path);
        info!(
            "anchor ({:.1}, {:.1}) from {:?}: {} points drawn, {} below horizon",
            pixel.0,
            pixel.1,
            anchor_source,
            path.len(),
            path.dropped
        );

        Ok(OverlayReport {
            anchor,
            anchor_source,
            detection,
            calibration,
            path,
            stats,
            degraded: degraded || self.provider.is_degraded(),
            in_frame: None,
        })
    }
}
