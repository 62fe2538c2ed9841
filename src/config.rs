//! Run configuration and the `metadata.txt` reader.
//!
//! Everything here is validated before it reaches the numeric core: a bad
//! mode string, an out-of-range coordinate or a non-positive optical
//! dimension is a [`AnalemmaError::Configuration`] raised up front.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraModel, FULL_FRAME_SENSOR_MM};
use crate::ephemeris::{EphemerisMode, DEFAULT_DAY_COUNT};
use crate::error::{AnalemmaError, Result};
use crate::types::{CameraCalibration, Observer};

pub const METADATA_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const METADATA_SEPARATORS: [&str; 2] = ["--- REFERENCE DATA", "--- ADDITIONAL METADATA"];
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"];

fn default_sensor_width() -> f64 {
    FULL_FRAME_SENSOR_MM.0
}

fn default_sensor_height() -> f64 {
    FULL_FRAME_SENSOR_MM.1
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CalibrationInput {
    FocalLength {
        focal_length_mm: f64,
        #[serde(default = "default_sensor_width")]
        sensor_width_mm: f64,
        #[serde(default = "default_sensor_height")]
        sensor_height_mm: f64,
    },
    FieldOfView {
        h_fov_deg: f64,
        v_fov_deg: f64,
    },
}

impl CalibrationInput {
    pub fn full_frame(focal_length_mm: f64) -> Self {
        Self::FocalLength {
            focal_length_mm,
            sensor_width_mm: FULL_FRAME_SENSOR_MM.0,
            sensor_height_mm: FULL_FRAME_SENSOR_MM.1,
        }
    }

    pub fn calibrate(&self, image_w_px: u32, image_h_px: u32) -> Result<CameraCalibration> {
        match *self {
            Self::FocalLength {
                focal_length_mm,
                sensor_width_mm,
                sensor_height_mm,
            } => CameraModel::from_focal_length(
                focal_length_mm,
                sensor_width_mm,
                sensor_height_mm,
                image_w_px,
                image_h_px,
            ),
            Self::FieldOfView { h_fov_deg, v_fov_deg } => {
                CameraModel::from_fov(h_fov_deg, v_fov_deg, image_w_px, image_h_px)
            }
        }
    }

    /// Checks the optics without knowing the image size yet.
    pub fn validate(&self) -> Result<()> {
        self.calibrate(1, 1).map(|_| ())
    }
}

fn default_mode() -> String {
    EphemerisMode::Approximate.to_string()
}

fn default_hour() -> u32 {
    12
}

fn default_day_count() -> u32 {
    DEFAULT_DAY_COUNT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalemmaConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timezone_offset_hours: Option<f64>,
    #[serde(default = "default_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    pub year: i32,
    #[serde(default = "default_day_count")]
    pub day_count: u32,
    #[serde(default)]
    pub calibration: Option<CalibrationInput>,
}

impl AnalemmaConfig {
    pub fn new(latitude: f64, longitude: f64, year: i32) -> Self {
        Self {
            mode: default_mode(),
            latitude,
            longitude,
            timezone_offset_hours: None,
            hour: default_hour(),
            minute: 0,
            year,
            day_count: DEFAULT_DAY_COUNT,
            calibration: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading configuration from {}", path.display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn ephemeris_mode(&self) -> Result<EphemerisMode> {
        self.mode.parse()
    }

    pub fn observer(&self) -> Result<Observer> {
        Observer::new(self.latitude, self.longitude, self.timezone_offset_hours)
    }

    pub fn validate(&self) -> Result<()> {
        self.ephemeris_mode()?;
        self.observer()?;
        if self.hour > 23 || self.minute > 59 {
            return Err(AnalemmaError::configuration(format!(
                "invalid clock time {:02}:{:02}",
                self.hour, self.minute
            )));
        }
        if self.day_count == 0 || self.day_count > 366 {
            return Err(AnalemmaError::configuration(format!(
                "day count {} outside 1..=366",
                self.day_count
            )));
        }
        if let Some(calibration) = &self.calibration {
            calibration.validate()?;
        }
        Ok(())
    }
}

/// Contents of a `metadata.txt` next to a photograph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageMetadata {
    pub image_file: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub focal_length_mm: Option<f64>,
    pub sensor_width_mm: Option<f64>,
    pub sensor_height_mm: Option<f64>,
    /// Keys without a dedicated field (camera make, location name, ...).
    pub extra: BTreeMap<String, String>,
}

impl ImageMetadata {
    /// Focal-length calibration, with full-frame defaults for missing sensor sizes.
    pub fn calibration(&self) -> Option<CalibrationInput> {
        self.focal_length_mm.map(|focal_length_mm| CalibrationInput::FocalLength {
            focal_length_mm,
            sensor_width_mm: self.sensor_width_mm.unwrap_or(FULL_FRAME_SENSOR_MM.0),
            sensor_height_mm: self.sensor_height_mm.unwrap_or(FULL_FRAME_SENSOR_MM.1),
        })
    }
}

fn parse_number(line: usize, key: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|e| AnalemmaError::metadata(line, format!("{key}: {e}")))
}

/// Parses `KEY=VALUE` lines. Keys are case-insensitive, `#` starts a comment,
/// and parsing stops at the reference-data separator.
pub fn parse_metadata(text: &str) -> Result<ImageMetadata> {
    let mut metadata = ImageMetadata::default();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if METADATA_SEPARATORS.iter().any(|sep| line.contains(sep)) {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "latitude" => metadata.latitude = Some(parse_number(line_no, &key, value)?),
            "longitude" => metadata.longitude = Some(parse_number(line_no, &key, value)?),
            "altitude_m" => metadata.altitude_m = Some(parse_number(line_no, &key, value)?),
            "focal_length_mm" => metadata.focal_length_mm = Some(parse_number(line_no, &key, value)?),
            "sensor_width_mm" => metadata.sensor_width_mm = Some(parse_number(line_no, &key, value)?),
            "sensor_height_mm" => metadata.sensor_height_mm = Some(parse_number(line_no, &key, value)?),
            "datetime" => {
                let dt = NaiveDateTime::parse_from_str(value, METADATA_DATETIME_FORMAT)
                    .map_err(|e| AnalemmaError::metadata(line_no, format!("datetime: {e}")))?;
                metadata.datetime = Some(dt);
            }
            "image_file" => metadata.image_file = Some(value.to_string()),
            _ => {
                metadata.extra.insert(key, value.to_string());
            }
        }
    }
    Ok(metadata)
}

pub fn load_metadata(path: impl AsRef<Path>) -> Result<ImageMetadata> {
    parse_metadata(&fs::read_to_string(path)?)
}

/// Image named by the metadata, or the first image file in `dir` by name.
pub fn locate_image(dir: impl AsRef<Path>, metadata: &ImageMetadata) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if let Some(name) = &metadata.image_file {
        return Ok(dir.join(name));
    }
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    candidates.sort();
    match candidates.len() {
        0 => Err(AnalemmaError::configuration(format!(
            "no image file found in {}",
            dir.display()
        ))),
        n => {
            if n > 1 {
                warn!("{n} images in {}, using {}", dir.display(), candidates[0].display());
            }
            Ok(candidates.swap_remove(0))
        }
    }
}
