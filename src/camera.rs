//! Linear pinhole camera calibration: a constant pixels-per-degree scale on
//! each image axis.
//!
//! The mapping ignores lens distortion and the tangent-plane stretch of a real
//! rectilinear lens, so angular offsets far from the anchor are progressively
//! misplaced. This is an accepted accuracy limit of the overlay.

use log::debug;

use crate::angles::{deg_to_rad, rad_to_deg};
use crate::error::{AnalemmaError, Result};
use crate::types::CameraCalibration;

/// 36 x 24 mm full-frame sensor.
pub const FULL_FRAME_SENSOR_MM: (f64, f64) = (36.0, 24.0);

/// Full angle of view across a sensor dimension, in degrees.
pub fn field_of_view_deg(sensor_dimension_mm: f64, focal_length_mm: f64) -> f64 {
    2.0 * rad_to_deg((sensor_dimension_mm / (2.0 * focal_length_mm)).atan())
}

/// Focal length that yields `fov_deg` across a sensor dimension.
pub fn focal_length_for_fov(sensor_dimension_mm: f64, fov_deg: f64) -> f64 {
    sensor_dimension_mm / (2.0 * deg_to_rad(fov_deg / 2.0).tan())
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalemmaError::configuration(format!("{name} must be positive, got {value}")))
    }
}

fn require_dimensions(image_w_px: u32, image_h_px: u32) -> Result<()> {
    if image_w_px == 0 || image_h_px == 0 {
        return Err(AnalemmaError::configuration(format!(
            "image dimensions must be non-zero, got {image_w_px}x{image_h_px}"
        )));
    }
    Ok(())
}

pub struct CameraModel;

impl CameraModel {
    pub fn from_focal_length(
        focal_mm: f64,
        sensor_w_mm: f64,
        sensor_h_mm: f64,
        image_w_px: u32,
        image_h_px: u32,
    ) -> Result<CameraCalibration> {
        require_positive("focal length", focal_mm)?;
        require_positive("sensor width", sensor_w_mm)?;
        require_positive("sensor height", sensor_h_mm)?;
        let h_fov = field_of_view_deg(sensor_w_mm, focal_mm);
        let v_fov = field_of_view_deg(sensor_h_mm, focal_mm);
        debug!("{focal_mm} mm on {sensor_w_mm}x{sensor_h_mm} mm -> FOV {h_fov:.3} x {v_fov:.3} deg");
        Self::from_fov(h_fov, v_fov, image_w_px, image_h_px)
    }

    pub fn from_fov(h_fov_deg: f64, v_fov_deg: f64, image_w_px: u32, image_h_px: u32) -> Result<CameraCalibration> {
        require_positive("horizontal field of view", h_fov_deg)?;
        require_positive("vertical field of view", v_fov_deg)?;
        if h_fov_deg >= 180.0 || v_fov_deg >= 180.0 {
            return Err(AnalemmaError::configuration(format!(
                "field of view {h_fov_deg} x {v_fov_deg} deg is not representable by a pinhole camera"
            )));
        }
        require_dimensions(image_w_px, image_h_px)?;
        Ok(CameraCalibration {
            pixels_per_degree_horizontal: image_w_px as f64 / h_fov_deg,
            pixels_per_degree_vertical: image_h_px as f64 / v_fov_deg,
            image_width: image_w_px,
            image_height: image_h_px,
            h_fov_deg,
            v_fov_deg,
        })
    }
}
