pub mod anchor;
pub mod angles;
pub mod camera;
pub mod config;
pub mod detector;
pub mod ephemeris;
pub mod error;
pub mod image_io;
pub mod overlay;
pub mod sky_mapper;
pub mod types;

pub use anchor::{resolve_anchor_pixel, AnchorRequest, AnchorSource, ImageAnchor, OverlayReport, SunPixel};

pub use angles::{
    day_of_year, deg_to_rad, doy_to_month_day, equation_of_time, hour_angle, intermediate_angle_b,
    local_solar_time, max_altitude, normalize_angle, normalize_delta, rad_to_deg, solar_altitude,
    solar_azimuth, solar_declination, APPROX_YEAR_DAYS, DEGREES_PER_HOUR, EARTH_AXIAL_TILT,
    MINUTES_PER_DEGREE,
};

pub use camera::{field_of_view_deg, focal_length_for_fov, CameraModel, FULL_FRAME_SENSOR_MM};

pub use config::{load_metadata, locate_image, parse_metadata, AnalemmaConfig, CalibrationInput, ImageMetadata};

pub use detector::{brightness_plane, SunDetector};

pub use ephemeris::{
    approximate_position, compare_modes, AlmanacBackend, EphemerisBackend, EphemerisMode,
    EphemerisProvider, ModeComparison, YearEphemeris, DEFAULT_DAY_COUNT,
};

pub use error::{AnalemmaError, Result};

pub use image_io::{load_oriented, normalize_orientation};

pub use overlay::{path_statistics, sky_to_pixel, OverlayProjector};

pub use sky_mapper::{horizon_from_hour_angle, to_horizon, SkyMapper};

pub use types::{
    AnalemmaStats, AnchorPoint, CameraCalibration, DateSample, DetectedBlob, EphemerisSample, FrameClip,
    HorizonCoordinate, Observer, OverlayPath, OverlayPoint, PositionSource, SkyPoint, SolarPosition,
};
