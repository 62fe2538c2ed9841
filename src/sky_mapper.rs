use log::{debug, info};

use crate::angles::{self, deg_to_rad, rad_to_deg, DEGREES_PER_HOUR, MINUTES_PER_DEGREE};
use crate::types::{DateSample, EphemerisSample, HorizonCoordinate, Observer, SkyPoint, SolarPosition};

/// Altitude and azimuth for a known hour angle. Azimuth is reported as 0 and
/// flagged where it is undefined.
pub fn horizon_from_hour_angle(latitude: f64, declination: f64, hour_angle: f64) -> HorizonCoordinate {
    let altitude_deg = angles::solar_altitude(latitude, declination, hour_angle);
    match angles::solar_azimuth(latitude, declination, hour_angle) {
        Some(azimuth_deg) => HorizonCoordinate::new(altitude_deg, azimuth_deg),
        None => HorizonCoordinate {
            altitude_deg,
            azimuth_deg: 0.0,
            azimuth_indeterminate: true,
        },
    }
}

pub fn hour_angle(position: &SolarPosition, sample: &DateSample, observer: &Observer) -> f64 {
    let lst = angles::local_solar_time(
        sample.clock_hours(),
        position.equation_of_time_min,
        observer.longitude_deg,
        observer.timezone_meridian_deg(),
    );
    angles::hour_angle(lst)
}

pub fn to_horizon(position: &SolarPosition, sample: &DateSample, observer: &Observer) -> HorizonCoordinate {
    let ha = hour_angle(position, sample, observer);
    horizon_from_hour_angle(observer.latitude_deg, position.declination_deg, ha)
}

/// Projects solar positions onto one observer's horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyMapper {
    observer: Observer,
}

impl SkyMapper {
    pub fn new(observer: Observer) -> Self {
        Self { observer }
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn map_point(&self, sample: &EphemerisSample) -> SkyPoint {
        let hour_angle_deg = hour_angle(&sample.position, &sample.sample, &self.observer);
        let horizon = horizon_from_hour_angle(
            self.observer.latitude_deg,
            sample.position.declination_deg,
            hour_angle_deg,
        );
        if horizon.azimuth_indeterminate {
            debug!("{}: azimuth indeterminate (altitude {:.3})", sample.sample.date, horizon.altitude_deg);
        }
        SkyPoint {
            sample: sample.sample,
            position: sample.position,
            hour_angle_deg,
            horizon,
        }
    }

    /// Chronological order is preserved.
    pub fn map_year(&self, samples: &[EphemerisSample]) -> Vec<SkyPoint> {
        let points: Vec<SkyPoint> = samples.iter().map(|s| self.map_point(s)).collect();
        let degenerate = points.iter().filter(|p| p.horizon.azimuth_indeterminate).count();
        info!(
            "mapped {} samples for ({:.4}, {:.4}); {} with indeterminate azimuth",
            points.len(),
            self.observer.latitude_deg,
            self.observer.longitude_deg,
            degenerate
        );
        points
    }

    /// Altitude at meridian transit.
    pub fn max_altitude(&self, declination: f64) -> f64 {
        angles::max_altitude(self.observer.latitude_deg, declination)
    }

    /// Clock time (hour, minute) of meridian transit for a given equation of time.
    pub fn solar_noon(&self, eot_minutes: f64) -> (u32, u32) {
        let longitude_correction =
            (self.observer.longitude_deg - self.observer.timezone_meridian_deg()) * MINUTES_PER_DEGREE;
        let noon_minutes = (12.0 * 60.0 - eot_minutes - longitude_correction).rem_euclid(24.0 * 60.0);
        let total = noon_minutes.round() as u32 % (24 * 60);
        (total / 60, total % 60)
    }

    /// Hour angles of sunrise and sunset on the geometric horizon, or `None`
    /// during polar day or night.
    pub fn sunrise_sunset_hour_angles(&self, declination: f64) -> Option<(f64, f64)> {
        let lat_rad = deg_to_rad(self.observer.latitude_deg);
        let dec_rad = deg_to_rad(declination);
        let cos_h = -lat_rad.tan() * dec_rad.tan();
        if !cos_h.is_finite() || cos_h.abs() > 1.0 {
            return None;
        }
        let h = rad_to_deg(cos_h.acos());
        Some((-h, h))
    }

    /// Daylight length in hours, from the sunrise/sunset hour angles.
    pub fn day_length_hours(&self, declination: f64) -> Option<f64> {
        self.sunrise_sunset_hour_angles(declination)
            .map(|(rise, set)| (set - rise) / DEGREES_PER_HOUR)
    }
}
