use chrono::{Datelike, NaiveDate};

pub const EARTH_AXIAL_TILT: f64 = 23.45;
pub const DEGREES_PER_HOUR: f64 = 15.0;
pub const MINUTES_PER_DEGREE: f64 = 4.0;

/// Cycle length of the closed-form formulas. Leap years are not special-cased.
pub const APPROX_YEAR_DAYS: f64 = 365.0;

const VERNAL_EQUINOX_DAY: i32 = 81;
const DECLINATION_PHASE_DAYS: i32 = 284;

/// Equation-of-time harmonics, minutes.
const EOT_OBLIQUITY_AMPLITUDE: f64 = 9.87;
const EOT_ECCENTRICITY_COS: f64 = 7.53;
const EOT_ECCENTRICITY_SIN: f64 = 1.5;

const POLE_EPSILON_DEG: f64 = 1e-9;
const ZENITH_EPSILON: f64 = 1e-12;

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * (180.0 / std::f64::consts::PI)
}

pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wraps an angular difference into (-180, 180].
pub fn normalize_delta(delta: f64) -> f64 {
    let wrapped = normalize_angle(delta);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

pub fn leap_year(year: i32) -> bool {
    (year % 400 == 0) || (year % 4 == 0 && year % 100 != 0)
}

pub fn days_in_months(year: i32) -> [u32; 12] {
    [
        31,
        if leap_year(year) { 29 } else { 28 },
        31, 30, 31, 30, 31, 31, 30, 31, 30, 31,
    ]
}

/// 1-based ordinal of a calendar date, or `None` if the date does not exist.
pub fn day_of_year(year: i32, month: u32, day: u32) -> Option<i32> {
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.ordinal() as i32)
}

pub fn doy_to_month_day(year: i32, doy: i32) -> (u32, u32) {
    let mut remaining = doy;
    for (month_idx, &dim) in days_in_months(year).iter().enumerate() {
        if remaining <= dim as i32 {
            return (month_idx as u32 + 1, remaining as u32);
        }
        remaining -= dim as i32;
    }
    (12, 31)
}

/// Orbital angle B used by the equation-of-time fit, zero at the vernal equinox.
pub fn intermediate_angle_b(n: i32) -> f64 {
    deg_to_rad((n - VERNAL_EQUINOX_DAY) as f64 * (360.0 / APPROX_YEAR_DAYS))
}

/// Two-harmonic fit: obliquity term minus eccentricity term. Peaks near
/// +16.4 min at the start of November and bottoms near -14.2 min mid-February.
pub fn equation_of_time(n: i32) -> f64 {
    let b = intermediate_angle_b(n);
    let obliquity = EOT_OBLIQUITY_AMPLITUDE * (2.0 * b).sin();
    let eccentricity = EOT_ECCENTRICITY_COS * b.cos() + EOT_ECCENTRICITY_SIN * b.sin();
    obliquity - eccentricity
}

pub fn solar_declination(n: i32) -> f64 {
    EARTH_AXIAL_TILT
        * deg_to_rad((360.0 / APPROX_YEAR_DAYS) * (DECLINATION_PHASE_DAYS + n) as f64).sin()
}

/// Local apparent solar time in hours. Not wrapped to [0, 24) so the hour angle
/// stays continuous across midnight.
pub fn local_solar_time(clock_hours: f64, eot_minutes: f64, longitude: f64, zone_meridian: f64) -> f64 {
    clock_hours + eot_minutes / 60.0 + (longitude - zone_meridian) / DEGREES_PER_HOUR
}

pub fn hour_angle(local_solar_time: f64) -> f64 {
    DEGREES_PER_HOUR * (local_solar_time - 12.0)
}

pub fn solar_altitude(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let lat_rad = deg_to_rad(latitude);
    let dec_rad = deg_to_rad(declination);
    let ha_rad = deg_to_rad(hour_angle);
    let sin_alt =
        lat_rad.sin() * dec_rad.sin() + lat_rad.cos() * dec_rad.cos() * ha_rad.cos();
    rad_to_deg(sin_alt.clamp(-1.0, 1.0).asin())
}

/// Azimuth clockwise from north, or `None` where it is undefined (poles,
/// sun at the zenith).
pub fn solar_azimuth(latitude: f64, declination: f64, hour_angle: f64) -> Option<f64> {
    if latitude.abs() >= 90.0 - POLE_EPSILON_DEG {
        return None;
    }
    let lat_rad = deg_to_rad(latitude);
    let dec_rad = deg_to_rad(declination);
    let ha_rad = deg_to_rad(hour_angle);
    let sin_az = -dec_rad.cos() * ha_rad.sin();
    let cos_az = dec_rad.sin() * lat_rad.cos() - dec_rad.cos() * lat_rad.sin() * ha_rad.cos();
    if sin_az.hypot(cos_az) < ZENITH_EPSILON {
        return None;
    }
    Some(normalize_angle(rad_to_deg(sin_az.atan2(cos_az))))
}

pub fn max_altitude(latitude: f64, declination: f64) -> f64 {
    90.0 - (latitude - declination).abs()
}
