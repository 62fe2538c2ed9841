use analemma_overlay::angles::{normalize_delta, solar_declination};
use analemma_overlay::ephemeris::{approximate_position, EphemerisProvider};
use analemma_overlay::error::AnalemmaError;
use analemma_overlay::sky_mapper::*;
use analemma_overlay::types::{DateSample, Observer};
use chrono::{NaiveDate, Offset, TimeZone};

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

fn uiuc() -> Observer {
    Observer::new(40.1, -88.2, None).unwrap()
}

// ── Observer ──

#[test]
fn test_observer_default_timezone_from_longitude() {
    assert_eq!(uiuc().timezone_offset_hours, -6.0);
    assert_eq!(Observer::new(22.3, 114.2, None).unwrap().timezone_offset_hours, 8.0);
    assert_eq!(Observer::new(9.1, 7.4, None).unwrap().timezone_offset_hours, 0.0);
}

#[test]
fn test_observer_default_timezone_rounds_half_to_even() {
    assert_eq!(Observer::new(0.0, 7.5, None).unwrap().timezone_offset_hours, 0.0);
    assert_eq!(Observer::new(0.0, -7.5, None).unwrap().timezone_offset_hours, 0.0);
    assert_eq!(Observer::new(0.0, 22.5, None).unwrap().timezone_offset_hours, 2.0);
    assert_eq!(Observer::new(0.0, 37.5, None).unwrap().timezone_offset_hours, 2.0);
    assert_eq!(Observer::new(0.0, -52.5, None).unwrap().timezone_offset_hours, -4.0);
}

#[test]
fn test_observer_offset_from_named_zone() {
    let chicago = chrono_tz::America::Chicago;
    let winter = chicago.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
    let hours = winter.offset().fix().local_minus_utc() as f64 / 3600.0;
    let observer = Observer::new(40.1, -88.2, Some(hours)).unwrap();
    assert_eq!(observer, uiuc());
}

#[test]
fn test_observer_rejects_out_of_range() {
    for (lat, lon) in [(90.5, 0.0), (-91.0, 0.0), (0.0, 180.5), (0.0, -181.0), (f64::NAN, 0.0)] {
        let err = Observer::new(lat, lon, None).unwrap_err();
        assert!(matches!(err, AnalemmaError::Configuration { .. }), "{}", err);
    }
    assert!(Observer::new(0.0, 0.0, Some(15.0)).is_err());
}

// ── Altitude at meridian transit ──

#[test]
fn test_noon_altitude_for_solstices_and_equinoxes() {
    for lat in [-60.0, -23.45, -5.0, 0.0, 12.0, 40.1, 51.5, 66.5] {
        for decl in [-23.45, 0.0, 23.45] {
            let h = horizon_from_hour_angle(lat, decl, 0.0);
            assert_approx!(h.altitude_deg, 90.0 - (lat - decl).abs(), 0.01);
            let mapper = SkyMapper::new(Observer::new(lat, 0.0, Some(0.0)).unwrap());
            assert_approx!(mapper.max_altitude(decl), 90.0 - (lat - decl).abs(), 1e-12);
        }
    }
}

#[test]
fn test_uiuc_summer_solstice_noon() {
    let date = NaiveDate::from_ymd_opt(2026, 6, 21).unwrap();
    let sample = DateSample::new(date, 12, 0).unwrap();
    let pos = approximate_position(sample.day_of_year);
    assert_approx!(pos.declination_deg, 23.45, 0.01);
    let h = to_horizon(&pos, &sample, &uiuc());
    assert_approx!(h.altitude_deg, 90.0 - (40.1_f64 - 23.45).abs(), 0.1);
    assert!(!h.azimuth_indeterminate);
    assert!((170.0..=190.0).contains(&h.azimuth_deg), "azimuth={}", h.azimuth_deg);
}

// ── Hour angle ──

#[test]
fn test_hour_angle_includes_eot_and_longitude() {
    let sample = DateSample::new(NaiveDate::from_ymd_opt(2026, 6, 21).unwrap(), 12, 0).unwrap();
    let pos = approximate_position(sample.day_of_year);
    let ha = hour_angle(&pos, &sample, &uiuc());
    // EoT/4 degrees plus 1.8 degrees east of the -90 meridian
    assert_approx!(ha, pos.equation_of_time_min / 4.0 + 1.8, 1e-9);
}

// ── Azimuth ──

#[test]
fn test_azimuth_continuous_through_noon() {
    for (lat, decl) in [(40.1, 23.45), (40.1, -23.45), (-33.9, 0.0), (10.0, 23.45), (-10.0, -23.45)] {
        let mut prev = horizon_from_hour_angle(lat, decl, -60.0).azimuth_deg;
        for step in -599..=600 {
            let ha = step as f64 * 0.1;
            let az = horizon_from_hour_angle(lat, decl, ha).azimuth_deg;
            // only the 0/360 seam may wrap
            let jump = normalize_delta(az - prev).abs();
            assert!(jump < 2.0, "lat={} decl={} ha={} prev={} az={}", lat, decl, ha, prev, az);
            prev = az;
        }
    }
}

#[test]
fn test_azimuth_east_in_morning_west_in_afternoon() {
    let am = horizon_from_hour_angle(40.1, 10.0, -45.0);
    let pm = horizon_from_hour_angle(40.1, 10.0, 45.0);
    assert!(am.azimuth_deg > 90.0 && am.azimuth_deg < 180.0, "{}", am.azimuth_deg);
    assert!(pm.azimuth_deg > 180.0 && pm.azimuth_deg < 270.0, "{}", pm.azimuth_deg);
    assert_approx!(am.azimuth_deg + pm.azimuth_deg, 360.0, 1e-9);
}

#[test]
fn test_poles_flag_indeterminate_azimuth() {
    for lat in [90.0, -90.0] {
        let h = horizon_from_hour_angle(lat, 20.0, 37.0);
        assert!(h.azimuth_indeterminate);
        assert_eq!(h.azimuth_deg, 0.0);
        // altitude equals declination (or its negative) at the poles
        assert_approx!(h.altitude_deg, 20.0 * lat.signum(), 1e-9);
    }
}

#[test]
fn test_zenith_flags_indeterminate_azimuth() {
    let h = horizon_from_hour_angle(23.45, 23.45, 0.0);
    assert!(h.azimuth_indeterminate);
    assert_approx!(h.altitude_deg, 90.0, 1e-6);
}

#[test]
fn test_polar_year_completes_with_flags() {
    let observer = Observer::new(90.0, 0.0, Some(0.0)).unwrap();
    let year = EphemerisProvider::approximate(2026).calculate_year(12, 0, 365).unwrap();
    let points = SkyMapper::new(observer).map_year(&year.samples);
    assert_eq!(points.len(), 365);
    assert!(points.iter().all(|p| p.horizon.azimuth_indeterminate));
    assert!(points.iter().all(|p| p.horizon.altitude_deg.is_finite()));
}

// ── Batch ──

#[test]
fn test_map_year_preserves_order() {
    let year = EphemerisProvider::approximate(2026).calculate_year(15, 30, 365).unwrap();
    let points = SkyMapper::new(uiuc()).map_year(&year.samples);
    assert_eq!(points.len(), year.samples.len());
    for (p, s) in points.iter().zip(&year.samples) {
        assert_eq!(p.sample, s.sample);
        assert_eq!(p.position, s.position);
    }
}

#[test]
fn test_noon_analemma_altitude_span() {
    let year = EphemerisProvider::approximate(2026).calculate_year(12, 0, 365).unwrap();
    let points = SkyMapper::new(uiuc()).map_year(&year.samples);
    let max = points.iter().map(|p| p.horizon.altitude_deg).fold(f64::MIN, f64::max);
    let min = points.iter().map(|p| p.horizon.altitude_deg).fold(f64::MAX, f64::min);
    // roughly twice the obliquity tall
    assert_approx!(max - min, 46.9, 1.0);
    assert!(points.iter().all(|p| p.horizon.altitude_deg > 0.0));
}

// ── Solar noon / sunrise ──

#[test]
fn test_solar_noon_clock_time() {
    let mapper = SkyMapper::new(uiuc());
    let eot = approximate_position(172).equation_of_time_min;
    // 12:00 - EoT - 4 min/deg * 1.8 deg east of the zone meridian
    assert_eq!(mapper.solar_noon(eot), (11, 54));
    let greenwich = SkyMapper::new(Observer::new(51.5, 0.0, Some(0.0)).unwrap());
    assert_eq!(greenwich.solar_noon(0.0), (12, 0));
    assert_eq!(greenwich.solar_noon(16.0), (11, 44));
}

#[test]
fn test_solar_noon_is_meridian_transit() {
    let observer = uiuc();
    let mapper = SkyMapper::new(observer);
    let date = NaiveDate::from_ymd_opt(2026, 11, 3).unwrap();
    let eot = approximate_position(307).equation_of_time_min;
    let (h, m) = mapper.solar_noon(eot);
    let sample = DateSample::new(date, h, m).unwrap();
    let ha = hour_angle(&approximate_position(sample.day_of_year), &sample, &observer);
    // within the one-minute rounding of the clock reading
    assert!(ha.abs() <= 0.25, "ha={}", ha);
}

#[test]
fn test_sunrise_sunset_hour_angles() {
    let mapper = SkyMapper::new(uiuc());
    let (rise, set) = mapper.sunrise_sunset_hour_angles(0.0).unwrap();
    assert_approx!(rise, -90.0, 1e-9);
    assert_approx!(set, 90.0, 1e-9);
    assert!(mapper.day_length_hours(23.45).unwrap() > 14.0);
    assert!(mapper.day_length_hours(-23.45).unwrap() < 10.0);
}

#[test]
fn test_polar_day_and_night() {
    let arctic = SkyMapper::new(Observer::new(80.0, 0.0, Some(0.0)).unwrap());
    assert!(arctic.sunrise_sunset_hour_angles(solar_declination(172)).is_none());
    assert!(arctic.sunrise_sunset_hour_angles(solar_declination(355)).is_none());
}
