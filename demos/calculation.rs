use chrono::{Datelike, NaiveDate, Offset, TimeZone};
use chrono_tz::America::Chicago;

use analemma_overlay::{
    compare_modes, AlmanacBackend, EphemerisProvider, Observer, SkyMapper, DEFAULT_DAY_COUNT,
};

fn main() {
    let latitude = 40.1;
    let longitude = -88.2;

    // standard time; the analemma is sampled on a clock that ignores DST
    let winter = Chicago.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let offset_hours = winter.offset().fix().local_minus_utc() as f64 / 3600.0;
    let observer = Observer::new(latitude, longitude, Some(offset_hours)).unwrap();
    let mapper = SkyMapper::new(observer);

    let provider = EphemerisProvider::approximate(2026);
    let year = provider.calculate_year(12, 0, DEFAULT_DAY_COUNT).unwrap();
    let sky = mapper.map_year(&year.samples);

    println!("=== Noon Analemma ===");
    println!(
        "Location: Urbana, IL ({:.1}°N, {:.1}°W), UTC{:+}",
        latitude, -longitude, offset_hours
    );
    println!();
    println!("{:<12} {:>8} {:>8} {:>9} {:>9}", "Date", "Decl", "EoT", "Altitude", "Azimuth");
    for point in sky.iter().step_by(14) {
        println!(
            "{:<12} {:>7.2}° {:>7.2}m {:>8.2}° {:>8.2}°",
            point.sample.date,
            point.position.declination_deg,
            point.position.equation_of_time_min,
            point.horizon.altitude_deg,
            point.horizon.azimuth_deg
        );
    }

    let (max, min) = year.equation_of_time_extrema().unwrap();
    let (dec_hi, dec_lo) = year.declination_range().unwrap();
    println!();
    println!("--- Year ---");
    println!("Declination range: {:.2}° to {:.2}°", dec_lo, dec_hi);
    println!(
        "Equation of time: {:+.2} min on {}, {:+.2} min on {}",
        max.position.equation_of_time_min, max.sample.date, min.position.equation_of_time_min, min.sample.date
    );

    let solstice = NaiveDate::from_ymd_opt(2026, 6, 21).unwrap();
    let day = &year.samples[solstice.ordinal0() as usize];
    let (noon_h, noon_m) = mapper.solar_noon(day.position.equation_of_time_min);
    println!();
    println!("--- {} ---", solstice);
    println!("Solar noon: {:02}:{:02}", noon_h, noon_m);
    println!("Maximum altitude: {:.2}°", mapper.max_altitude(day.position.declination_deg));
    if let Some(hours) = mapper.day_length_hours(day.position.declination_deg) {
        println!("Day length: {:.2} h", hours);
    }

    let precise = EphemerisProvider::high_precision(2026, Box::new(AlmanacBackend))
        .with_utc_offset(offset_hours)
        .calculate_year(12, 0, DEFAULT_DAY_COUNT)
        .unwrap();
    let cmp = compare_modes(&year, &precise);
    println!();
    println!("--- Approximate vs almanac ---");
    println!(
        "Declination: mean {:.3}°, max {:.3}°",
        cmp.mean_declination_diff, cmp.max_declination_diff
    );
    println!("Equation of time: mean {:.3} min, max {:.3} min", cmp.mean_eot_diff, cmp.max_eot_diff);
}
