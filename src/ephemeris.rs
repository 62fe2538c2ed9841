//! Solar declination and equation of time for a year of dates.
//!
//! Two interchangeable strategies sit behind [`EphemerisProvider`]: the
//! closed-form approximation in [`crate::angles`], and any
//! [`EphemerisBackend`] for higher precision. A backend that cannot serve a
//! date degrades that sample to the approximation instead of failing the run;
//! the result carries a degraded flag so callers can report it.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::angles::{self, deg_to_rad, normalize_angle, normalize_delta, rad_to_deg};
use crate::error::{AnalemmaError, Result};
use crate::types::{DateSample, EphemerisSample, PositionSource, SolarPosition};

pub const DEFAULT_DAY_COUNT: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EphemerisMode {
    Approximate,
    HighPrecision,
}

impl FromStr for EphemerisMode {
    type Err = AnalemmaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approximate" => Ok(Self::Approximate),
            "high-precision" | "high_precision" => Ok(Self::HighPrecision),
            other => Err(AnalemmaError::configuration(format!(
                "unknown ephemeris mode '{other}' (expected 'approximate' or 'high-precision')"
            ))),
        }
    }
}

impl fmt::Display for EphemerisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approximate => write!(f, "approximate"),
            Self::HighPrecision => write!(f, "high-precision"),
        }
    }
}

/// A source of solar coordinates more precise than the closed form.
pub trait EphemerisBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Called once when a provider is built; an error puts the provider in
    /// degraded mode.
    fn check_available(&self) -> Result<()> {
        Ok(())
    }

    /// Declination and equation of time at a universal-time instant.
    fn solar_position(&self, ut: &NaiveDateTime) -> Result<SolarPosition>;
}

/// Closed-form position for a day of year.
pub fn approximate_position(day_of_year: i32) -> SolarPosition {
    SolarPosition {
        declination_deg: angles::solar_declination(day_of_year),
        equation_of_time_min: angles::equation_of_time(day_of_year),
    }
}

/// Low-precision solar theory (mean longitude, equation of centre, apparent
/// longitude). Good to about 0.01 degree in declination between 1900 and 2100.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlmanacBackend;

const J2000: (i32, u32, u32) = (2000, 1, 1);
const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;
const VALID_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

impl AlmanacBackend {
    fn julian_centuries(ut: &NaiveDateTime) -> Option<f64> {
        let epoch = NaiveDate::from_ymd_opt(J2000.0, J2000.1, J2000.2)?.and_hms_opt(12, 0, 0)?;
        let seconds = (*ut - epoch).num_milliseconds() as f64 / 1000.0;
        Some(seconds / 86_400.0 / DAYS_PER_JULIAN_CENTURY)
    }
}

impl EphemerisBackend for AlmanacBackend {
    fn name(&self) -> &str {
        "almanac"
    }

    fn solar_position(&self, ut: &NaiveDateTime) -> Result<SolarPosition> {
        if !VALID_YEARS.contains(&ut.year()) {
            return Err(AnalemmaError::high_precision_unavailable(
                self.name(),
                format!("{} outside the 1900-2100 validity range", ut.year()),
            ));
        }
        let t = Self::julian_centuries(ut).ok_or_else(|| {
            AnalemmaError::high_precision_unavailable(self.name(), "epoch construction failed")
        })?;

        let l0 = normalize_angle(280.46646 + 36000.76983 * t + 0.0003032 * t * t);
        let m = deg_to_rad(357.52911 + 35999.05029 * t - 0.0001537 * t * t);
        let c = (1.914602 - 0.004817 * t - 0.000014 * t * t) * m.sin()
            + (0.019993 - 0.000101 * t) * (2.0 * m).sin()
            + 0.000289 * (3.0 * m).sin();

        let omega = deg_to_rad(125.04 - 1934.136 * t);
        let apparent_lon = deg_to_rad(l0 + c - 0.00569 - 0.00478 * omega.sin());

        let eps0_arcsec = 84381.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t * t * t;
        let obliquity = deg_to_rad(eps0_arcsec / 3600.0 + 0.00256 * omega.cos());

        let right_ascension =
            rad_to_deg((obliquity.cos() * apparent_lon.sin()).atan2(apparent_lon.cos()));
        let declination = rad_to_deg((obliquity.sin() * apparent_lon.sin()).asin());

        let eot_deg = normalize_delta(l0 - 0.0057183 - right_ascension);
        Ok(SolarPosition {
            declination_deg: declination,
            equation_of_time_min: eot_deg * angles::MINUTES_PER_DEGREE,
        })
    }
}

enum Strategy {
    Approximate,
    HighPrecision(Box<dyn EphemerisBackend>),
}

pub struct EphemerisProvider {
    strategy: Strategy,
    requested: EphemerisMode,
    year: i32,
    utc_offset_hours: f64,
    degraded: bool,
}

impl fmt::Debug for EphemerisProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.strategy {
            Strategy::Approximate => "closed-form",
            Strategy::HighPrecision(backend) => backend.name(),
        };
        f.debug_struct("EphemerisProvider")
            .field("requested", &self.requested)
            .field("backend", &backend)
            .field("year", &self.year)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl EphemerisProvider {
    pub fn approximate(year: i32) -> Self {
        Self {
            strategy: Strategy::Approximate,
            requested: EphemerisMode::Approximate,
            year,
            utc_offset_hours: 0.0,
            degraded: false,
        }
    }

    /// Falls back to the approximation, flagged as degraded, when the backend
    /// reports itself unavailable.
    pub fn high_precision(year: i32, backend: Box<dyn EphemerisBackend>) -> Self {
        match backend.check_available() {
            Ok(()) => Self {
                strategy: Strategy::HighPrecision(backend),
                requested: EphemerisMode::HighPrecision,
                year,
                utc_offset_hours: 0.0,
                degraded: false,
            },
            Err(e) => {
                warn!("{e}; continuing with the approximate ephemeris");
                Self::degraded(year)
            }
        }
    }

    pub fn from_mode(mode: EphemerisMode, year: i32, backend: Option<Box<dyn EphemerisBackend>>) -> Self {
        match (mode, backend) {
            (EphemerisMode::Approximate, _) => Self::approximate(year),
            (EphemerisMode::HighPrecision, Some(backend)) => Self::high_precision(year, backend),
            (EphemerisMode::HighPrecision, None) => {
                warn!("high-precision mode requested without a backend; continuing with the approximate ephemeris");
                Self::degraded(year)
            }
        }
    }

    /// An unknown mode string is a configuration error.
    pub fn from_mode_str(mode: &str, year: i32, backend: Option<Box<dyn EphemerisBackend>>) -> Result<Self> {
        Ok(Self::from_mode(mode.parse()?, year, backend))
    }

    fn degraded(year: i32) -> Self {
        Self {
            strategy: Strategy::Approximate,
            requested: EphemerisMode::HighPrecision,
            year,
            utc_offset_hours: 0.0,
            degraded: true,
        }
    }

    /// Offset of the sample clock from UT; backends are queried in UT.
    pub fn with_utc_offset(mut self, hours: f64) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    pub fn requested_mode(&self) -> EphemerisMode {
        self.requested
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// True when high precision was requested but the backend was unusable.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn position(&self, sample: &DateSample) -> EphemerisSample {
        let (position, source) = match &self.strategy {
            Strategy::Approximate if self.degraded => {
                (approximate_position(sample.day_of_year), PositionSource::Fallback)
            }
            Strategy::Approximate => (approximate_position(sample.day_of_year), PositionSource::Approximate),
            Strategy::HighPrecision(backend) => {
                let ut = sample.datetime()
                    - Duration::milliseconds((self.utc_offset_hours * 3_600_000.0).round() as i64);
                match backend.solar_position(&ut) {
                    Ok(position) => (position, PositionSource::HighPrecision),
                    Err(e) => {
                        debug!("{}: {e}", sample.date);
                        (approximate_position(sample.day_of_year), PositionSource::Fallback)
                    }
                }
            }
        };
        EphemerisSample {
            sample: *sample,
            position,
            source,
        }
    }

    /// One sample per calendar day from January 1st at the given clock time,
    /// in chronological order.
    pub fn calculate_year(&self, hour: u32, minute: u32, day_count: u32) -> Result<YearEphemeris> {
        let start = NaiveDate::from_ymd_opt(self.year, 1, 1).ok_or_else(|| {
            AnalemmaError::configuration(format!("year {} is not representable", self.year))
        })?;
        DateSample::new(start, hour, minute)?;

        let samples = (0..day_count as i64)
            .map(|offset| {
                let date = start.checked_add_signed(Duration::days(offset)).ok_or_else(|| {
                    AnalemmaError::configuration(format!(
                        "{day_count} days from {start} run past the last representable date"
                    ))
                })?;
                DateSample::new(date, hour, minute).map(|s| self.position(&s))
            })
            .collect::<Result<Vec<_>>>()?;

        let fallbacks = samples
            .iter()
            .filter(|s| s.source == PositionSource::Fallback)
            .count();
        if fallbacks > 0 && !self.degraded {
            warn!(
                "high-precision backend failed for {fallbacks} of {} days; those use the approximation",
                samples.len()
            );
        }
        info!(
            "computed {} days of {} ephemeris for {} at {hour:02}:{minute:02}",
            samples.len(),
            self.requested,
            self.year
        );

        Ok(YearEphemeris {
            mode: self.requested,
            degraded: self.degraded || fallbacks > 0,
            samples,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearEphemeris {
    pub mode: EphemerisMode,
    pub degraded: bool,
    pub samples: Vec<EphemerisSample>,
}

impl YearEphemeris {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// (max, min) declination over the year.
    pub fn declination_range(&self) -> Option<(f64, f64)> {
        let mut values = self.samples.iter().map(|s| s.position.declination_deg);
        let first = values.next()?;
        Some(values.fold((first, first), |(hi, lo), v| (hi.max(v), lo.min(v))))
    }

    /// Sample with the largest equation of time and the one with the smallest.
    pub fn equation_of_time_extrema(&self) -> Option<(EphemerisSample, EphemerisSample)> {
        let by_eot = |a: &&EphemerisSample, b: &&EphemerisSample| {
            a.position
                .equation_of_time_min
                .total_cmp(&b.position.equation_of_time_min)
        };
        let max = self.samples.iter().max_by(by_eot)?;
        let min = self.samples.iter().min_by(by_eot)?;
        Some((*max, *min))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeComparison {
    pub samples: usize,
    pub mean_declination_diff: f64,
    pub max_declination_diff: f64,
    pub mean_eot_diff: f64,
    pub max_eot_diff: f64,
}

/// Absolute differences between two runs, matched day by day.
pub fn compare_modes(approximate: &YearEphemeris, precise: &YearEphemeris) -> ModeComparison {
    let diffs: Vec<(f64, f64)> = approximate
        .samples
        .iter()
        .zip(&precise.samples)
        .map(|(a, p)| {
            (
                (a.position.declination_deg - p.position.declination_deg).abs(),
                (a.position.equation_of_time_min - p.position.equation_of_time_min).abs(),
            )
        })
        .collect();
    let n = diffs.len();
    if n == 0 {
        return ModeComparison {
            samples: 0,
            mean_declination_diff: 0.0,
            max_declination_diff: 0.0,
            mean_eot_diff: 0.0,
            max_eot_diff: 0.0,
        };
    }
    let (sum_dec, sum_eot, max_dec, max_eot) = diffs.iter().fold(
        (0.0, 0.0, 0.0_f64, 0.0_f64),
        |(sd, se, md, me), &(d, e)| (sd + d, se + e, md.max(d), me.max(e)),
    );
    ModeComparison {
        samples: n,
        mean_declination_diff: sum_dec / n as f64,
        max_declination_diff: max_dec,
        mean_eot_diff: sum_eot / n as f64,
        max_eot_diff: max_eot,
    }
}
