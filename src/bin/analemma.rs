//! Command-line front end: year tables, mode comparison, and photo anchoring.
//!
//! Output is JSON on stdout (or `--output`); drawing the path onto the photo is
//! left to other tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use analemma_overlay::{
    compare_modes, load_metadata, load_oriented, locate_image, AlmanacBackend, AnalemmaConfig, AnalemmaError,
    AnchorRequest, CalibrationInput, EphemerisMode, EphemerisProvider, EphemerisSample, ImageAnchor, ImageMetadata,
    Observer, Result, SkyMapper, SkyPoint, SunPixel,
};
use chrono::{Datelike, Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "analemma")]
#[command(about = "Solar analemma calculation and photo overlay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sun position at a fixed clock time for every day of a year
    Calculate(CalculateArgs),

    /// Approximate formulas against the built-in almanac
    Compare(LocationArgs),

    /// Project a year of positions onto a photograph
    Anchor(AnchorArgs),
}

#[derive(Args)]
struct LocationArgs {
    /// JSON run configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// UTC offset in hours (default: round(longitude / 15))
    #[arg(long, allow_negative_numbers = true)]
    timezone: Option<f64>,

    /// Defaults to the current year
    #[arg(long)]
    year: Option<i32>,

    #[arg(long)]
    hour: Option<u32>,

    #[arg(long)]
    minute: Option<u32>,

    /// approximate | high-precision
    #[arg(long)]
    mode: Option<String>,

    /// Number of days from January 1st
    #[arg(long)]
    days: Option<u32>,
}

impl LocationArgs {
    fn resolve(&self) -> Result<AnalemmaConfig> {
        let mut config = match &self.config {
            Some(path) => AnalemmaConfig::from_json_file(path)?,
            None => {
                let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
                    return Err(AnalemmaError::configuration(
                        "--latitude and --longitude are required without --config",
                    ));
                };
                AnalemmaConfig::new(latitude, longitude, Local::now().year())
            }
        };
        if let Some(v) = self.latitude {
            config.latitude = v;
        }
        if let Some(v) = self.longitude {
            config.longitude = v;
        }
        if self.timezone.is_some() {
            config.timezone_offset_hours = self.timezone;
        }
        if let Some(v) = self.year {
            config.year = v;
        }
        if let Some(v) = self.hour {
            config.hour = v;
        }
        if let Some(v) = self.minute {
            config.minute = v;
        }
        if let Some(v) = &self.mode {
            config.mode = v.clone();
        }
        if let Some(v) = self.days {
            config.day_count = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
struct CalculateArgs {
    #[command(flatten)]
    location: LocationArgs,

    /// Include every day's horizon coordinates
    #[arg(long)]
    points: bool,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AnchorArgs {
    /// Directory holding metadata.txt and the photograph
    #[arg(long, conflicts_with_all = ["image", "metadata"])]
    dir: Option<PathBuf>,

    #[arg(long)]
    image: Option<PathBuf>,

    /// KEY=VALUE metadata file (DATETIME, LATITUDE, LONGITUDE, FOCAL_LENGTH_MM, ...)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// JSON run configuration (location, timezone, mode, calibration)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Capture time on the observer's clock, "YYYY-MM-DD HH:MM:SS"
    #[arg(long, value_parser = parse_datetime)]
    datetime: Option<NaiveDateTime>,

    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    timezone: Option<f64>,

    /// Full-frame equivalent focal length in mm
    #[arg(long, conflicts_with = "fov")]
    focal_length: Option<f64>,

    /// Horizontal and vertical field of view in degrees
    #[arg(long, num_args = 2, value_names = ["H", "V"])]
    fov: Option<Vec<f64>>,

    /// Sun pixel used when detection fails
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    sun: Option<Vec<f64>>,

    /// Use --sun as the anchor without running detection
    #[arg(long, requires = "sun")]
    manual: bool,

    /// approximate | high-precision
    #[arg(long)]
    mode: Option<String>,

    /// Also report the points that land inside the photo
    #[arg(long)]
    in_frame: bool,

    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_datetime(value: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, analemma_overlay::config::METADATA_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("{value}: {e}"))
}

fn provider_for(config: &AnalemmaConfig, observer: &Observer) -> Result<EphemerisProvider> {
    let provider = EphemerisProvider::from_mode(config.ephemeris_mode()?, config.year, Some(Box::new(AlmanacBackend)));
    Ok(provider.with_utc_offset(observer.timezone_offset_hours))
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct YearSummary {
    mode: EphemerisMode,
    degraded: bool,
    observer: Observer,
    clock_time: String,
    days: usize,
    declination_range: Option<(f64, f64)>,
    equation_of_time_max: Option<EphemerisSample>,
    equation_of_time_min: Option<EphemerisSample>,
    altitude_range: Option<(f64, f64)>,
    days_below_horizon: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<Vec<SkyPoint>>,
}

fn calculate(args: &CalculateArgs) -> Result<()> {
    let config = args.location.resolve()?;
    let observer = config.observer()?;
    let year = provider_for(&config, &observer)?.calculate_year(config.hour, config.minute, config.day_count)?;
    let sky = SkyMapper::new(observer).map_year(&year.samples);

    let altitude_range = sky.iter().map(|p| p.horizon.altitude_deg).fold(None, |acc, alt| match acc {
        None => Some((alt, alt)),
        Some((lo, hi)) => Some((f64::min(lo, alt), f64::max(hi, alt))),
    });
    let extrema = year.equation_of_time_extrema();
    let summary = YearSummary {
        mode: year.mode,
        degraded: year.degraded,
        observer,
        clock_time: format!("{:02}:{:02}", config.hour, config.minute),
        days: year.len(),
        declination_range: year.declination_range(),
        equation_of_time_max: extrema.map(|(max, _)| max),
        equation_of_time_min: extrema.map(|(_, min)| min),
        altitude_range,
        days_below_horizon: sky.iter().filter(|p| !p.horizon.is_above_horizon()).count(),
        points: args.points.then_some(sky),
    };
    emit(&summary, args.output.as_deref())
}

fn compare(args: &LocationArgs) -> Result<()> {
    let config = args.resolve()?;
    let observer = config.observer()?;
    let approximate = EphemerisProvider::approximate(config.year).calculate_year(
        config.hour,
        config.minute,
        config.day_count,
    )?;
    let precise = EphemerisProvider::high_precision(config.year, Box::new(AlmanacBackend))
        .with_utc_offset(observer.timezone_offset_hours)
        .calculate_year(config.hour, config.minute, config.day_count)?;
    emit(&compare_modes(&approximate, &precise), None)
}

fn anchor(args: &AnchorArgs) -> Result<()> {
    let metadata = match (&args.metadata, &args.dir) {
        (Some(path), _) => load_metadata(path)?,
        (None, Some(dir)) => load_metadata(dir.join("metadata.txt"))?,
        (None, None) => ImageMetadata::default(),
    };
    let config = args.config.as_ref().map(AnalemmaConfig::from_json_file).transpose()?;
    let image_path = match (&args.image, &args.dir) {
        (Some(path), _) => path.clone(),
        (None, Some(dir)) => locate_image(dir, &metadata)?,
        (None, None) => return Err(AnalemmaError::configuration("--image or --dir is required")),
    };

    let missing = |what: &str| AnalemmaError::configuration(format!("no {what} given on the command line or in metadata"));
    let anchor_time = args.datetime.or(metadata.datetime).ok_or_else(|| missing("capture time"))?;
    let latitude = args
        .latitude
        .or(config.as_ref().map(|c| c.latitude))
        .or(metadata.latitude)
        .ok_or_else(|| missing("latitude"))?;
    let longitude = args
        .longitude
        .or(config.as_ref().map(|c| c.longitude))
        .or(metadata.longitude)
        .ok_or_else(|| missing("longitude"))?;
    let timezone = args.timezone.or(config.as_ref().and_then(|c| c.timezone_offset_hours));
    let calibration = match (&args.fov, args.focal_length) {
        (Some(fov), _) => Some(CalibrationInput::FieldOfView {
            h_fov_deg: fov[0],
            v_fov_deg: fov[1],
        }),
        (None, Some(focal)) => Some(CalibrationInput::full_frame(focal)),
        (None, None) => config.as_ref().and_then(|c| c.calibration).or_else(|| metadata.calibration()),
    }
    .ok_or_else(|| missing("focal length or field of view"))?;
    calibration.validate()?;

    let sun_pixel = match (&args.sun, args.manual) {
        (Some(px), true) => SunPixel::Manual(px[0], px[1]),
        (Some(px), false) => SunPixel::DetectOr(px[0], px[1]),
        (None, _) => SunPixel::Detect,
    };
    let mode: EphemerisMode = match &args.mode {
        Some(mode) => mode.parse()?,
        None => config.as_ref().map(|c| c.ephemeris_mode()).transpose()?.unwrap_or(EphemerisMode::Approximate),
    };

    let mut request = AnchorRequest::new(Observer::new(latitude, longitude, timezone)?, anchor_time, calibration);
    request.sun_pixel = sun_pixel;
    if let Some(config) = &config {
        request.day_count = config.day_count;
    }

    let image = load_oriented(&image_path)?;
    info!("{}: {}x{}", image_path.display(), image.width(), image.height());
    let mut anchor = ImageAnchor::new(request);
    if mode == EphemerisMode::HighPrecision {
        anchor = anchor.with_backend(Box::new(AlmanacBackend));
    }
    let mut report = anchor.run(&image)?;
    if args.in_frame {
        report.clip_to_frame();
    }
    emit(&report, args.output.as_deref())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Calculate(args) => calculate(args),
        Commands::Compare(args) => compare(args),
        Commands::Anchor(args) => anchor(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
