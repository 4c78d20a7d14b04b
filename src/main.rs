use anyhow::{Context, Result, bail};
use clap::Parser;
use geo::Centroid;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use footprint::config::Config;
use footprint::{Point, ResolveError, Resolver};

/// Exit status when the point resolved but no building was found near it
const EXIT_NOT_FOUND: u8 = 2;

/// Resolve the building footprint and street address under a map point
///
/// Examples:
///   # Building and address near Tverskaya Street, Moscow
///   footprint --lat 55.7579 --lon 37.6136
///
///   # Geometry only, wider search, pretty output
///   footprint --lat 59.9398 --lon 30.3146 --radius 60 --no-address --pretty
///
///   # Use a config file
///   footprint --config my-settings.toml --lat 55.75 --lon 37.62
#[derive(Parser, Debug)]
#[command(name = "footprint")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches footprint.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Latitude of the point
    #[arg(long, allow_hyphen_values = true, value_parser = parse_latitude)]
    lat: f64,

    /// Longitude of the point
    #[arg(long, allow_hyphen_values = true, value_parser = parse_longitude)]
    lon: f64,

    /// Search radius in meters (overrides the config file)
    #[arg(short = 'r', long)]
    radius: Option<u32>,

    /// Skip reverse geocoding
    #[arg(long)]
    no_address: bool,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_in_range(s, 90.0)
}

fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_in_range(s, 180.0)
}

fn parse_in_range(s: &str, limit: f64) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !(-limit..=limit).contains(&value) {
        return Err(format!("must be between -{} and {}", limit, limit));
    }
    Ok(value)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = if let Some(ref config_path) = args.config {
        if !config_path.exists() {
            bail!("Config file not found: {:?}", config_path);
        }
        Config::from_path(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };
    let mut config = config.with_env_overrides();
    if let Some(radius) = args.radius {
        config.overpass.radius_m = radius;
    }

    debug!(
        "Configuration: radius {}m, {} Overpass mirror(s), yandex {}, nominatim {}",
        config.overpass.radius_m,
        config.overpass.urls.len(),
        if config.yandex.enabled { "on" } else { "off" },
        if config.nominatim.enabled { "on" } else { "off" }
    );

    let mut resolver = Resolver::from_config(&config).context("Failed to set up resolver")?;
    if args.no_address {
        resolver = resolver.without_address_lookup();
    }

    let point = Point::new(args.lat, args.lon);
    let spinner = (!args.verbose).then(|| create_spinner("Resolving building..."));
    let start = Instant::now();
    let result = resolver.resolve(point);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let resolution = match result {
        Ok(resolution) => resolution,
        Err(e @ ResolveError::GeodataUnavailable(_)) => {
            return Err(e).context("Failed to resolve building geometry");
        }
        Err(e) => return Err(e.into()),
    };
    info!("Resolved in {:.1}s", start.elapsed().as_secs_f32());

    let json = if args.pretty {
        serde_json::to_string_pretty(&resolution)?
    } else {
        serde_json::to_string(&resolution)?
    };
    println!("{}", json);

    match &resolution.geometry {
        Some(geometry) => {
            if let Some(centroid) = geometry.to_geo().centroid() {
                info!(
                    "{} footprint centered at ({:.6}, {:.6})",
                    geometry.type_name(),
                    centroid.y(),
                    centroid.x()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("Building geometry not found for the specified point");
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
