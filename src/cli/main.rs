use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

use geotagger::geo::{Coordinate, RadiusSampler};
use geotagger::geocode::{CurrentLocationCache, build_geocoder};
use geotagger::intake::{ImageUpload, collect_images};
use geotagger::pipeline::{self, BatchOutcome, LocationRequest, TargetPlan};
use geotagger::{config, exif};

#[derive(Parser, Debug)]
#[command(
    name = "geotagger",
    version,
    about = "Batch GPS geotagger: stamp JPEG/WebP photos with a pinned spot, your current location, or a list of cities"
)]
#[command(group(
    clap::ArgGroup::new("location").args(["pin", "here", "cities", "cities_file"])
))]
struct Cli {
    /// Image files or directories to tag
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Tag around a point, e.g. `--pin 34.05,-118.24`
    #[arg(long, value_name = "LAT,LON", value_parser = parse_pin, allow_hyphen_values = true)]
    pin: Option<(f64, f64)>,

    /// Tag around your approximate current location (IP lookup)
    #[arg(long)]
    here: bool,

    /// Comma- or newline-separated place names, assigned to files in turn
    #[arg(long, value_name = "TEXT")]
    cities: Option<String>,

    /// Read place names from a file, one per line
    #[arg(long = "cities-file", value_name = "FILE")]
    cities_file: Option<PathBuf>,

    /// Scatter radius in kilometers around the pin or current location
    #[arg(short, long, value_name = "KM")]
    radius: Option<f64>,

    /// Where to write the zip archive (default: archive name from config)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Seed the scatter for reproducible results
    #[arg(long)]
    seed: Option<u64>,

    /// Resolve place names from the built-in table only
    #[arg(long)]
    offline: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Compute and show targets without writing any files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display the GPS position stored in each image and exit
    #[arg(long = "show-gps")]
    show_gps: bool,
}

fn parse_pin(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got `{s}`"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude `{lat}`: {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude `{lon}`: {e}"))?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(format!("latitude and longitude must be finite, got `{s}`"));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} is outside [-90, 90]"));
    }
    Ok((lat, lon))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let images = collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --show-gps
    if cli.show_gps {
        for image_path in &images {
            print_gps(image_path)?;
        }
        return Ok(());
    }

    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }

    let radius_km = cli.radius.unwrap_or(config.default_radius_km);
    let request = location_request(&cli, radius_km)?;

    let uploads = images
        .iter()
        .map(|p| ImageUpload::from_path(p))
        .collect::<Result<Vec<_>>>()?;

    log::info!("Found {} image(s) to tag", uploads.len());
    if config.output.dry_run {
        log::info!("DRY RUN: no archive will be written");
    }

    let geocoder = build_geocoder(&config, cli.offline)?;
    let location_cache = CurrentLocationCache::new(config.geocoding.location_cache_ttl());
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut sampler = RadiusSampler::new(rng);

    let (plan, outcome) = pipeline::run_request(
        &uploads,
        &request,
        geocoder.as_ref(),
        &location_cache,
        &config,
        &mut sampler,
    )
    .await?;

    if let Some(center) = plan.center {
        log::info!("Center: {center} (radius {radius_km} km)");
    }
    if !plan.unresolved.is_empty() {
        log::warn!("Could not find: {}", plan.unresolved.join(", "));
    }

    if config.output.dry_run && !cli.json {
        print_target_preview(&outcome);
    }

    if let Some(ref archive) = outcome.archive {
        let out_path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.archive_name));
        if outcome.succeeded().count() == 0 {
            log::error!("No files could be tagged; archive not written");
        } else {
            std::fs::write(&out_path, archive)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
            log::info!("Archive written: {}", out_path.display());
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json_report(&plan, &outcome))?);
    }

    // Summary
    let success = outcome.succeeded().count();
    let failed = outcome.failed().count();
    log::info!(
        "Done: {success} tagged, {failed} failed out of {} images",
        outcome.files.len()
    );

    Ok(())
}

fn location_request(cli: &Cli, radius_km: f64) -> Result<LocationRequest> {
    if let Some((lat, lon)) = cli.pin {
        return Ok(LocationRequest::Pin { lat, lon, radius_km });
    }
    if cli.here {
        return Ok(LocationRequest::CurrentLocation { radius_km });
    }
    if let Some(ref text) = cli.cities {
        return Ok(LocationRequest::Cities { text: text.clone() });
    }
    if let Some(ref file) = cli.cities_file {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        return Ok(LocationRequest::Cities { text });
    }
    anyhow::bail!("No location given. Use --pin LAT,LON, --here, or --cities.")
}

fn json_report(plan: &TargetPlan, outcome: &BatchOutcome) -> serde_json::Value {
    let files: Vec<serde_json::Value> = outcome
        .files
        .iter()
        .map(|f| {
            serde_json::json!({
                "name": f.name,
                "latitude": f.target.lat,
                "longitude": f.target.lon,
                "tagged": f.error.is_none(),
                "error": f.error.as_ref().map(|e| e.to_string()),
            })
        })
        .collect();

    serde_json::json!({
        "center": plan.center,
        "unresolved": plan.unresolved,
        "files": files,
    })
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the planned target for each file in dry-run mode.
fn print_target_preview(outcome: &BatchOutcome) {
    println!();
    println!("  {BOLD}Planned GPS:{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    for file in &outcome.files {
        match file.error {
            None => print_row_colored(&file.name, &file.target.to_string(), GREEN),
            Some(ref e) => print_row_colored(&file.name, &e.to_string(), RED),
        }
    }
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    println!();
}

/// Print the GPS position stored in a file.
fn print_gps(path: &Path) -> Result<()> {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    match exif::read_gps(path)? {
        Some(Coordinate { lat, lon }) => {
            print_row("GPSLatitude", &format!("{lat:.6}"));
            print_row("GPSLongitude", &format!("{lon:.6}"));
        }
        None => println!("  {DIM}(no GPS data){RESET}"),
    }
    Ok(())
}

fn print_row(tag: &str, val: &str) {
    println!("  {:<22} : {val}", tag);
}

fn print_row_colored(tag: &str, val: &str, color: &str) {
    println!("  {color}{:<22}{RESET} : {val}", tag);
}
