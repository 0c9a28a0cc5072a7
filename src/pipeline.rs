use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::archive;
use crate::assign::{self, PlacementMode, parse_place_names};
use crate::config::Config;
use crate::error::GeotagError;
use crate::exif::write_gps;
use crate::geo::{Coordinate, RadiusSampler, UniformSource, normalize_longitude};
use crate::geocode::{CurrentLocationCache, Geocoder, resolve_names};
use crate::intake::{ImageKind, ImageUpload, validate_uploads};

/// Where the user wants the batch placed.
#[derive(Debug, Clone)]
pub enum LocationRequest {
    /// A clicked/typed point. The longitude is normalized before use, so raw
    /// values from a panned map (e.g. 200°) are accepted.
    Pin { lat: f64, lon: f64, radius_km: f64 },
    /// Around the approximate current location (IP lookup, cached).
    CurrentLocation { radius_km: f64 },
    /// Free-form list of place names separated by commas or newlines.
    Cities { text: String },
}

/// Targets chosen for a batch, with what is worth reporting about them.
#[derive(Debug, Clone)]
pub struct TargetPlan {
    /// One coordinate per upload, by position.
    pub targets: Vec<Coordinate>,
    /// The scatter center for pin and current-location requests.
    pub center: Option<Coordinate>,
    /// Place names that could not be resolved (city requests only).
    pub unresolved: Vec<String>,
}

/// Per-file result of a batch, in upload order.
#[derive(Debug)]
pub struct FileReport {
    /// Name the file carries inside the archive.
    pub name: String,
    pub target: Coordinate,
    pub error: Option<GeotagError>,
}

/// The result of tagging a batch.
///
/// # Example
///
/// ```rust,no_run
/// # use geotagger::pipeline::process_batch;
/// # use geotagger::intake::ImageUpload;
/// # use geotagger::geo::Coordinate;
/// # fn example(uploads: Vec<ImageUpload>) -> Result<(), geotagger::GeotagError> {
/// let targets = vec![Coordinate::new(34.05, -118.24); uploads.len()];
/// let outcome = process_batch(&uploads, &targets, false)?;
///
/// for file in outcome.failed() {
///     eprintln!("{}: {:?}", file.name, file.error);
/// }
/// if let Some(zip) = outcome.archive {
///     std::fs::write("geotagged_images.zip", zip)?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BatchOutcome {
    /// Zip bytes holding every successfully tagged file. `None` on a dry run.
    pub archive: Option<Vec<u8>>,
    pub files: Vec<FileReport>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.error.is_none())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.error.is_some())
    }
}

/// Turn a location request into one target per file.
///
/// City requests are geocoded here (each distinct name once); a request whose
/// names all fail to resolve returns [`GeotagError::Resolution`] and nothing
/// downstream should run.
pub async fn plan_targets<R: UniformSource>(
    file_count: usize,
    request: &LocationRequest,
    geocoder: &dyn Geocoder,
    location_cache: &CurrentLocationCache,
    config: &Config,
    sampler: &mut RadiusSampler<R>,
) -> Result<TargetPlan, GeotagError> {
    let (mode, center) = match request {
        LocationRequest::Pin { lat, lon, radius_km } => {
            if !lat.is_finite() || !lon.is_finite() {
                return Err(GeotagError::Validation(format!(
                    "Pin location must be a finite latitude/longitude, got ({lat}, {lon})"
                )));
            }
            let center = Coordinate::new(*lat, normalize_longitude(*lon));
            (
                PlacementMode::Pin {
                    center,
                    radius_km: *radius_km,
                },
                Some(center),
            )
        }
        LocationRequest::CurrentLocation { radius_km } => {
            let center = location_cache
                .get_or_fetch(geocoder, config.fallback_location)
                .await;
            (
                PlacementMode::Pin {
                    center,
                    radius_km: *radius_km,
                },
                Some(center),
            )
        }
        LocationRequest::Cities { text } => {
            let names = parse_place_names(text)?;
            log::info!("Finding coordinates via {}...", geocoder.name());
            let resolved =
                resolve_names(geocoder, &names, config.geocoding.request_delay()).await;
            (PlacementMode::CityList { names, resolved }, None)
        }
    };

    let targets = assign::assign(file_count, &mode, sampler)?;

    let unresolved = match &mode {
        PlacementMode::CityList { resolved, .. } => {
            let ready: Vec<_> = resolved.resolved().map(|(n, _)| n).collect();
            log::info!("Ready to tag locations: {}", ready.join(", "));
            resolved.unresolved().map(str::to_string).collect()
        }
        PlacementMode::Pin { .. } => Vec::new(),
    };

    for (i, t) in targets.iter().enumerate() {
        if !t.is_in_range() {
            log::warn!("Target #{} ({t:?}) is outside valid GPS ranges; writing as-is", i + 1);
        }
    }

    Ok(TargetPlan {
        targets,
        center,
        unresolved,
    })
}

/// Tag every upload with its target and package the successes.
///
/// Uploads are staged in a temporary directory that is removed on every exit
/// path. A failure to tag one file is recorded in its [`FileReport`] and the
/// file is left out of the archive; the rest of the batch continues.
pub fn process_batch(
    uploads: &[ImageUpload],
    targets: &[Coordinate],
    dry_run: bool,
) -> Result<BatchOutcome, GeotagError> {
    if uploads.len() != targets.len() {
        return Err(GeotagError::Validation(format!(
            "{} targets for {} files",
            targets.len(),
            uploads.len()
        )));
    }

    let work_dir = TempDir::new()?;
    let mut used_names = HashSet::new();
    let mut files = Vec::with_capacity(uploads.len());
    let mut tagged_paths = Vec::new();
    let total = uploads.len();

    for (i, (upload, target)) in uploads.iter().zip(targets).enumerate() {
        let name = unique_file_name(&upload.name, &mut used_names);
        log::info!("[{}/{}] Tagging: {name} → {target}", i + 1, total);

        let path = work_dir.path().join(&name);
        std::fs::write(&path, &upload.bytes)?;

        let error = match tag_file(&path, *target, dry_run) {
            Ok(()) => {
                tagged_paths.push(path);
                None
            }
            Err(e) => {
                let err = GeotagError::Tagging {
                    file: name.clone(),
                    message: format!("{e:#}"),
                };
                log::error!("  {err}");
                Some(err)
            }
        };

        files.push(FileReport {
            name,
            target: *target,
            error,
        });
    }

    let archive = if dry_run {
        None
    } else {
        Some(archive::package(&tagged_paths)?)
    };

    Ok(BatchOutcome { archive, files })
}

/// Validate, plan and tag in one call.
pub async fn run_request<R: UniformSource>(
    uploads: &[ImageUpload],
    request: &LocationRequest,
    geocoder: &dyn Geocoder,
    location_cache: &CurrentLocationCache,
    config: &Config,
    sampler: &mut RadiusSampler<R>,
) -> Result<(TargetPlan, BatchOutcome), GeotagError> {
    validate_uploads(uploads, config.max_files)?;
    let plan = plan_targets(
        uploads.len(),
        request,
        geocoder,
        location_cache,
        config,
        sampler,
    )
    .await?;
    let outcome = process_batch(uploads, &plan.targets, config.output.dry_run)?;
    Ok((plan, outcome))
}

fn tag_file(path: &Path, target: Coordinate, dry_run: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)?;
    let kind = ImageKind::from_bytes(&bytes)
        .or_else(|| ImageKind::from_path(path))
        .ok_or_else(|| anyhow::anyhow!("unsupported image format"))?;
    write_gps(path, target, kind, dry_run)
}

/// Reduce an upload name to a bare file name that has not been used yet in
/// this batch, adding `-1`, `-2`, … before the extension on collisions.
fn unique_file_name(raw: &str, used: &mut HashSet<String>) -> String {
    let base = Path::new(raw)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "image".to_string());

    let mut candidate = base.clone();
    let mut n = 1;
    while !used.insert(candidate.to_lowercase()) {
        let p = PathBuf::from(&base);
        let stem = p.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        candidate = match p.extension() {
            Some(ext) => format!("{stem}-{n}.{}", ext.to_string_lossy()),
            None => format!("{stem}-{n}"),
        };
        n += 1;
    }
    candidate
}
