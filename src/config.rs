use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::geo::Coordinate;

/// Top-level configuration for the geotagger library.
///
/// Controls the upload limit, which geocoding backend to use, the location
/// used when the current position cannot be determined, and output behavior.
///
/// # Loading
///
/// ```rust,no_run
/// use geotagger::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.max_files = 50;
/// config.geocoding.request_delay_ms = 0;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of images accepted in one batch.
    pub max_files: usize,
    /// Scatter radius in kilometers when none is given on the command line.
    pub default_radius_km: f64,
    /// Geocoding backend settings.
    pub geocoding: GeocodingConfig,
    /// Used when the approximate current location cannot be looked up.
    pub fallback_location: Coordinate,
    /// Output behavior (archive name, dry run).
    pub output: OutputConfig,
}

/// Which geocoder resolves place names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodingProvider {
    /// ArcGIS World GeocodeServer (online).
    #[serde(rename = "arcgis")]
    ArcGis,
    /// Built-in table of well-known cities (offline).
    Builtin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub provider: GeocodingProvider,
    /// ArcGIS `findAddressCandidates` endpoint.
    pub arcgis_url: String,
    /// IP geolocation endpoint returning `{"loc": "lat,lon"}`.
    pub ip_url: String,
    /// Pause between consecutive place-name lookups.
    pub request_delay_ms: u64,
    /// HTTP timeout per request.
    pub timeout_secs: u64,
    /// How long the current location is remembered. Zero disables caching.
    pub location_cache_ttl_secs: u64,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File name of the produced archive.
    pub archive_name: String,
    /// If `true`, compute targets and report them without tagging or packaging.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_files: 25,
            default_radius_km: 0.0,
            geocoding: GeocodingConfig::default(),
            // Los Angeles
            fallback_location: Coordinate::new(34.0522, -118.2437),
            output: OutputConfig::default(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            provider: GeocodingProvider::ArcGis,
            arcgis_url:
                "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates"
                    .to_string(),
            ip_url: "https://ipinfo.io/json".to_string(),
            request_delay_ms: 500,
            timeout_secs: 10,
            location_cache_ttl_secs: 3600,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            archive_name: "geotagged_images.zip".to_string(),
            dry_run: false,
        }
    }
}

impl GeocodingConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn location_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.location_cache_ttl_secs)
    }
}

impl Config {
    /// Resolve the config file path (same directory as the executable).
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
