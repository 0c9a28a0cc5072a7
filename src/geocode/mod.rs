mod arcgis;
mod builtin;
pub mod cache;

pub use arcgis::ArcGisGeocoder;
pub use builtin::BuiltinGeocoder;
pub use cache::CurrentLocationCache;

use anyhow::Result;
use std::time::Duration;

use crate::assign::{NameResolutions, unique_names};
use crate::config::{Config, GeocodingProvider};
use crate::geo::Coordinate;

/// Trait for place-name and current-location lookups.
///
/// The crate ships two implementations: [`ArcGisGeocoder`] (online) and
/// [`BuiltinGeocoder`] (offline table of well-known cities).
///
/// # Example
///
/// ```rust,no_run
/// use geotagger::geocode::{ArcGisGeocoder, Geocoder};
/// use geotagger::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let geocoder = ArcGisGeocoder::from_config(&Config::default().geocoding)?;
/// if let Some(coord) = geocoder.resolve("Pasadena CA").await? {
///     println!("Pasadena is at {coord}");
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// The display name of this geocoder (e.g., "ArcGIS").
    fn name(&self) -> &str;
    /// Look up a place name. `Ok(None)` means the service answered but
    /// found nothing; `Err` means the lookup itself failed.
    async fn resolve(&self, name: &str) -> Result<Option<Coordinate>>;
    /// Approximate location of the machine running the tool.
    async fn current_location(&self) -> Result<Coordinate>;
}

/// Build the geocoder selected by the configuration.
///
/// `offline` forces the built-in table regardless of the configured provider.
pub fn build_geocoder(config: &Config, offline: bool) -> Result<Box<dyn Geocoder>> {
    if offline {
        return Ok(Box::new(BuiltinGeocoder::new()));
    }
    match config.geocoding.provider {
        GeocodingProvider::ArcGis => Ok(Box::new(ArcGisGeocoder::from_config(&config.geocoding)?)),
        GeocodingProvider::Builtin => Ok(Box::new(BuiltinGeocoder::new())),
    }
}

/// Resolve each distinct name once, in order of first appearance.
///
/// Failed lookups are recorded as unresolved and never retried. `delay` is
/// slept between consecutive requests to stay polite to public services.
pub async fn resolve_names(
    geocoder: &dyn Geocoder,
    names: &[String],
    delay: Duration,
) -> NameResolutions {
    let mut resolutions = NameResolutions::new();

    for (i, name) in unique_names(names).into_iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let coord = match geocoder.resolve(&name).await {
            Ok(Some(coord)) => {
                log::debug!("  {name} → {coord}");
                Some(coord)
            }
            Ok(None) => {
                log::warn!("Could not find: {name}");
                None
            }
            Err(e) => {
                log::warn!("Error looking up {name} via {}: {e}", geocoder.name());
                None
            }
        };
        resolutions.insert(name, coord);
    }

    resolutions
}
