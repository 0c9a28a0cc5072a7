//! Offline geocoder over a small table of well-known places.

use anyhow::Result;

use super::Geocoder;
use crate::geo::Coordinate;

struct BuiltinPlace {
    names: &'static [&'static str], // canonical + aliases, lowercase
    lat: f64,
    lon: f64,
}

const BUILTIN_PLACES: &[BuiltinPlace] = &[
    BuiltinPlace { names: &["monterey park"], lat: 34.0625, lon: -118.1228 },
    BuiltinPlace { names: &["arcadia"], lat: 34.1397, lon: -118.0353 },
    BuiltinPlace { names: &["pasadena"], lat: 34.1478, lon: -118.1445 },
    BuiltinPlace { names: &["los angeles", "la"], lat: 34.0522, lon: -118.2437 },
    BuiltinPlace { names: &["san francisco", "sf"], lat: 37.7749, lon: -122.4194 },
    BuiltinPlace { names: &["san diego"], lat: 32.7157, lon: -117.1611 },
    BuiltinPlace { names: &["seattle"], lat: 47.6062, lon: -122.3321 },
    BuiltinPlace { names: &["new york", "nyc"], lat: 40.7128, lon: -74.0060 },
    BuiltinPlace { names: &["chicago"], lat: 41.8781, lon: -87.6298 },
    BuiltinPlace { names: &["toronto"], lat: 43.6532, lon: -79.3832 },
    BuiltinPlace { names: &["mexico city", "cdmx"], lat: 19.4326, lon: -99.1332 },
    BuiltinPlace { names: &["london"], lat: 51.5074, lon: -0.1278 },
    BuiltinPlace { names: &["paris"], lat: 48.8566, lon: 2.3522 },
    BuiltinPlace { names: &["berlin"], lat: 52.5200, lon: 13.4050 },
    BuiltinPlace { names: &["stockholm"], lat: 59.3293, lon: 18.0686 },
    BuiltinPlace { names: &["istanbul"], lat: 41.0082, lon: 28.9784 },
    BuiltinPlace { names: &["cairo"], lat: 30.0444, lon: 31.2357 },
    BuiltinPlace { names: &["nairobi"], lat: -1.2921, lon: 36.8219 },
    BuiltinPlace { names: &["dubai"], lat: 25.2048, lon: 55.2708 },
    BuiltinPlace { names: &["mumbai", "bombay"], lat: 19.0760, lon: 72.8777 },
    BuiltinPlace { names: &["tokyo"], lat: 35.6762, lon: 139.6503 },
    BuiltinPlace { names: &["seoul"], lat: 37.5665, lon: 126.9780 },
    BuiltinPlace { names: &["singapore"], lat: 1.3521, lon: 103.8198 },
    BuiltinPlace { names: &["sydney"], lat: -33.8688, lon: 151.2093 },
    BuiltinPlace { names: &["sao paulo", "são paulo"], lat: -23.5505, lon: -46.6333 },
    BuiltinPlace { names: &["buenos aires"], lat: -34.6037, lon: -58.3816 },
];

/// Geocoder that answers from a built-in place table without touching the network.
///
/// A query matches a place when it equals one of its names, or starts with
/// one followed by a space (so `"Pasadena CA"` finds Pasadena). Matching is
/// case-insensitive.
#[derive(Debug, Default)]
pub struct BuiltinGeocoder;

impl BuiltinGeocoder {
    pub fn new() -> Self {
        Self
    }

    fn lookup(query: &str) -> Option<Coordinate> {
        let q = query.trim().to_lowercase();

        let exact = BUILTIN_PLACES
            .iter()
            .find(|p| p.names.iter().any(|n| *n == q));

        // Longest prefix wins so "san diego ca" never lands on a shorter alias
        let place = exact.or_else(|| {
            BUILTIN_PLACES
                .iter()
                .flat_map(|p| p.names.iter().map(move |n| (p, *n)))
                .filter(|(_, n)| {
                    q.strip_prefix(n)
                        .is_some_and(|rest| rest.starts_with(' '))
                })
                .max_by_key(|(_, n)| n.len())
                .map(|(p, _)| p)
        })?;

        Some(Coordinate::new(place.lat, place.lon))
    }
}

#[async_trait::async_trait]
impl Geocoder for BuiltinGeocoder {
    fn name(&self) -> &str {
        "Built-in"
    }

    async fn resolve(&self, name: &str) -> Result<Option<Coordinate>> {
        Ok(Self::lookup(name))
    }

    async fn current_location(&self) -> Result<Coordinate> {
        anyhow::bail!("IP location is unavailable offline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_case_insensitive() {
        assert_eq!(
            BuiltinGeocoder::lookup("Pasadena"),
            Some(Coordinate::new(34.1478, -118.1445))
        );
        assert_eq!(
            BuiltinGeocoder::lookup("  TOKYO "),
            Some(Coordinate::new(35.6762, 139.6503))
        );
    }

    #[test]
    fn trailing_region_is_ignored() {
        assert_eq!(
            BuiltinGeocoder::lookup("Monterey Park CA"),
            Some(Coordinate::new(34.0625, -118.1228))
        );
        assert_eq!(
            BuiltinGeocoder::lookup("Arcadia CA"),
            Some(Coordinate::new(34.1397, -118.0353))
        );
    }

    #[test]
    fn alias_matches() {
        assert_eq!(BuiltinGeocoder::lookup("NYC"), BuiltinGeocoder::lookup("New York"));
    }

    #[test]
    fn prefix_must_end_on_word_boundary() {
        // "la" is an alias for Los Angeles but must not swallow "lagos"
        assert_eq!(BuiltinGeocoder::lookup("lagos"), None);
        assert_eq!(
            BuiltinGeocoder::lookup("la county"),
            Some(Coordinate::new(34.0522, -118.2437))
        );
    }

    #[test]
    fn unknown_place_is_none() {
        assert_eq!(BuiltinGeocoder::lookup("Atlantis"), None);
    }

    #[tokio::test]
    async fn current_location_is_unavailable() {
        assert!(BuiltinGeocoder::new().current_location().await.is_err());
    }
}
