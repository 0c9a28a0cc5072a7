//! Memo for the approximate current location.
//!
//! Holds a single value with a TTL. Only successful lookups are cached: when
//! the geocoder fails the caller's fallback is returned and the next call
//! tries again.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::Geocoder;
use crate::geo::Coordinate;

pub struct CurrentLocationCache {
    ttl: Duration,
    slot: Mutex<Option<(Coordinate, Instant)>>,
}

impl CurrentLocationCache {
    /// A `ttl` of zero disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached location, if one is present and still fresh.
    pub fn cached(&self) -> Option<Coordinate> {
        let slot = *self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(coord, _)| coord)
    }

    /// Return the cached location or ask `geocoder`, substituting
    /// `fallback` when the lookup fails.
    pub async fn get_or_fetch(&self, geocoder: &dyn Geocoder, fallback: Coordinate) -> Coordinate {
        if let Some(coord) = self.cached() {
            log::debug!("Current location from cache: {coord}");
            return coord;
        }

        // The lock is not held across the lookup
        match geocoder.current_location().await {
            Ok(coord) => {
                log::info!("Approximate location via {}: {coord}", geocoder.name());
                if !self.ttl.is_zero() {
                    *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some((coord, Instant::now()));
                }
                coord
            }
            Err(e) => {
                log::warn!("Could not determine current location ({e}); using {fallback}");
                fallback
            }
        }
    }

    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
