//! # geotagger
//!
//! Batch GPS geotagger. Stamp a set of JPEG/WebP photos with GPS coordinates
//! and get them back as a zip archive, pixels untouched.
//!
//! Three ways to place a batch:
//!
//! - **Pin**: every photo lands at one point, or scattered uniformly inside a
//!   radius around it
//! - **Current location**: same as a pin, centered on an IP-based lookup
//! - **City list**: place names are geocoded once each and handed out to the
//!   photos in turn
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geotagger::config::Config;
//! use geotagger::geo::RadiusSampler;
//! use geotagger::geocode::{CurrentLocationCache, build_geocoder};
//! use geotagger::intake::{ImageUpload, collect_images};
//! use geotagger::pipeline::{LocationRequest, run_request};
//! use rand::SeedableRng;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let geocoder = build_geocoder(&config, false)?;
//!     let cache = CurrentLocationCache::new(config.geocoding.location_cache_ttl());
//!     let mut sampler = RadiusSampler::new(rand::rngs::StdRng::seed_from_u64(7));
//!
//!     let uploads = collect_images(&[PathBuf::from("./photos")])
//!         .iter()
//!         .map(|p| ImageUpload::from_path(p))
//!         .collect::<anyhow::Result<Vec<_>>>()?;
//!
//!     let request = LocationRequest::Cities { text: "Pasadena, Arcadia".into() };
//!     let (plan, outcome) =
//!         run_request(&uploads, &request, geocoder.as_ref(), &cache, &config, &mut sampler).await?;
//!
//!     println!("unresolved: {:?}", plan.unresolved);
//!     if let Some(zip) = outcome.archive {
//!         std::fs::write("geotagged_images.zip", zip)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`geo`]: coordinates, longitude normalization, radius sampling
//! - [`assign`]: place-name parsing and per-file target assignment
//! - [`geocode`]: place-name and current-location lookup
//! - [`intake`]: upload validation and image collection
//! - [`exif`]: GPS EXIF reading and writing
//! - [`archive`]: zip packaging
//! - [`pipeline`]: request planning and batch processing
//! - [`config`]: configuration types and loading/saving

pub mod archive;
pub mod assign;
pub mod config;
pub mod error;
pub mod exif;
pub mod geo;
pub mod geocode;
pub mod intake;
pub mod pipeline;

pub use error::GeotagError;
