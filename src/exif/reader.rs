use anyhow::{Context, Result};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;
use nom_exif::*;
use std::path::Path;

use super::writer::file_extension;
use crate::geo::Coordinate;
use crate::intake::ImageKind;

/// Read the GPS position stored in an image, if any.
///
/// The format is sniffed from the content. JPEG goes through nom-exif;
/// WebP (which nom-exif does not parse) through little_exif's RIFF reader.
/// Returns `Ok(None)` when the file has no EXIF block or no GPS data.
pub fn read_gps(path: &Path) -> Result<Option<Coordinate>> {
    let bytes = std::fs::read(path).context("Failed to open image file")?;
    match ImageKind::from_bytes(&bytes) {
        Some(ImageKind::Jpeg) => read_gps_nom_exif(path),
        Some(kind @ ImageKind::WebP) => Ok(read_gps_little_exif(&bytes, kind)),
        None => anyhow::bail!("Unsupported image format: {}", path.display()),
    }
}

fn read_gps_nom_exif(path: &Path) -> Result<Option<Coordinate>> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(None);
        }
    };

    let gps = match iter.parse_gps_info() {
        Ok(Some(gps)) => gps,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::debug!("Unreadable GPS block in {}: {e}", path.display());
            return Ok(None);
        }
    };

    Ok(Some(Coordinate::new(
        latlng_to_decimal(&gps.latitude, gps.latitude_ref),
        latlng_to_decimal(&gps.longitude, gps.longitude_ref),
    )))
}

fn read_gps_little_exif(bytes: &Vec<u8>, kind: ImageKind) -> Option<Coordinate> {
    let metadata = match Metadata::new_from_vec(bytes, file_extension(kind)) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("No EXIF data found: {e}");
            return None;
        }
    };

    let lat_ref = ref_char(&metadata, ExifTag::GPSLatitudeRef(String::new()))?;
    let lon_ref = ref_char(&metadata, ExifTag::GPSLongitudeRef(String::new()))?;
    let lat = match metadata.get_tag(&ExifTag::GPSLatitude(Vec::new())).next()? {
        ExifTag::GPSLatitude(r) => rationals_to_decimal(r, lat_ref)?,
        _ => return None,
    };
    let lon = match metadata.get_tag(&ExifTag::GPSLongitude(Vec::new())).next()? {
        ExifTag::GPSLongitude(r) => rationals_to_decimal(r, lon_ref)?,
        _ => return None,
    };
    Some(Coordinate::new(lat, lon))
}

fn ref_char(metadata: &Metadata, tag: ExifTag) -> Option<char> {
    match metadata.get_tag(&tag).next()? {
        ExifTag::GPSLatitudeRef(s) | ExifTag::GPSLongitudeRef(s) => s.chars().next(),
        _ => None,
    }
}

fn rationals_to_decimal(r: &[uR64], reference: char) -> Option<f64> {
    let [d, m, s] = r else {
        return None;
    };
    let value = |x: &uR64| x.nominator as f64 / x.denominator as f64;
    Some(apply_ref(value(d) + value(m) / 60.0 + value(s) / 3600.0, reference))
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    apply_ref(degrees + minutes / 60.0 + seconds / 3600.0, reference)
}

fn apply_ref(coord: f64, reference: char) -> f64 {
    if reference == 'S' || reference == 'W' {
        -coord
    } else {
        coord
    }
}
