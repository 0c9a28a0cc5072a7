use anyhow::{Context, Result};
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;
use std::path::Path;

use crate::geo::Coordinate;
use crate::intake::ImageKind;

/// Denominator for the seconds rational (1/10000″ ≈ 3 mm).
const SECONDS_DENOMINATOR: u32 = 10_000;

/// GPS tag version 2.2.0.0.
const GPS_VERSION: [u8; 4] = [2, 2, 0, 0];

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

/// Sign-magnitude GPS value as stored in EXIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsTagValues {
    pub lat_ref: char,
    pub lat_dms: (u32, u32, u32),
    pub lon_ref: char,
    pub lon_dms: (u32, u32, u32),
}

impl GpsTagValues {
    pub fn from_coordinate(coord: Coordinate) -> Self {
        Self {
            lat_ref: if coord.lat >= 0.0 { 'N' } else { 'S' },
            lat_dms: to_dms(coord.lat.abs()),
            lon_ref: if coord.lon >= 0.0 { 'E' } else { 'W' },
            lon_dms: to_dms(coord.lon.abs()),
        }
    }
}

/// Split an absolute decimal-degree value into whole degrees, whole minutes
/// and seconds scaled by [`SECONDS_DENOMINATOR`].
///
/// Seconds are rounded, carrying into minutes and degrees when they round up
/// to a full 60.
pub fn to_dms(value: f64) -> (u32, u32, u32) {
    let total = (value.abs() * 3600.0 * SECONDS_DENOMINATOR as f64).round() as u64;
    let per_minute = 60 * SECONDS_DENOMINATOR as u64;
    let per_degree = 60 * per_minute;

    let degrees = total / per_degree;
    let minutes = (total % per_degree) / per_minute;
    let seconds = total % per_minute;
    (degrees as u32, minutes as u32, seconds as u32)
}

/// Degrees and minutes as whole rationals, seconds over [`SECONDS_DENOMINATOR`].
fn dms_rationals((degrees, minutes, seconds_num): (u32, u32, u32)) -> Vec<uR64> {
    vec![
        uR64 { nominator: degrees, denominator: 1 },
        uR64 { nominator: minutes, denominator: 1 },
        uR64 { nominator: seconds_num, denominator: SECONDS_DENOMINATOR },
    ]
}

/// Build the GPS IFD tags for a coordinate.
fn gps_tags(coord: Coordinate) -> Result<Vec<ExifTag>> {
    if !coord.lat.is_finite() || !coord.lon.is_finite() {
        anyhow::bail!("Cannot write non-finite GPS position {coord:?}");
    }
    let values = GpsTagValues::from_coordinate(coord);

    Ok(vec![
        ExifTag::GPSVersionID(GPS_VERSION.to_vec()),
        ExifTag::GPSLatitudeRef(values.lat_ref.to_string()),
        ExifTag::GPSLatitude(dms_rationals(values.lat_dms)),
        ExifTag::GPSLongitudeRef(values.lon_ref.to_string()),
        ExifTag::GPSLongitude(dms_rationals(values.lon_dms)),
    ])
}

pub(super) fn file_extension(kind: ImageKind) -> FileExtension {
    match kind {
        ImageKind::Jpeg => FileExtension::JPEG,
        ImageKind::WebP => FileExtension::WEBP,
    }
}

/// Parse the EXIF already present in `bytes`, read as `kind`.
/// Returns None if it can't parse (instead of losing data).
fn load_existing_metadata(bytes: &Vec<u8>, kind: ImageKind) -> Option<Metadata> {
    // little_exif panics on some malformed blocks; the default hook still prints them
    let result = std::panic::catch_unwind(|| Metadata::new_from_vec(bytes, file_extension(kind)));

    match result {
        Ok(Ok(m)) => {
            let count = (&m).into_iter().count();
            if count == 0 {
                log::debug!("little_exif loaded empty metadata");
                None
            } else {
                log::debug!("little_exif loaded {count} existing EXIF tags");
                Some(m)
            }
        }
        Ok(Err(e)) => {
            log::debug!("little_exif could not parse EXIF: {e}");
            None
        }
        Err(_) => {
            log::debug!("little_exif panicked parsing EXIF");
            None
        }
    }
}

/// Write GPS latitude/longitude tags into an image in place.
///
/// Pixel data is never decoded or re-encoded. For JPEG only the EXIF APP1
/// segment changes; existing EXIF tags are kept when little_exif can parse
/// them. The container is chosen by `kind`, never by the file extension.
/// With `dry_run` the tags are built (so invalid input still errors) but the
/// file is left untouched.
pub fn write_gps(path: &Path, coord: Coordinate, kind: ImageKind, dry_run: bool) -> Result<()> {
    let tags = gps_tags(coord)?;
    log::debug!("  GPS: {coord}");

    if dry_run {
        return Ok(());
    }

    match kind {
        ImageKind::Jpeg => write_tags_to_jpeg(path, &tags),
        ImageKind::WebP => write_tags_to_webp(path, &tags),
    }
}

/// Write new EXIF tags into a JPEG file, preserving all other segments.
fn write_tags_to_jpeg(path: &Path, new_tags: &[ExifTag]) -> Result<()> {
    let file_bytes = std::fs::read(path).context("Failed to read image file")?;
    let existing = load_existing_metadata(&file_bytes, ImageKind::Jpeg);

    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("Failed to parse JPEG: {e}"))?;

    // Remember where the EXIF segment was originally positioned
    let orig_exif_pos = find_exif_segment_pos(&jpeg);

    let mut metadata = match existing {
        Some(metadata) => {
            log::debug!("little_exif parsed existing EXIF, using merge strategy");
            metadata
        }
        None => {
            if jpeg.exif().is_some_and(|e| !e.is_empty()) {
                log::warn!(
                    "Existing EXIF in {} could not be parsed; replacing it with GPS-only EXIF",
                    path.display()
                );
            }
            Metadata::new()
        }
    };
    for tag in new_tags {
        metadata.set_tag(tag.clone());
    }

    let exif_bytes = metadata
        .as_u8_vec(FileExtension::JPEG)
        .context("Failed to encode EXIF")?;
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        anyhow::bail!("little_exif produced an empty EXIF block");
    }
    jpeg.set_exif(Some(Bytes::from(exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec())));

    // set_exif() inserts at position 3, which may be after XMP APP1.
    // Move the EXIF segment back to its original position so EXIF comes
    // before XMP (required for many EXIF parsers).
    if let Some(new_pos) = find_exif_segment_pos(&jpeg) {
        let target_pos = orig_exif_pos.unwrap_or(1).min(new_pos); // default: right after APP0
        if new_pos != target_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }

    let output = jpeg.encoder().bytes();
    std::fs::write(path, &output).context("Failed to write JPEG file")?;

    Ok(())
}

/// Write tags through little_exif's RIFF handling (WebP).
fn write_tags_to_webp(path: &Path, new_tags: &[ExifTag]) -> Result<()> {
    let mut file_bytes = std::fs::read(path).context("Failed to read image file")?;

    let mut metadata = load_existing_metadata(&file_bytes, ImageKind::WebP).unwrap_or_default();
    for tag in new_tags {
        metadata.set_tag(tag.clone());
    }
    metadata
        .write_to_vec(&mut file_bytes, FileExtension::WEBP)
        .with_context(|| format!("Failed to write EXIF to {}", path.display()))?;

    std::fs::write(path, &file_bytes).context("Failed to write WebP file")
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == 0xE1 && s.contents().starts_with(EXIF_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_of_whole_degrees() {
        assert_eq!(to_dms(34.0), (34, 0, 0));
        assert_eq!(to_dms(0.0), (0, 0, 0));
    }

    #[test]
    fn dms_of_fractional_value() {
        // 34.05° = 34° 3′ 0″
        assert_eq!(to_dms(34.05), (34, 3, 0));
        // 118.24° = 118° 14′ 24″
        assert_eq!(to_dms(118.24), (118, 14, 24 * SECONDS_DENOMINATOR));
    }

    #[test]
    fn dms_rounds_with_carry() {
        assert_eq!(to_dms(10.999_999_999), (11, 0, 0));
        assert_eq!(to_dms(10.5 - 1e-10), (10, 30, 0));
    }

    #[test]
    fn dms_ignores_sign() {
        assert_eq!(to_dms(-33.8688), to_dms(33.8688));
    }

    #[test]
    fn hemisphere_letters_follow_sign() {
        let v = GpsTagValues::from_coordinate(Coordinate::new(34.05, -118.24));
        assert_eq!((v.lat_ref, v.lon_ref), ('N', 'W'));
        assert_eq!(v.lat_dms, (34, 3, 0));
        assert_eq!(v.lon_dms, (118, 14, 240_000));

        let v = GpsTagValues::from_coordinate(Coordinate::new(-33.8688, 151.2093));
        assert_eq!((v.lat_ref, v.lon_ref), ('S', 'E'));
    }

    #[test]
    fn zero_is_north_and_east() {
        let v = GpsTagValues::from_coordinate(Coordinate::new(0.0, 0.0));
        assert_eq!((v.lat_ref, v.lon_ref), ('N', 'E'));
    }

    #[test]
    fn rationals_carry_seconds_denominator() {
        let r = dms_rationals((34, 3, 12_345));
        assert_eq!(r.len(), 3);
        assert_eq!(r[0], uR64 { nominator: 34, denominator: 1 });
        assert_eq!(r[1], uR64 { nominator: 3, denominator: 1 });
        assert_eq!(r[2], uR64 { nominator: 12_345, denominator: SECONDS_DENOMINATOR });
    }

    #[test]
    fn gps_tags_are_named_gps_variants() {
        let tags = gps_tags(Coordinate::new(34.05, -118.24)).unwrap();
        assert_eq!(tags.len(), 5);
        assert!(tags.contains(&ExifTag::GPSLatitudeRef("N".to_string())));
        assert!(tags.contains(&ExifTag::GPSLongitudeRef("W".to_string())));
        assert!(tags.contains(&ExifTag::GPSLatitude(dms_rationals((34, 3, 0)))));
    }

    #[test]
    fn gps_tags_land_in_gps_ifd() {
        let mut metadata = Metadata::new();
        for tag in gps_tags(Coordinate::new(34.05, -118.24)).unwrap() {
            metadata.set_tag(tag);
        }
        let lat_ref = metadata
            .get_tag(&ExifTag::GPSLatitudeRef(String::new()))
            .next()
            .cloned();
        assert_eq!(lat_ref, Some(ExifTag::GPSLatitudeRef("N".to_string())));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        assert!(gps_tags(Coordinate::new(f64::NAN, 0.0)).is_err());
        assert!(gps_tags(Coordinate::new(0.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn dry_run_does_not_touch_missing_file() {
        let path = Path::new("/nonexistent/photo.jpg");
        assert!(write_gps(path, Coordinate::new(1.0, 2.0), ImageKind::Jpeg, true).is_ok());
    }

    #[test]
    fn writing_to_non_jpeg_content_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        assert!(write_gps(&path, Coordinate::new(1.0, 2.0), ImageKind::Jpeg, false).is_err());
    }
}
