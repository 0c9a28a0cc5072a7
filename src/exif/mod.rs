//! GPS metadata reading and writing.
//!
//! - [`write_gps`]: write GPS latitude/longitude into an image in place
//! - [`read_gps`]: read the GPS position back as decimal degrees
//!
//! The writer routes on [`ImageKind`](crate::intake::ImageKind): JPEG gets its
//! EXIF APP1 segment rebuilt with every other segment kept byte-for-byte,
//! WebP is handled through little_exif's RIFF support.

mod reader;
mod writer;

pub use reader::read_gps;
pub use writer::{GpsTagValues, to_dms, write_gps};

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::intake::ImageKind;
    use little_exif::exif_tag::ExifTag;
    use little_exif::filetype::FileExtension;
    use little_exif::metadata::Metadata;
    use std::path::Path;
    use tempfile::TempDir;

    /// Encode a small gradient as a real JPEG.
    pub(crate) fn jpeg_fixture(path: &Path) {
        let img = image::RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([(x * 16) as u8, (y * 16) as u8, 128])
        });
        img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
    }

    /// Encode a small gradient as a lossless WebP.
    pub(crate) fn webp_fixture(path: &Path) {
        let img = image::RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([128, (x * 16) as u8, (y * 16) as u8])
        });
        img.save_with_format(path, image::ImageFormat::WebP).unwrap();
    }

    #[test]
    fn fixture_has_no_gps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        jpeg_fixture(&path);
        assert_eq!(read_gps(&path).unwrap(), None);
    }

    #[test]
    fn written_gps_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        jpeg_fixture(&path);

        let target = Coordinate::new(-33.8688, 151.2093);
        write_gps(&path, target, ImageKind::Jpeg, false).unwrap();

        let read = read_gps(&path).unwrap().expect("GPS written");
        assert!((read.lat - target.lat).abs() < 1e-6, "{read:?}");
        assert!((read.lon - target.lon).abs() < 1e-6, "{read:?}");
    }

    #[test]
    fn writing_gps_keeps_pixels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        jpeg_fixture(&path);
        let before = image::open(&path).unwrap().to_rgb8();

        write_gps(&path, Coordinate::new(34.05, -118.24), ImageKind::Jpeg, false).unwrap();

        let after = image::open(&path).unwrap().to_rgb8();
        assert_eq!(before.as_raw(), after.as_raw());
    }

    #[test]
    fn rewriting_replaces_previous_gps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        jpeg_fixture(&path);

        write_gps(&path, Coordinate::new(10.0, 20.0), ImageKind::Jpeg, false).unwrap();
        write_gps(&path, Coordinate::new(-10.5, -20.25), ImageKind::Jpeg, false).unwrap();

        let read = read_gps(&path).unwrap().unwrap();
        assert!((read.lat + 10.5).abs() < 1e-6);
        assert!((read.lon + 20.25).abs() < 1e-6);
    }

    #[test]
    fn dry_run_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        jpeg_fixture(&path);
        let before = std::fs::read(&path).unwrap();

        write_gps(&path, Coordinate::new(1.0, 2.0), ImageKind::Jpeg, true).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn webp_gps_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.webp");
        webp_fixture(&path);
        assert_eq!(read_gps(&path).unwrap(), None);

        let target = Coordinate::new(34.05, -118.24);
        write_gps(&path, target, ImageKind::WebP, false).unwrap();

        let read = read_gps(&path).unwrap().expect("GPS written");
        assert!((read.lat - target.lat).abs() < 1e-6, "{read:?}");
        assert!((read.lon - target.lon).abs() < 1e-6, "{read:?}");
        assert_eq!(ImageKind::from_bytes(&std::fs::read(&path).unwrap()), Some(ImageKind::WebP));
    }

    #[test]
    fn webp_pixels_survive_tagging() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.webp");
        webp_fixture(&path);
        let before = image::open(&path).unwrap().to_rgb8();

        write_gps(&path, Coordinate::new(-33.8688, 151.2093), ImageKind::WebP, false).unwrap();

        let after = image::load_from_memory(&std::fs::read(&path).unwrap()).unwrap().to_rgb8();
        assert_eq!(before.as_raw(), after.as_raw());
    }

    #[test]
    fn container_follows_kind_not_extension() {
        let dir = TempDir::new().unwrap();
        let webp_as_jpg = dir.path().join("mislabeled.jpg");
        webp_fixture(&webp_as_jpg);
        let no_ext = dir.path().join("photo");
        jpeg_fixture(&no_ext);

        write_gps(&webp_as_jpg, Coordinate::new(1.5, 2.5), ImageKind::WebP, false).unwrap();
        write_gps(&no_ext, Coordinate::new(-1.5, -2.5), ImageKind::Jpeg, false).unwrap();

        let read = read_gps(&webp_as_jpg).unwrap().unwrap();
        assert!((read.lat - 1.5).abs() < 1e-6 && (read.lon - 2.5).abs() < 1e-6);
        let read = read_gps(&no_ext).unwrap().unwrap();
        assert!((read.lat + 1.5).abs() < 1e-6 && (read.lon + 2.5).abs() < 1e-6);
    }

    #[test]
    fn existing_tags_kept_when_extension_lies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("really_a_jpeg.webp");
        jpeg_fixture(&path);

        let mut bytes = std::fs::read(&path).unwrap();
        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::ImageDescription("harbor at dusk".to_string()));
        metadata.write_to_vec(&mut bytes, FileExtension::JPEG).unwrap();
        std::fs::write(&path, &bytes).unwrap();

        write_gps(&path, Coordinate::new(10.0, 20.0), ImageKind::Jpeg, false).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let metadata = Metadata::new_from_vec(&bytes, FileExtension::JPEG).unwrap();
        let description = metadata
            .get_tag(&ExifTag::ImageDescription(String::new()))
            .next()
            .cloned();
        match description {
            Some(ExifTag::ImageDescription(s)) => assert!(s.starts_with("harbor at dusk")),
            other => panic!("description lost: {other:?}"),
        }
        assert!(read_gps(&path).unwrap().is_some());
    }
}
