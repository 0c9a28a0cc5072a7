//! Zip packaging for a finished batch.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::GeotagError;

/// Bundle `files` into an in-memory zip, one deflated entry per file named by
/// its file name.
pub fn package(files: &[PathBuf]) -> Result<Vec<u8>, GeotagError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = entry_name(path)?;
        let bytes = std::fs::read(path).map_err(|e| {
            GeotagError::Packaging(format!("cannot read {}: {e}", path.display()))
        })?;

        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)
            .map_err(|e| GeotagError::Packaging(format!("cannot add {name}: {e}")))?;
        log::debug!("Archived {name} ({} bytes)", bytes.len());
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn entry_name(path: &Path) -> Result<String, GeotagError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| GeotagError::Packaging(format!("{} has no file name", path.display())))
}
