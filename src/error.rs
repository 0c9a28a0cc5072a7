use thiserror::Error;

/// Errors surfaced by a geotagging request.
///
/// Only [`GeotagError::Validation`] and [`GeotagError::Resolution`] stop a
/// request before any file is touched. [`GeotagError::Tagging`] is reported
/// per file and never aborts the batch.
#[derive(Debug, Error)]
pub enum GeotagError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Resolution(String),

    #[error("failed to tag {file}: {message}")]
    Tagging { file: String, message: String },

    #[error("failed to build archive: {0}")]
    Packaging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for GeotagError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Packaging(err.to_string())
    }
}
