use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the image-batch library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Unsupported image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// EXIF blob could not be read or embedded
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Watermark font could not be loaded
    #[error("Font error: {0}")]
    Font(String),
}

impl From<img_parts::Error> for Error {
    fn from(err: img_parts::Error) -> Self {
        Error::Metadata(err.to_string())
    }
}

impl From<tiff::TiffError> for Error {
    fn from(err: tiff::TiffError) -> Self {
        Error::UnsupportedFormat(err.to_string())
    }
}
