//! Image source adapter.
//!
//! Opens an image from a path or an in-memory byte buffer into a
//! [`DynamicImage`]. The container format is sniffed from the content, so a
//! file with a misleading extension still decodes if its bytes are valid.

use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Image file extensions picked up by batch runs (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a decodable image ({origin}): {source}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
}

/// Where an image comes from.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

impl ImageSource<'_> {
    fn origin(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("{} bytes in memory", bytes.len()),
        }
    }

    /// Decode the source into a raster.
    pub fn load(&self) -> Result<DynamicImage, LoadError> {
        let decoded = match self {
            ImageSource::Path(path) => {
                let reader = ImageReader::open(path)
                    .and_then(|r| r.with_guessed_format())
                    .map_err(|source| LoadError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?;
                reader.decode()
            }
            ImageSource::Bytes(bytes) => {
                let reader = ImageReader::new(Cursor::new(*bytes))
                    .with_guessed_format()
                    .map_err(|source| LoadError::Io {
                        path: PathBuf::from("<memory>"),
                        source,
                    })?;
                reader.decode()
            }
        };
        decoded.map_err(|source| LoadError::Decode {
            origin: self.origin(),
            source,
        })
    }
}

impl<'a> From<&'a Path> for ImageSource<'a> {
    fn from(path: &'a Path) -> Self {
        ImageSource::Path(path)
    }
}

impl<'a> From<&'a [u8]> for ImageSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        ImageSource::Bytes(bytes)
    }
}

/// Whether `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
