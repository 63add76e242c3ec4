//! Serialization of finished rasters.
//!
//! | Format | Encoder | Pixel layout written |
//! |---|---|---|
//! | PNG | `image::codecs::png` | RGB8 or RGBA8 |
//! | JPEG | `image::codecs::jpeg` at the configured [`Quality`] | RGB8 (flattened onto white) |
//! | WebP | `image::codecs::webp` (lossless) | RGB8 or RGBA8 |

use super::operations::flatten;
use super::params::{Quality, WHITE};
use crate::format::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageResult};
use std::io::Cursor;
use std::path::Path;

/// Normalize pixel layout to what `format` can store.
fn prepare(raster: &DynamicImage, format: OutputFormat) -> DynamicImage {
    if !format.supports_alpha() {
        flatten(raster, WHITE)
    } else if raster.color().has_alpha() {
        DynamicImage::ImageRgba8(raster.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(raster.to_rgb8())
    }
}

/// Encode a raster to bytes in `format`.
pub fn encode_raster(
    raster: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> ImageResult<Vec<u8>> {
    let prepared = prepare(raster, format);
    let mut buf = Cursor::new(Vec::new());
    match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value());
            prepared.write_with_encoder(encoder)?;
        }
        OutputFormat::Png | OutputFormat::WebP => {
            prepared.write_to(&mut buf, format.image_format())?;
        }
    }
    Ok(buf.into_inner())
}

/// Encode and write a raster to `path`.
pub fn save_raster(
    raster: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: Quality,
) -> ImageResult<()> {
    let bytes = encode_raster(raster, format, quality)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
