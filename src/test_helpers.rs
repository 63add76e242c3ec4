//! Shared test utilities for the prodshot test suite.
//!
//! Synthetic image fixtures (encoded in memory or written to a temp dir) and a
//! pipeline wired to mock services.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_test_png(&tmp.path().join("shoe.png"), 64, 48);
//! write_corrupt_file(&tmp.path().join("broken.jpg"));
//!
//! let pipeline = test_pipeline(MockCaptioner::replying("Walk Tall"));
//! ```

use crate::imaging::FontLibrary;
use crate::pipeline::Pipeline;
use crate::services::tests::{MockCaptioner, MockRemover};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

// =========================================================================
// Fixture rasters
// =========================================================================

/// A deterministic opaque gradient, so stages have something to change.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// PNG bytes of [`gradient`].
pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

// =========================================================================
// Files on disk
// =========================================================================

pub fn write_test_png(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode(width, height, ImageFormat::Png)).unwrap();
}

pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode(width, height, ImageFormat::Jpeg)).unwrap();
}

/// A file that claims to be an image by name but holds no image data.
pub fn write_corrupt_file(path: &Path) {
    std::fs::write(path, b"definitely not an image").unwrap();
}

// =========================================================================
// Fonts
// =========================================================================

/// `fixtures/fonts/`, holding DejaVuSans-Bold.ttf.
pub fn fixture_fonts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/fonts")
}

/// A library that resolves the bundled DejaVu Sans Bold and nothing else.
pub fn dejavu_library() -> FontLibrary {
    FontLibrary::with_dirs(
        vec!["DejaVuSans-Bold.ttf".to_string()],
        vec![fixture_fonts_dir()],
    )
}

// =========================================================================
// Pipelines
// =========================================================================

/// Pipeline backed by mock services and the built-in font.
///
/// No default API key is set; chain `.with_default_api_key(..)` when a test
/// needs captions to run.
pub fn test_pipeline(captioner: MockCaptioner) -> Pipeline<MockRemover, MockCaptioner> {
    Pipeline::new(MockRemover::default(), captioner, FontLibrary::builtin_only())
}
