//! Image stages — pure Rust, built on the `image` crate.
//!
//! | Stage | Crate / function |
//! |---|---|
//! | **Flatten** | per-pixel alpha composite over white |
//! | **Resize** | `DynamicImage::resize_exact` with `Lanczos3` |
//! | **Enhance** | saturation then contrast blend (grayscale / mean-luma reference) |
//! | **Caption** | `ab_glyph` + `imageproc` text, `font8x8` fallback, rounded source-over boxes |
//! | **Encode** | `image` PNG / JPEG / WebP encoders |
//!
//! The module is split into:
//! - **Parameters**: knobs for each stage ([`Quality`], [`Enhancement`], [`CaptionStyle`])
//! - **Calculations**: pure layout math for the caption block
//! - **Text**: font resolution, measurement, greedy wrapping
//! - **Operations** / **Overlay** / **Codec**: the pixel work
//! - **Composite**: exact source-over blending shared by boxes and text

mod calculations;
pub mod codec;
mod composite;
pub mod operations;
pub mod overlay;
mod params;
pub mod text;

pub use calculations::{LinePlacement, caption_font_size, layout_lines};
pub use codec::{encode_raster, save_raster};
pub use operations::{InvalidDimensionError, enhance, flatten, resize};
pub use overlay::{compose_caption, wrap_caption};
pub use params::{CaptionStyle, Enhancement, Quality, WHITE};
pub use text::{FontLibrary, TextExtent, TextMeasure, WrappedLine, wrap_words};
