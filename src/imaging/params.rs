//! Parameter types for image operations.
//!
//! These structs describe *what* a stage does, not *how*. Keeping the knobs in
//! one place lets the layout math in [`calculations`](super::calculations) and
//! the pixel work in [`operations`](super::operations) and
//! [`overlay`](super::overlay) stay free of magic numbers.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Enhancement`] — Saturation and contrast multipliers for the enhance stage.
//! - [`CaptionStyle`] — Geometry and colors of the caption overlay.

use image::{Rgb, Rgba};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Tonal enhancement multipliers.
///
/// `1.0` leaves the channel untouched; values above one push pixels away from
/// the neutral reference (grayscale for saturation, mean luma for contrast).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enhancement {
    pub saturation: f32,
    pub contrast: f32,
}

impl Default for Enhancement {
    /// +20% saturation, then +10% contrast.
    fn default() -> Self {
        Self {
            saturation: 1.2,
            contrast: 1.1,
        }
    }
}

/// Layout and colors of the caption overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    /// Font size is `image height / font_divisor`.
    pub font_divisor: u32,
    /// Fraction of the image width a line may occupy before wrapping.
    pub wrap_ratio: f32,
    /// Vertical gap between stacked lines, in pixels.
    pub line_spacing: u32,
    /// Gap between the bottom of the text block and the bottom edge.
    pub bottom_margin: u32,
    /// Backing box extends this far beyond each line's bounds.
    pub box_padding: u32,
    pub box_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_divisor: 20,
            wrap_ratio: 0.9,
            line_spacing: 5,
            bottom_margin: 40,
            box_padding: 10,
            box_color: Rgba([0, 0, 0, 128]),
            text_color: Rgba([255, 255, 255, 255]),
        }
    }
}

/// Backing color used when flattening transparency for opaque formats.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
