//! Caption compositing.
//!
//! Wraps the caption to the image width, stacks the lines near the bottom edge
//! and draws each one over a translucent backing box. Per line, the box is
//! blended in first and the text drawn on top, in line order. The raster is
//! promoted to RGBA for the operation; its dimensions never change.

use super::calculations::{caption_font_size, layout_lines, wrap_width};
use super::composite::fill_rect;
use super::params::CaptionStyle;
use super::text::{FontLibrary, WrappedLine, wrap_words};
use image::DynamicImage;
use imageproc::rect::Rect;
use tracing::debug;

/// Wrap `caption` for an image of `(width, height)` using the font `fonts` picks for that height.
pub fn wrap_caption(
    (width, height): (u32, u32),
    caption: &str,
    fonts: &FontLibrary,
    style: &CaptionStyle,
) -> Vec<WrappedLine> {
    let font = fonts.font(caption_font_size(height, style));
    wrap_words(caption, wrap_width(width, style), &font)
}

/// Composite `caption` onto a copy of `image`.
pub fn compose_caption(
    image: &DynamicImage,
    caption: &str,
    fonts: &FontLibrary,
    style: &CaptionStyle,
) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    let dims = canvas.dimensions();
    let font = fonts.font(caption_font_size(dims.1, style));
    let lines = wrap_words(caption, wrap_width(dims.0, style), &font);
    let placements = layout_lines(dims, &lines, style);

    debug!(
        lines = lines.len(),
        builtin_font = font.is_builtin(),
        "compositing caption"
    );

    for (line, place) in lines.iter().zip(&placements) {
        let (bx, by, bw, bh) = place.backing_box(style.box_padding);
        fill_rect(&mut canvas, Rect::at(bx, by).of_size(bw, bh), style.box_color);
        font.draw(&mut canvas, place.x, place.y, &line.text, style.text_color);
    }

    DynamicImage::ImageRgba8(canvas)
}
