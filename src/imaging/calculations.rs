//! Pure layout math for the caption overlay.
//!
//! All functions are side-effect free and work on plain numbers, so the
//! placement rules can be tested without fonts or pixel buffers. Coordinates
//! are signed: a text block taller than the image legitimately starts above the
//! top edge, and a single over-long word starts left of it.

use super::params::CaptionStyle;
use super::text::WrappedLine;

/// Font size for an image of the given height, never below one pixel.
pub fn caption_font_size(image_height: u32, style: &CaptionStyle) -> u32 {
    (image_height / style.font_divisor.max(1)).max(1)
}

/// Widest a wrapped line may be, in pixels.
pub fn wrap_width(image_width: u32, style: &CaptionStyle) -> f32 {
    image_width as f32 * style.wrap_ratio
}

/// Total height of a stacked block: line heights plus spacing between lines.
///
/// No spacing is added after the last line.
pub fn block_height(line_heights: &[u32], style: &CaptionStyle) -> i32 {
    let text: i32 = line_heights.iter().map(|&h| h as i32).sum();
    let gaps = line_heights.len().saturating_sub(1) as i32;
    text + gaps * style.line_spacing as i32
}

/// Y of the top of the block so that it sits `bottom_margin` above the bottom edge.
///
/// Negative when the block is taller than the space available. Not clamped.
pub fn block_top(image_height: u32, block_height: i32, style: &CaptionStyle) -> i32 {
    image_height as i32 - block_height - style.bottom_margin as i32
}

/// X that horizontally centers a line of `line_width` pixels.
pub fn centered_x(image_width: u32, line_width: u32) -> i32 {
    (image_width as i32 - line_width as i32) / 2
}

/// Where one wrapped line lands on the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePlacement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl LinePlacement {
    /// Backing box: the line's bounds grown by `padding` on every side.
    pub fn backing_box(&self, padding: u32) -> (i32, i32, u32, u32) {
        let pad = padding as i32;
        (
            self.x - pad,
            self.y - pad,
            self.width + 2 * padding,
            self.height + 2 * padding,
        )
    }
}

/// Stack `lines` bottom-anchored and centered on an image of `(width, height)`.
pub fn layout_lines(
    (width, height): (u32, u32),
    lines: &[WrappedLine],
    style: &CaptionStyle,
) -> Vec<LinePlacement> {
    let heights: Vec<u32> = lines.iter().map(|l| l.height).collect();
    let mut y = block_top(height, block_height(&heights, style), style);

    lines
        .iter()
        .map(|line| {
            let placement = LinePlacement {
                x: centered_x(width, line.width),
                y,
                width: line.width,
                height: line.height,
            };
            y += line.height as i32 + style.line_spacing as i32;
            placement
        })
        .collect()
}
