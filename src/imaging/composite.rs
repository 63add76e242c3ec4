//! Source-over compositing onto RGBA8 canvases.
//!
//! All arithmetic is integer with round-to-nearest, so an opaque destination
//! stays exactly opaque (alpha 255) whatever is painted over it.

use image::{Rgba, RgbaImage};
use imageproc::rect::Rect;

/// Paint `src` over `dst`, with `src`'s alpha scaled by `coverage` in `[0, 1]`.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let src_a = (src[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u32;
    if src_a == 0 {
        return;
    }
    let dst_a = dst[3] as u32;
    let keep = dst_a * (255 - src_a);
    // Output alpha, scaled by 255.
    let total = src_a * 255 + keep;

    for c in 0..3 {
        let mixed = src[c] as u32 * src_a * 255 + dst[c] as u32 * keep;
        dst[c] = ((mixed + total / 2) / total) as u8;
    }
    dst[3] = ((total + 127) / 255) as u8;
}

/// Paint `color` over every pixel of `rect` that lies on the canvas.
pub(crate) fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let bounds = Rect::at(0, 0).of_size(canvas.width(), canvas.height());
    let Some(clipped) = rect.intersect(bounds) else {
        return;
    };
    for y in clipped.top()..=clipped.bottom() {
        for x in clipped.left()..=clipped.right() {
            blend_over(canvas.get_pixel_mut(x as u32, y as u32), color, 1.0);
        }
    }
}
