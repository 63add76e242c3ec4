//! Whole-raster stages: flatten, resize, enhance.
//!
//! Every function takes the current raster by reference and returns a new one.
//! None of them keep a reference to their input.

use super::params::Enhancement;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid target dimensions {width}x{height}: width and height must be positive")]
pub struct InvalidDimensionError {
    pub width: u32,
    pub height: u32,
}

/// Composite a raster over an opaque `backing` color and drop its alpha channel.
///
/// Each pixel's own alpha is the paste mask. A raster without alpha is treated
/// as fully opaque and only converted to RGB.
pub fn flatten(image: &DynamicImage, backing: Rgb<u8>) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }

    let rgba = image.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y);
        let alpha = px[3] as u32;
        let mix = |fg: u8, bg: u8| -> u8 {
            ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([
            mix(px[0], backing[0]),
            mix(px[1], backing[1]),
            mix(px[2], backing[2]),
        ])
    });
    DynamicImage::ImageRgb8(flat)
}

/// Rescale to exactly `width` x `height` with Lanczos3 resampling.
///
/// The aspect ratio is not preserved.
pub fn resize(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<DynamicImage, InvalidDimensionError> {
    if width == 0 || height == 0 {
        return Err(InvalidDimensionError { width, height });
    }
    Ok(image.resize_exact(width, height, FilterType::Lanczos3))
}

/// Boost saturation, then contrast.
///
/// Saturation blends each pixel away from its grayscale value; contrast blends
/// away from the mean luma of the whole (already saturated) image. Alpha is
/// left untouched, and an opaque input stays opaque.
pub fn enhance(image: &DynamicImage, params: &Enhancement) -> DynamicImage {
    let had_alpha = image.color().has_alpha();
    let mut buf = image.to_rgba8();

    adjust_saturation(&mut buf, params.saturation);
    adjust_contrast(&mut buf, params.contrast);

    if had_alpha {
        DynamicImage::ImageRgba8(buf)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(buf).to_rgb8())
    }
}

/// ITU-R 601-2 luma.
fn luma(r: u8, g: u8, b: u8) -> f32 {
    (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0
}

fn blend_channel(reference: f32, value: u8, factor: f32) -> u8 {
    (reference + factor * (value as f32 - reference))
        .round()
        .clamp(0.0, 255.0) as u8
}

fn adjust_saturation(buf: &mut RgbaImage, factor: f32) {
    for px in buf.pixels_mut() {
        let gray = luma(px[0], px[1], px[2]).round();
        for c in 0..3 {
            px[c] = blend_channel(gray, px[c], factor);
        }
    }
}

fn adjust_contrast(buf: &mut RgbaImage, factor: f32) {
    let count = (buf.width() as u64 * buf.height() as u64).max(1);
    let total: f64 = buf
        .pixels()
        .map(|px| luma(px[0], px[1], px[2]).round() as f64)
        .sum();
    let mean = (total / count as f64 + 0.5).floor() as f32;

    for px in buf.pixels_mut() {
        for c in 0..3 {
            px[c] = blend_channel(mean, px[c], factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    #[test]
    fn flatten_removes_alpha_and_transparency() {
        let mut rgba = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 128]));

        let flat = flatten(&DynamicImage::ImageRgba8(rgba), Rgb([255, 255, 255]));

        assert!(!flat.color().has_alpha());
        assert_eq!(flat.dimensions(), (4, 4));
        let rgb = flat.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([127, 127, 127]));
        assert_eq!(rgb.get_pixel(2, 2), &Rgb([10, 20, 30]));
    }

    #[test]
    fn flatten_opaque_input_is_plain_conversion() {
        let rgb = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        let flat = flatten(&DynamicImage::ImageRgb8(rgb.clone()), Rgb([255, 255, 255]));
        assert_eq!(flat.to_rgb8(), rgb);
    }

    #[test]
    fn resize_to_explicit_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 200));
        let resized = resize(&img, 800, 800).unwrap();
        assert_eq!(resized.dimensions(), (800, 800));
    }

    #[test]
    fn resize_ignores_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
        let resized = resize(&img, 50, 120).unwrap();
        assert_eq!(resized.dimensions(), (50, 120));
    }

    #[test]
    fn resize_rejects_zero_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 200));
        assert_eq!(
            resize(&img, 0, 100).unwrap_err(),
            InvalidDimensionError {
                width: 0,
                height: 100
            }
        );
        assert!(resize(&img, 100, 0).is_err());
    }

    #[test]
    fn enhance_leaves_gray_unsaturated() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([128, 128, 128])));
        let out = enhance(&img, &Enhancement::default());
        assert_eq!(out.to_rgb8().get_pixel(0, 0), &Rgb([128, 128, 128]));
    }

    #[test]
    fn enhance_spreads_values_away_from_mean() {
        let mut rgb = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        rgb.put_pixel(1, 0, Rgb([200, 200, 200]));
        let out = enhance(&DynamicImage::ImageRgb8(rgb), &Enhancement::default()).to_rgb8();

        // mean luma 150 → 150 ± 1.1 * 50
        assert_eq!(out.get_pixel(0, 0), &Rgb([95, 95, 95]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([205, 205, 205]));
    }

    #[test]
    fn enhance_boosts_saturation_of_colored_pixels() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([200, 100, 100])));
        let params = Enhancement {
            saturation: 1.2,
            contrast: 1.0,
        };
        let out = enhance(&img, &params).to_rgb8();
        let px = out.get_pixel(0, 0);
        assert!(px[0] > 200);
        assert!(px[1] < 100);
    }

    #[test]
    fn enhance_preserves_alpha_mode_and_values() {
        let rgba = RgbaImage::from_pixel(3, 3, Rgba([50, 60, 70, 42]));
        let out = enhance(&DynamicImage::ImageRgba8(rgba), &Enhancement::default());
        assert!(out.color().has_alpha());
        assert_eq!(out.to_rgba8().get_pixel(1, 1)[3], 42);

        let opaque = DynamicImage::ImageRgb8(RgbImage::new(3, 3));
        assert!(!enhance(&opaque, &Enhancement::default()).color().has_alpha());
    }
}
