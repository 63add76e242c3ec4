//! Font resolution, text measurement and greedy word wrapping.
//!
//! ## Fonts
//!
//! [`FontLibrary`] looks up an ordered list of font file names (e.g.
//! `DejaVuSans-Bold.ttf`) among the faces `fontdb` finds in the configured
//! directories, then among the system fonts, and loads the first match. The lookup happens once per library and is
//! cached. When nothing resolves, captions fall back to the built-in 8x8 bitmap
//! font from `font8x8`, scaled to the requested size, so font resolution never
//! fails.
//!
//! ## Wrapping
//!
//! [`wrap_words`] is measurement-agnostic: anything implementing
//! [`TextMeasure`] can drive it, which keeps the algorithm testable with a
//! fixed-width measure.

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use fontdb::{Database, Source};
use super::composite::blend_over;
use image::{ImageBuffer, Luma, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Rendered size of a piece of text, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

pub trait TextMeasure {
    fn measure(&self, text: &str) -> TextExtent;
}

/// One line of wrapped caption text with its measured size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedLine {
    pub text: String,
    pub width: u32,
    pub height: u32,
}

/// Greedy word wrap against a pixel budget.
///
/// Words are appended to the current line one at a time; when the candidate
/// line measures wider than `max_width`, the line as it was before that word
/// is committed and the word starts the next line. A single word wider than
/// the budget gets a line of its own and is never split.
pub fn wrap_words(text: &str, max_width: f32, measure: &impl TextMeasure) -> Vec<WrappedLine> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        current.push(word);
        let candidate = current.join(" ");
        if current.len() > 1 && measure.measure(&candidate).width as f32 > max_width {
            current.pop();
            lines.push(current.join(" "));
            current = vec![word];
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }

    lines
        .into_iter()
        .map(|text| {
            let extent = measure.measure(&text);
            WrappedLine {
                text,
                width: extent.width,
                height: extent.height,
            }
        })
        .collect()
}

/// A font ready to measure and draw at one size.
pub enum CaptionFont<'a> {
    Outline { font: &'a FontVec, scale: PxScale },
    /// `font8x8` glyphs, each source pixel drawn as a `pixel` x `pixel` block.
    Bitmap { pixel: u32 },
}

const BITMAP_CELL: u32 = 8;

impl CaptionFont<'_> {
    pub fn builtin(size: u32) -> Self {
        CaptionFont::Bitmap {
            pixel: (size / BITMAP_CELL).max(1),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, CaptionFont::Bitmap { .. })
    }

    /// Draw `text` with its top-left corner at `(x, y)`. Out-of-bounds parts are clipped.
    pub fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        match self {
            CaptionFont::Outline { font, scale } => {
                draw_outline_text(canvas, x, y, text, font, *scale, color);
            }
            CaptionFont::Bitmap { pixel } => draw_bitmap_text(canvas, x, y, text, *pixel, color),
        }
    }
}

impl TextMeasure for CaptionFont<'_> {
    fn measure(&self, text: &str) -> TextExtent {
        match self {
            CaptionFont::Outline { font, scale } => {
                let (width, height) = text_size(*scale, *font, text);
                TextExtent { width, height }
            }
            CaptionFont::Bitmap { pixel } => TextExtent {
                width: text.chars().count() as u32 * BITMAP_CELL * pixel,
                height: if text.is_empty() {
                    0
                } else {
                    BITMAP_CELL * pixel
                },
            },
        }
    }
}

fn bitmap_glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .unwrap_or([0; 8])
}

/// Rasterize glyph coverage into a float mask around the text, then blend
/// `color` through it.
fn draw_outline_text(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    text: &str,
    font: &FontVec,
    scale: PxScale,
    color: Rgba<u8>,
) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    let (text_w, text_h) = text_size(scale, font, text);
    // Glyphs may overhang the measured box by their bearings.
    let margin = scale.y.ceil() as u32;
    let mut mask: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::new(text_w + 2 * margin, text_h + 2 * margin);
    draw_text_mut(&mut mask, Luma([1.0]), margin as i32, margin as i32, scale, font, text);

    let (origin_x, origin_y) = (x - margin as i32, y - margin as i32);
    for (mx, my, coverage) in mask.enumerate_pixels() {
        let (px, py) = (origin_x + mx as i32, origin_y + my as i32);
        if coverage[0] > 0.0 && (0..w).contains(&px) && (0..h).contains(&py) {
            blend_over(canvas.get_pixel_mut(px as u32, py as u32), color, coverage[0]);
        }
    }
}

fn draw_bitmap_text(canvas: &mut RgbaImage, x: i32, y: i32, text: &str, pixel: u32, color: Rgba<u8>) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    let step = pixel as i32;

    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as i32 * BITMAP_CELL as i32 * step;
        for (row, bits) in bitmap_glyph(c).iter().enumerate() {
            for col in 0..BITMAP_CELL as i32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let bx = origin_x + col * step;
                let by = y + row as i32 * step;
                for py in by.max(0)..(by + step).min(h) {
                    for px in bx.max(0)..(bx + step).min(w) {
                        blend_over(canvas.get_pixel_mut(px as u32, py as u32), color, 1.0);
                    }
                }
            }
        }
    }
}

/// Faces whose file is named `name` (case-insensitive), as `(path, face index)`.
fn find_face(db: &Database, name: &str) -> Option<(PathBuf, u32)> {
    db.faces().find_map(|face| {
        let path = match &face.source {
            Source::File(path) | Source::SharedFile(path, _) => path,
            Source::Binary(_) => return None,
        };
        let file_name = path.file_name()?.to_str()?;
        file_name
            .eq_ignore_ascii_case(name)
            .then(|| (path.clone(), face.index))
    })
}

fn load_face(path: &Path, index: u32) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec_and_index(data, index).ok()
}

/// Ordered font candidates plus where to look for them.
///
/// Configured directories are searched (recursively) before the fonts the
/// operating system knows about.
pub struct FontLibrary {
    candidates: Vec<String>,
    dirs: Vec<PathBuf>,
    system_fonts: bool,
    loaded: OnceLock<Option<FontVec>>,
}

impl FontLibrary {
    /// Search `extra_dirs` first, then the system fonts.
    pub fn new(candidates: Vec<String>, extra_dirs: Vec<PathBuf>) -> Self {
        Self {
            system_fonts: true,
            ..Self::with_dirs(candidates, extra_dirs)
        }
    }

    /// Search only `dirs`.
    pub fn with_dirs(candidates: Vec<String>, dirs: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            dirs,
            system_fonts: false,
            loaded: OnceLock::new(),
        }
    }

    /// A library that always yields the built-in bitmap font.
    pub fn builtin_only() -> Self {
        Self::with_dirs(Vec::new(), Vec::new())
    }

    fn databases(&self) -> Vec<Database> {
        let mut configured = Database::new();
        for dir in &self.dirs {
            configured.load_fonts_dir(dir);
        }
        let mut databases = vec![configured];
        if self.system_fonts {
            let mut system = Database::new();
            system.load_system_fonts();
            databases.push(system);
        }
        databases
    }

    fn outline(&self) -> Option<&FontVec> {
        self.loaded
            .get_or_init(|| {
                if self.candidates.is_empty() {
                    return None;
                }
                let databases = self.databases();
                self.candidates.iter().find_map(|name| {
                    let (path, index) = databases.iter().find_map(|db| find_face(db, name))?;
                    let font = load_face(&path, index);
                    match &font {
                        Some(_) => debug!(font = %path.display(), "caption font resolved"),
                        None => debug!(font = %path.display(), "font file did not load"),
                    }
                    font
                })
            })
            .as_ref()
    }

    /// The first resolvable candidate at `size` pixels, or the built-in font.
    pub fn font(&self, size: u32) -> CaptionFont<'_> {
        match self.outline() {
            Some(font) => CaptionFont::Outline {
                font,
                scale: PxScale::from(size as f32),
            },
            None => CaptionFont::builtin(size),
        }
    }
}
