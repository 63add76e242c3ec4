//! External services the pipeline calls out to.
//!
//! Two narrow request/response contracts, each behind a trait so the pipeline
//! can be driven by mocks in tests:
//!
//! | Trait | Production impl | Input → output |
//! |---|---|---|
//! | [`BackgroundRemover`] | [`rembg::RembgRemover`] | raster → RGBA raster with transparent background |
//! | [`CaptionService`] | [`gemini::GeminiCaptioner`] | prompt + raster + credential → free text |
//!
//! Both calls are blocking and carry no timeout of their own. Caption text is
//! untrusted and goes through [`sanitize_caption`] before it is rendered.

pub mod gemini;
pub mod rembg;

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use thiserror::Error;

/// Background removal failure.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not encode image for upload: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Service response is not an image: {0}")]
    Decode(#[source] image::ImageError),
}

/// Caption generation failure. Never fatal to the pipeline.
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Caption request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Caption service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed caption response: {0}")]
    MalformedResponse(String),
    #[error("Caption service returned no usable text")]
    EmptyResponse,
    #[error("Could not encode image for caption request: {0}")]
    Encode(#[from] image::ImageError),
}

/// Strips an image's background.
pub trait BackgroundRemover {
    fn remove_background(&self, image: &DynamicImage) -> Result<DynamicImage, ServiceError>;
}

/// Produces a short slogan for an image.
pub trait CaptionService {
    /// Returns the raw, unsanitized response text.
    fn generate(
        &self,
        prompt: &str,
        image: &DynamicImage,
        api_key: &str,
    ) -> Result<String, CaptionError>;
}

/// Appended to every user prompt so the model answers with a bare slogan.
pub const SLOGAN_INSTRUCTION: &str = "Create ONE short, punchy marketing slogan (max 6 words). \
Return ONLY the slogan text. Do not number it. Do not include 'Here is a slogan'. \
Do not use markdown bolding.";

/// The full text sent to the caption service.
pub fn caption_request(prompt: &str) -> String {
    format!("{} {}", prompt.trim(), SLOGAN_INSTRUCTION)
}

const STRIPPED_CHARS: &[char] = &['*', '"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Clean a raw model response for rendering.
///
/// Trims whitespace and removes markdown emphasis and quote characters.
/// An empty result is an [`CaptionError::EmptyResponse`].
pub fn sanitize_caption(raw: &str) -> Result<String, CaptionError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(CaptionError::EmptyResponse);
    }
    Ok(cleaned.to_string())
}

/// PNG-encode a raster for upload.
pub(crate) fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
