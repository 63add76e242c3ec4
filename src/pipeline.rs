//! The per-image pipeline driver.
//!
//! Runs the stages in a fixed order, each gated by [`PipelineConfig`]:
//!
//! ```text
//! load → [remove background] → [flatten if format is opaque]
//!      → [caption overlay]   → [resize] → [enhance] → raster
//! ```
//!
//! Only loading, background removal and resizing can fail the run. The caption
//! overlay is best-effort: any failure inside it (network, bad response, empty
//! text) is logged and the raster from before the stage carries on.
//!
//! Every stage takes the current raster and returns a new one; nothing holds
//! on to a previous raster after its stage returns.

use crate::config::AppConfig;
use crate::format::OutputFormat;
use crate::imaging::{
    CaptionStyle, Enhancement, FontLibrary, InvalidDimensionError, Quality, WHITE,
    compose_caption, encode_raster, enhance, flatten, resize, save_raster,
};
use crate::services::gemini::GeminiCaptioner;
use crate::services::rembg::RembgRemover;
use crate::services::{
    BackgroundRemover, CaptionError, CaptionService, ServiceError, sanitize_caption,
};
use crate::source::{ImageSource, LoadError};
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    InvalidDimension(#[from] InvalidDimensionError),
    #[error("Background removal failed: {0}")]
    BackgroundRemoval(#[from] ServiceError),
    #[error("Failed to encode output: {0}")]
    Encode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to build service client: {0}")]
    Client(#[from] reqwest::Error),
}

/// What to do with one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub format: OutputFormat,
    /// Exact output `(width, height)`; `None` keeps the current size.
    pub resize: Option<(u32, u32)>,
    pub remove_background: bool,
    pub enhance: bool,
    /// User prompt for the AI caption. `None` or blank disables the overlay.
    pub caption_prompt: Option<String>,
    /// Per-run credential, overriding the pipeline's default.
    pub api_key: Option<String>,
}

impl PipelineConfig {
    fn caption_prompt(&self) -> Option<&str> {
        self.caption_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// The credential for this run: the explicit override, else `default`.
    pub fn resolve_api_key<'a>(&'a self, default: Option<&'a str>) -> Option<&'a str> {
        let blank_to_none = |key: &'a str| Some(key.trim()).filter(|k| !k.is_empty());
        self.api_key
            .as_deref()
            .and_then(blank_to_none)
            .or_else(|| default.and_then(blank_to_none))
    }
}

/// Drives the stages for one image at a time.
pub struct Pipeline<R, C> {
    remover: R,
    captioner: C,
    fonts: FontLibrary,
    style: CaptionStyle,
    enhancement: Enhancement,
    quality: Quality,
    default_api_key: Option<String>,
}

/// The production pipeline: rembg server + Gemini.
pub type DefaultPipeline = Pipeline<RembgRemover, GeminiCaptioner>;

impl DefaultPipeline {
    /// Wire up service clients, fonts and the default credential from config.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let remover = RembgRemover::new(&config.background.endpoint)?;
        let captioner = GeminiCaptioner::new(&config.caption.api_base, &config.caption.model)?;
        let fonts = FontLibrary::new(config.caption.fonts.clone(), config.caption.font_dirs.clone());
        Ok(Pipeline::new(remover, captioner, fonts)
            .with_default_api_key(config.default_api_key())
            .with_quality(Quality::new(config.output.jpeg_quality)))
    }
}

impl<R: BackgroundRemover, C: CaptionService> Pipeline<R, C> {
    pub fn new(remover: R, captioner: C, fonts: FontLibrary) -> Self {
        Self {
            remover,
            captioner,
            fonts,
            style: CaptionStyle::default(),
            enhancement: Enhancement::default(),
            quality: Quality::default(),
            default_api_key: None,
        }
    }

    pub fn with_default_api_key(mut self, key: Option<String>) -> Self {
        self.default_api_key = key;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Run every enabled stage on one image and return the final raster.
    pub fn process(
        &self,
        source: ImageSource<'_>,
        config: &PipelineConfig,
    ) -> Result<DynamicImage, PipelineError> {
        let mut raster = source.load()?;
        debug!(
            width = raster.width(),
            height = raster.height(),
            color = ?raster.color(),
            "loaded image"
        );

        if config.remove_background {
            let cutout = self.remover.remove_background(&raster)?;
            raster = DynamicImage::ImageRgba8(cutout.to_rgba8());
            debug!("background removed");
        }

        raster = fit_to_format(raster, config.format);

        if let Some(prompt) = config.caption_prompt() {
            match config.resolve_api_key(self.default_api_key.as_deref()) {
                Some(key) => match self.overlay_caption(&raster, prompt, key) {
                    Ok(captioned) => raster = fit_to_format(captioned, config.format),
                    Err(e) => warn!(error = %e, "caption overlay failed; continuing without it"),
                },
                None => warn!("caption prompt given but no API key available; skipping caption"),
            }
        }

        if let Some((width, height)) = config.resize {
            raster = resize(&raster, width, height)?;
            debug!(width, height, "resized");
        }

        if config.enhance {
            raster = enhance(&raster, &self.enhancement);
            debug!("enhanced");
        }

        Ok(raster)
    }

    /// Ask the caption service for a slogan and composite it onto `raster`.
    ///
    /// Returns a new raster; `raster` itself is left as it was so callers can
    /// fall back to it on error.
    pub fn overlay_caption(
        &self,
        raster: &DynamicImage,
        prompt: &str,
        api_key: &str,
    ) -> Result<DynamicImage, CaptionError> {
        let raw = self.captioner.generate(prompt, raster, api_key)?;
        let caption = sanitize_caption(&raw)?;
        debug!(%caption, "caption generated");
        Ok(compose_caption(raster, &caption, &self.fonts, &self.style))
    }

    /// Process one image and serialize it in the configured format.
    pub fn process_to_bytes(
        &self,
        source: ImageSource<'_>,
        config: &PipelineConfig,
    ) -> Result<Vec<u8>, PipelineError> {
        let raster = self.process(source, config)?;
        Ok(encode_raster(&raster, config.format, self.quality)?)
    }

    /// Process one image and write it to `output`.
    ///
    /// Missing parent directories are created only once processing has
    /// succeeded, so a failed image leaves nothing behind.
    pub fn process_to_file(
        &self,
        source: ImageSource<'_>,
        config: &PipelineConfig,
        output: &Path,
    ) -> Result<(), PipelineError> {
        let raster = self.process(source, config)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        save_raster(&raster, output, config.format, self.quality)?;
        Ok(())
    }
}

/// Flatten onto white when `format` cannot store the raster's alpha.
fn fit_to_format(raster: DynamicImage, format: OutputFormat) -> DynamicImage {
    if !format.supports_alpha() && raster.color().has_alpha() {
        flatten(&raster, WHITE)
    } else {
        raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tests::{MockCaptioner, MockRemover};
    use crate::test_helpers::{encode_png, test_pipeline, write_corrupt_file};
    use image::{GenericImageView, Rgb, RgbaImage};
    use tempfile::TempDir;

    fn caption_config(prompt: &str) -> PipelineConfig {
        PipelineConfig {
            caption_prompt: Some(prompt.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_stages_keeps_dimensions_and_pixels() {
        let bytes = encode_png(120, 90);
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let original = image::load_from_memory(&bytes).unwrap();

        for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::WebP] {
            let config = PipelineConfig {
                format,
                ..Default::default()
            };
            let out = pipeline.process(ImageSource::Bytes(&bytes), &config).unwrap();
            assert_eq!(out.dimensions(), (120, 90));
            assert_eq!(out.to_rgb8(), original.to_rgb8());
        }
    }

    #[test]
    fn background_removal_always_yields_alpha() {
        let bytes = encode_png(40, 40);
        let remover = MockRemover {
            opaque_output: true,
            ..Default::default()
        };
        let pipeline = Pipeline::new(
            remover,
            MockCaptioner::replying("unused"),
            FontLibrary::builtin_only(),
        );
        let config = PipelineConfig {
            remove_background: true,
            ..Default::default()
        };

        let out = pipeline.process(ImageSource::Bytes(&bytes), &config).unwrap();
        assert!(out.color().has_alpha());
    }

    #[test]
    fn background_removal_for_jpeg_is_flattened_onto_white() {
        let bytes = encode_png(40, 40);
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let config = PipelineConfig {
            format: OutputFormat::Jpeg,
            remove_background: true,
            ..Default::default()
        };

        let out = pipeline.process(ImageSource::Bytes(&bytes), &config).unwrap();
        assert!(!out.color().has_alpha());
        // mock remover clears the left half
        assert_eq!(out.to_rgb8().get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn background_removal_failure_is_fatal() {
        let bytes = encode_png(10, 10);
        let pipeline = Pipeline::new(
            MockRemover::failing(),
            MockCaptioner::replying("unused"),
            FontLibrary::builtin_only(),
        );
        let config = PipelineConfig {
            remove_background: true,
            ..Default::default()
        };
        let err = pipeline
            .process(ImageSource::Bytes(&bytes), &config)
            .unwrap_err();
        assert!(matches!(err, PipelineError::BackgroundRemoval(_)));
    }

    #[test]
    fn caption_overlay_changes_pixels_not_size() {
        let bytes = encode_png(400, 400);
        let pipeline = test_pipeline(MockCaptioner::replying("**\"Walk Tall\"**"))
            .with_default_api_key(Some("default-key".into()));
        let original = image::load_from_memory(&bytes).unwrap();

        let out = pipeline
            .process(ImageSource::Bytes(&bytes), &caption_config("Luxury shoes"))
            .unwrap();

        assert_eq!(out.dimensions(), (400, 400));
        assert_ne!(out.to_rgb8(), original.to_rgb8());
        let requests = pipeline.captioner.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "Luxury shoes");
        assert_eq!(requests[0].api_key, "default-key");
    }

    #[test]
    fn caption_without_credential_is_skipped() {
        let bytes = encode_png(100, 100);
        let pipeline = test_pipeline(MockCaptioner::replying("Walk Tall"));
        let original = image::load_from_memory(&bytes).unwrap();

        let out = pipeline
            .process(ImageSource::Bytes(&bytes), &caption_config("Luxury"))
            .unwrap();

        assert!(pipeline.captioner.get_requests().is_empty());
        assert_eq!(out.to_rgb8(), original.to_rgb8());
    }

    #[test]
    fn override_key_beats_default() {
        let bytes = encode_png(100, 100);
        let pipeline = test_pipeline(MockCaptioner::replying("Walk Tall"))
            .with_default_api_key(Some("default-key".into()));
        let config = PipelineConfig {
            api_key: Some("override-key".into()),
            ..caption_config("Luxury")
        };

        pipeline.process(ImageSource::Bytes(&bytes), &config).unwrap();
        assert_eq!(pipeline.captioner.get_requests()[0].api_key, "override-key");
    }

    #[test]
    fn blank_prompt_disables_caption() {
        let bytes = encode_png(50, 50);
        let pipeline = test_pipeline(MockCaptioner::replying("Walk Tall"))
            .with_default_api_key(Some("key".into()));
        pipeline
            .process(ImageSource::Bytes(&bytes), &caption_config("   "))
            .unwrap();
        assert!(pipeline.captioner.get_requests().is_empty());
    }

    #[test]
    fn caption_failure_keeps_last_good_raster() {
        let bytes = encode_png(100, 100);
        let pipeline = test_pipeline(MockCaptioner::failing("connection reset"))
            .with_default_api_key(Some("key".into()));
        let original = image::load_from_memory(&bytes).unwrap();

        let out = pipeline
            .process(ImageSource::Bytes(&bytes), &caption_config("Luxury"))
            .unwrap();
        assert_eq!(out.to_rgb8(), original.to_rgb8());
    }

    #[test]
    fn empty_caption_text_is_a_caption_error() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(50, 50));
        let pipeline = test_pipeline(MockCaptioner::replying(" ** "));
        let err = pipeline.overlay_caption(&img, "Luxury", "key").unwrap_err();
        assert!(matches!(err, CaptionError::EmptyResponse));
    }

    #[test]
    fn caption_on_jpeg_output_stays_opaque() {
        let bytes = encode_png(200, 200);
        let pipeline = test_pipeline(MockCaptioner::replying("Walk Tall"))
            .with_default_api_key(Some("key".into()));
        let config = PipelineConfig {
            format: OutputFormat::Jpeg,
            ..caption_config("Luxury")
        };
        let out = pipeline.process(ImageSource::Bytes(&bytes), &config).unwrap();
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn resize_then_enhance() {
        let bytes = encode_png(200, 200);
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let config = PipelineConfig {
            resize: Some((800, 800)),
            enhance: true,
            ..Default::default()
        };
        let out = pipeline.process(ImageSource::Bytes(&bytes), &config).unwrap();
        assert_eq!(out.dimensions(), (800, 800));
    }

    #[test]
    fn zero_resize_is_invalid_dimension() {
        let bytes = encode_png(200, 200);
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let config = PipelineConfig {
            resize: Some((0, 100)),
            ..Default::default()
        };
        let err = pipeline
            .process(ImageSource::Bytes(&bytes), &config)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDimension(_)));
    }

    #[test]
    fn undecodable_input_is_load_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        write_corrupt_file(&path);

        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let err = pipeline
            .process(ImageSource::Path(&path), &PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));
    }

    #[test]
    fn enhance_keeps_transparency_for_png() {
        let mut rgba = RgbaImage::from_pixel(20, 20, image::Rgba([90, 120, 30, 255]));
        rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let config = PipelineConfig {
            enhance: true,
            ..Default::default()
        };
        let out = pipeline
            .process(ImageSource::Bytes(bytes.get_ref()), &config)
            .unwrap();
        assert_eq!(out.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn process_to_file_writes_requested_format() {
        let tmp = TempDir::new().unwrap();
        let bytes = encode_png(64, 64);
        let output = tmp.path().join("out.webp");
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let config = PipelineConfig {
            format: OutputFormat::WebP,
            ..Default::default()
        };

        pipeline
            .process_to_file(ImageSource::Bytes(&bytes), &config, &output)
            .unwrap();
        let written = std::fs::read(&output).unwrap();
        assert_eq!(
            image::guess_format(&written).unwrap(),
            image::ImageFormat::WebP
        );
    }

    #[test]
    fn process_to_file_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let bytes = encode_png(16, 16);
        let output = tmp.path().join("a/b/out.png");
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));

        pipeline
            .process_to_file(ImageSource::Bytes(&bytes), &PipelineConfig::default(), &output)
            .unwrap();
        assert!(output.is_file());
    }

    #[test]
    fn failed_processing_creates_no_dirs() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("a/b/out.png");
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));

        let err = pipeline
            .process_to_file(ImageSource::Bytes(b"nope"), &PipelineConfig::default(), &output)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));
        assert!(!tmp.path().join("a").exists());
    }

    #[test]
    fn process_to_bytes_encodes_jpeg() {
        let bytes = encode_png(32, 32);
        let pipeline = test_pipeline(MockCaptioner::replying("unused"));
        let config = PipelineConfig {
            format: OutputFormat::Jpeg,
            remove_background: true,
            ..Default::default()
        };
        let out = pipeline
            .process_to_bytes(ImageSource::Bytes(&bytes), &config)
            .unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn resolve_api_key_order() {
        let config = PipelineConfig::default();
        assert_eq!(config.resolve_api_key(Some("default")), Some("default"));
        assert_eq!(config.resolve_api_key(None), None);

        let config = PipelineConfig {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key(Some("default")), Some("default"));

        let config = PipelineConfig {
            api_key: Some("mine".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key(Some("default")), Some("mine"));
    }
}
