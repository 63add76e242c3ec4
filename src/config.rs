//! Tool configuration.
//!
//! Loaded once at startup from an optional `prodshot.toml`. Every key has a
//! default, so the file is sparse: override only what you need. Unknown keys
//! are rejected to catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! [caption]
//! api_key = ""                # empty → GEMINI_API_KEY environment variable
//! model = "gemini-2.5-flash"
//! api_base = "https://generativelanguage.googleapis.com/v1beta"
//! fonts = ["Arial.ttf", "Roboto-Bold.ttf", "DejaVuSans-Bold.ttf", "LiberationSans-Bold.ttf"]
//! font_dirs = []              # searched before the system fonts
//!
//! [background]
//! endpoint = "http://127.0.0.1:7000/api/remove"
//!
//! [output]
//! jpeg_quality = 90           # 1-100
//! ```
//!
//! ## Credentials
//!
//! The caption credential is resolved here, once, and handed to the
//! [`Pipeline`](crate::pipeline::Pipeline) as an explicit default. A key passed
//! for a single run overrides it. Blank values count as absent.

use crate::services::{gemini, rembg};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable consulted when the config file has no API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// AI caption service settings.
    pub caption: CaptionConfig,
    /// Background removal service settings.
    pub background: BackgroundConfig,
    /// Encoder settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    /// Font file names tried in order; the first that resolves wins.
    pub fonts: Vec<String>,
    pub font_dirs: Vec<PathBuf>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: gemini::DEFAULT_MODEL.to_string(),
            api_base: gemini::DEFAULT_API_BASE.to_string(),
            fonts: [
                "Arial.ttf",
                "Roboto-Bold.ttf",
                "DejaVuSans-Bold.ttf",
                "LiberationSans-Bold.ttf",
            ]
            .map(String::from)
            .into(),
            font_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    pub endpoint: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            endpoint: rembg::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub jpeg_quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caption.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "caption.model must not be empty".into(),
            ));
        }
        if self.caption.api_base.trim().is_empty() {
            return Err(ConfigError::Validation(
                "caption.api_base must not be empty".into(),
            ));
        }
        if self.background.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "background.endpoint must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// The process-wide default caption credential.
    pub fn default_api_key(&self) -> Option<String> {
        self.default_api_key_with(|name| std::env::var(name).ok())
    }

    /// Credential resolution with an injectable environment lookup.
    pub fn default_api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_blank(&self.caption.api_key).or_else(|| env(API_KEY_ENV).as_deref().and_then(non_blank))
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Load and validate a config file.
///
/// A missing file yields the stock defaults. An unreadable or invalid file is
/// an error.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        let config = AppConfig::default();
        config.validate()?;
        return Ok(config);
    }
    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `prodshot.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# prodshot configuration
# =====================
# All options are optional. Values shown are the defaults.

[caption]
# API key for the Gemini caption service. Leave empty to use the
# GEMINI_API_KEY environment variable. A --api-key flag overrides both.
api_key = ""
model = "gemini-2.5-flash"
api_base = "https://generativelanguage.googleapis.com/v1beta"
# Font files tried in order for caption text. When none is found the
# built-in bitmap font is used.
fonts = ["Arial.ttf", "Roboto-Bold.ttf", "DejaVuSans-Bold.ttf", "LiberationSans-Bold.ttf"]
# Extra directories searched (recursively) before the system fonts.
font_dirs = []

[background]
# rembg-compatible server: POST multipart field "file", returns a PNG.
endpoint = "http://127.0.0.1:7000/api/remove"

[output]
# JPEG encoder quality (1-100). PNG and WebP are lossless.
jpeg_quality = 90
"##
}
