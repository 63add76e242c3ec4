//! Output formats.
//!
//! The set is closed: every format the pipeline can write is listed in
//! [`OutputFormat`]. Whether a format can carry an alpha channel decides if a
//! transparent raster must be flattened before it is serialized.
//!
//! | Label token | Variant | Extension | Alpha |
//! |---|---|---|---|
//! | `PNG` | [`OutputFormat::Png`] | `png` | yes |
//! | `JPEG`, `JPG` | [`OutputFormat::Jpeg`] | `jpeg` | no |
//! | `WEBP` | [`OutputFormat::WebP`] | `webp` | yes |

use image::ImageFormat;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unknown output format: {0:?} (expected PNG, JPEG or WEBP)")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl OutputFormat {
    /// Whether the encoded file can store transparency.
    pub fn supports_alpha(self) -> bool {
        match self {
            OutputFormat::Png | OutputFormat::WebP => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// File extension written for this format, lowercase, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Parse a human-readable label such as `"WEBP (Best for e-commerce platform)"`.
    ///
    /// Only the leading token before the first whitespace is significant.
    pub fn from_label(label: &str) -> Result<Self, FormatError> {
        format_token(label).parse()
    }
}

/// Extract the leading format token from a descriptive label.
pub fn format_token(label: &str) -> &str {
    label.split_whitespace().next().unwrap_or("")
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PNG" => Ok(OutputFormat::Png),
            "JPEG" | "JPG" => Ok(OutputFormat::Jpeg),
            "WEBP" => Ok(OutputFormat::WebP),
            _ => Err(FormatError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WEBP",
        };
        f.write_str(name)
    }
}
