//! Background removal through a rembg-compatible HTTP server.
//!
//! The raster is uploaded as a PNG in the multipart field `file`
//! (`rembg s` exposes this as `POST /api/remove`); the response body is the
//! cut-out PNG. The decoded result is always promoted to RGBA8 so callers can
//! rely on an alpha channel.

use super::{BackgroundRemover, ServiceError, png_bytes};
use image::DynamicImage;
use reqwest::blocking::Client as HttpClient;
use reqwest::blocking::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:7000/api/remove";

pub struct RembgRemover {
    endpoint: String,
    http: HttpClient,
}

impl RembgRemover {
    /// Build a client. Requests have no timeout.
    pub fn new(endpoint: &str) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder().timeout(None::<Duration>).build()?;
        Ok(Self {
            endpoint: endpoint.trim().to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Decode a service response and force an alpha channel.
fn decode_cutout(bytes: &[u8]) -> Result<DynamicImage, ServiceError> {
    let decoded = image::load_from_memory(bytes).map_err(ServiceError::Decode)?;
    Ok(DynamicImage::ImageRgba8(decoded.to_rgba8()))
}

impl BackgroundRemover for RembgRemover {
    fn remove_background(&self, image: &DynamicImage) -> Result<DynamicImage, ServiceError> {
        let png = png_bytes(image).map_err(ServiceError::Encode)?;
        debug!(endpoint = %self.endpoint, bytes = png.len(), "removing background");

        let part = Part::bytes(png)
            .file_name("image.png")
            .mime_str("image/png")?;
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(Form::new().part("file", part))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes()?;
        decode_cutout(&bytes)
    }
}
