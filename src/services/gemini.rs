//! Gemini `generateContent` client for caption text.
//!
//! The request carries two parts: the prompt (with [`SLOGAN_INSTRUCTION`]
//! appended) and the current raster as an inline base64 PNG. The reply text is
//! the concatenation of every text part of the first candidate.
//!
//! [`SLOGAN_INSTRUCTION`]: super::SLOGAN_INSTRUCTION

use super::{CaptionError, CaptionService, caption_request, png_bytes};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::DynamicImage;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiCaptioner {
    api_base: String,
    model: String,
    http: HttpClient,
}

impl GeminiCaptioner {
    /// Build a client. Requests have no timeout: a hung call stalls the caller.
    pub fn new(api_base: &str, model: &str) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder().timeout(None::<Duration>).build()?;
        Ok(Self {
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            model: model.trim().to_string(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

fn request_body(prompt: &str, png: &[u8]) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": caption_request(prompt) },
                {
                    "inline_data": {
                        "mime_type": "image/png",
                        "data": BASE64.encode(png),
                    }
                }
            ]
        }]
    })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the reply text out of a `generateContent` response body.
fn extract_text(body: &str) -> Result<String, CaptionError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| CaptionError::MalformedResponse(e.to_string()))?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(CaptionError::EmptyResponse);
    }
    Ok(text)
}

impl CaptionService for GeminiCaptioner {
    fn generate(
        &self,
        prompt: &str,
        image: &DynamicImage,
        api_key: &str,
    ) -> Result<String, CaptionError> {
        let png = png_bytes(image)?;
        let endpoint = self.endpoint();
        debug!(%endpoint, bytes = png.len(), "requesting caption");

        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", api_key)
            .json(&request_body(prompt, &png))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(CaptionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        extract_text(&body)
    }
}
