//! Gemini `generateContent` client for inline image output.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::config::ImageGenTimeouts;
use super::types::{GeneratedImage, GenerationError};

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the reqwest client cannot be constructed.
    pub fn new(api_key: String, base_url: &str, model: String, timeouts: ImageGenTimeouts) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| GenerationError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// # Errors
    ///
    /// Returns `ApiRequest` on transport failure, `ApiResponse` for a non-200
    /// status, and `ApiParse`/`NoImage` when the body holds no usable image.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        let body = build_request(prompt);
        let url = endpoint(&self.base_url, &self.model);
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(GenerationError::ApiResponse { status, body: text });
        }
        parse_generate_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
pub(crate) struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

pub(crate) fn build_request(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest { contents: [RequestContent { parts: [TextPart { text: prompt }] }] }
}

pub(crate) fn endpoint(base_url: &str, model: &str) -> String {
    format!("{base_url}/models/{model}:generateContent")
}

/// Pull the first inline image out of a `generateContent` response.
pub(crate) fn parse_generate_response(json_text: &str) -> Result<GeneratedImage, GenerationError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| GenerationError::ApiParse(e.to_string()))?;

    let Some(parts) = root
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
    else {
        return Err(GenerationError::ApiParse("missing candidates[0].content.parts".to_string()));
    };

    for part in parts {
        let Some(inline) = part.get("inlineData") else {
            continue;
        };
        let Some(data) = inline.get("data").and_then(Value::as_str) else {
            continue;
        };
        let mime = inline
            .get("mimeType")
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| GenerationError::ApiParse(format!("inlineData.data: {e}")))?;
        if bytes.is_empty() {
            continue;
        }
        return Ok(GeneratedImage { mime, bytes });
    }

    Err(GenerationError::NoImage)
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
