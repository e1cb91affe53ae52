//! Image generation: remote text-to-image adapter used to upgrade artwork.
//!
//! DESIGN
//! ======
//! Configured from environment variables. [`ImageGenClient`] wraps the Gemini
//! `generateContent` endpoint and is consumed through the [`ImageGenerator`]
//! trait so callers can substitute a mock in tests.

pub mod config;
pub mod gemini;
pub mod prompts;
pub mod types;

use config::ImageGenConfig;
pub use types::{GeneratedImage, GenerationError, ImageGenerator};

/// Concrete image generator backed by the Gemini API.
pub struct ImageGenClient {
    inner: gemini::GeminiClient,
}

impl ImageGenClient {
    /// Build an image generation client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, GenerationError> {
        let config = ImageGenConfig::from_env()?;
        Self::from_config(config)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: ImageGenConfig) -> Result<Self, GenerationError> {
        let inner = gemini::GeminiClient::new(config.api_key, &config.base_url, config.model, config.timeouts)?;
        Ok(Self { inner })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.inner.model()
    }
}

#[async_trait::async_trait]
impl ImageGenerator for ImageGenClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError> {
        self.inner.generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::ImageGenTimeouts;

    #[test]
    fn from_config_keeps_model() {
        let client = ImageGenClient::from_config(ImageGenConfig {
            api_key: "k".into(),
            model: "gemini-test".into(),
            base_url: "https://example.test/v1beta".into(),
            timeouts: ImageGenTimeouts { request_secs: 5, connect_secs: 1 },
        })
        .unwrap();
        assert_eq!(client.model(), "gemini-test");
    }
}
