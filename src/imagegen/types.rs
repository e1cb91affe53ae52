//! Image generation types: provider-neutral image result, errors, and trait.

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by image generation client operations.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The response was well formed but carried no inline image.
    #[error("response contained no image data")]
    NoImage,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for GenerationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::NoImage => "E_NO_IMAGE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// IMAGE
// =============================================================================

/// Raw encoded image returned by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Media type reported by the provider (e.g. `image/png`).
    pub mime: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// GENERATOR TRAIT
// =============================================================================

/// Provider-neutral async trait for text-to-image generation. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate an image from a text prompt.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] if the request fails, the response is
    /// malformed, or no image is returned.
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GenerationError>;
}
