//! Image generation configuration parsed from environment variables.

use super::types::GenerationError;

pub const DEFAULT_IMAGE_GEN_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_IMAGE_GEN_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_GEN_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_IMAGE_GEN_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageGenTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeouts: ImageGenTimeouts,
}

impl ImageGenConfig {
    /// Build typed image generation config from environment variables.
    ///
    /// Required:
    /// - `IMAGE_GEN_API_KEY_ENV` (names the env var containing the key)
    ///
    /// Optional:
    /// - `IMAGE_GEN_MODEL`: default `gemini-2.5-flash-image`
    /// - `IMAGE_GEN_BASE_URL`: default Generative Language API base URL
    /// - `IMAGE_GEN_REQUEST_TIMEOUT_SECS`: default 120
    /// - `IMAGE_GEN_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` if the key variable (or the variable it names)
    /// is unset or empty, and `ConfigParse` for a malformed timeout.
    pub fn from_env() -> Result<Self, GenerationError> {
        let key_var = std::env::var("IMAGE_GEN_API_KEY_ENV")
            .map_err(|_| GenerationError::MissingApiKey { var: "IMAGE_GEN_API_KEY_ENV".into() })?;
        let api_key = std::env::var(&key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey { var: key_var.clone() })?;

        let model = std::env::var("IMAGE_GEN_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_GEN_MODEL.to_string());
        let base_url = std::env::var("IMAGE_GEN_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_IMAGE_GEN_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = ImageGenTimeouts {
            request_secs: env_parse_secs("IMAGE_GEN_REQUEST_TIMEOUT_SECS", DEFAULT_IMAGE_GEN_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_secs("IMAGE_GEN_CONNECT_TIMEOUT_SECS", DEFAULT_IMAGE_GEN_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { api_key, model, base_url, timeouts })
    }
}

fn env_parse_secs(key: &str, default: u64) -> Result<u64, GenerationError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| GenerationError::ConfigParse(format!("{key} must be a whole number of seconds, got '{raw}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
