//! Data URI parsing and encoding for cached image payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("payload is not a data URI")]
    MissingScheme,
    #[error("data URI has no ',' separator")]
    MissingSeparator,
    #[error("unsupported media type '{0}' (expected image/*)")]
    NotAnImage(String),
    #[error("invalid base64 body: {0}")]
    InvalidBase64(String),
    #[error("data URI body is empty")]
    Empty,
}

/// Borrowed view over a `data:` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub base64: bool,
    pub body: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parse `data:<mime>[;param]*[;base64],<body>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme or separator is missing, the media type
    /// is not `image/*`, or the body is empty.
    pub fn parse(raw: &'a str) -> Result<Self, DataUriError> {
        let rest = raw.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (header, body) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;

        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default().trim();
        let base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        if !mime.starts_with("image/") {
            return Err(DataUriError::NotAnImage(mime.to_string()));
        }
        if body.is_empty() {
            return Err(DataUriError::Empty);
        }
        Ok(Self { mime, base64, body })
    }

    /// Parse and, for base64 bodies, check that the body decodes.
    ///
    /// # Errors
    ///
    /// Returns any parse error, or `InvalidBase64` if the body does not decode.
    pub fn validate(raw: &'a str) -> Result<Self, DataUriError> {
        let uri = Self::parse(raw)?;
        if uri.base64 {
            uri.decode()?;
        }
        Ok(uri)
    }

    /// Raw bytes of the body. Non-base64 bodies are returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBase64` if a base64 body does not decode.
    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        if self.base64 {
            STANDARD
                .decode(self.body)
                .map_err(|e| DataUriError::InvalidBase64(e.to_string()))
        } else {
            Ok(self.body.as_bytes().to_vec())
        }
    }
}

/// Encode bytes as a base64 data URI with the given media type.
#[must_use]
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Approximate decoded size in KiB, as shown in the asset library.
#[must_use]
pub fn approx_size_kb(payload: &str) -> usize {
    (payload.len() * 3 / 4 + 512) / 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_base64_png() {
        let uri = DataUri::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(uri.mime, "image/png");
        assert!(uri.base64);
        assert_eq!(uri.body, "iVBORw0KGgo=");
    }

    #[test]
    fn parse_svg_with_charset_param() {
        let uri = DataUri::parse("data:image/svg+xml;charset=utf-8,%3Csvg%3E").unwrap();
        assert_eq!(uri.mime, "image/svg+xml");
        assert!(!uri.base64);
    }

    #[test]
    fn parse_rejects_non_image_and_garbage() {
        assert_eq!(DataUri::parse("hello"), Err(DataUriError::MissingScheme));
        assert_eq!(DataUri::parse("data:image/png;base64"), Err(DataUriError::MissingSeparator));
        assert!(matches!(DataUri::parse("data:text/plain,hi"), Err(DataUriError::NotAnImage(_))));
        assert_eq!(DataUri::parse("data:image/png;base64,"), Err(DataUriError::Empty));
    }

    #[test]
    fn validate_catches_bad_base64() {
        let err = DataUri::validate("data:image/png;base64,@@not-base64@@").unwrap_err();
        assert!(matches!(err, DataUriError::InvalidBase64(_)));
    }

    #[test]
    fn encode_then_decode_preserves_bytes() {
        let raw = encode("image/jpeg", &[0xFF, 0xD8, 0xFF, 0x00]);
        assert!(raw.starts_with("data:image/jpeg;base64,"));
        let bytes = DataUri::parse(&raw).unwrap().decode().unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0x00]);
    }

    #[test]
    fn approx_size_rounds_to_nearest_kb() {
        assert_eq!(approx_size_kb(""), 0);
        assert_eq!(approx_size_kb(&"A".repeat(4096)), 3);
    }
}
