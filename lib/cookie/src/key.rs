//! Application key parsing.

use crate::error::DecryptionError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rootcause::prelude::Report;
use std::fmt;
use std::str::FromStr;

/// Marker the framework puts in front of base64-encoded keys.
const BASE64_MARKER: &str = "base64:";

/// Symmetric key shared with the framework.
///
/// Only 16-byte (AES-128-CBC) and 32-byte (AES-256-CBC) keys are accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct AppKey(Vec<u8>);

impl AppKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionError::InvalidKey`] if the length is not 16 or 32.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Report<DecryptionError>> {
        match bytes.len() {
            16 | 32 => Ok(Self(bytes)),
            n => Err(DecryptionError::InvalidKey {
                reason: format!("expected 16 or 32 bytes, got {n}"),
            }
            .into()),
        }
    }

    /// Parses a key as written in the framework's configuration.
    ///
    /// A `base64:` prefix means the rest is base64; without it the text itself
    /// is the key.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptionError::InvalidKey`] for bad base64 or a bad length.
    pub fn parse(text: &str) -> Result<Self, Report<DecryptionError>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DecryptionError::InvalidKey {
                reason: "key is empty".to_string(),
            }
            .into());
        }
        let bytes = match text.strip_prefix(BASE64_MARKER) {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map_err(|e| DecryptionError::InvalidKey {
                    reason: format!("not valid base64: {e}"),
                })?,
            None => text.as_bytes().to_vec(),
        };
        Self::from_bytes(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for AppKey {
    type Err = Report<DecryptionError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppKey([{} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_base64_key() {
        let encoded = STANDARD.encode([7u8; 32]);
        let key = AppKey::parse(&format!("base64:{encoded}")).expect("valid key");
        assert_eq!(key.as_bytes(), &[7u8; 32]);
    }

    #[test]
    fn parses_raw_key() {
        let key: AppKey = "0123456789abcdef".parse().expect("valid key");
        assert_eq!(key.as_bytes(), b"0123456789abcdef");
    }

    #[test]
    fn rejects_wrong_length() {
        let err = AppKey::parse("short").unwrap_err();
        assert!(matches!(
            err.current_context(),
            DecryptionError::InvalidKey { .. }
        ));
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(AppKey::parse("base64:!!!not base64!!!").is_err());
        assert!(AppKey::parse("   ").is_err());
    }

    #[test]
    fn debug_does_not_print_key_bytes() {
        let key = AppKey::from_bytes(vec![0xAB; 16]).expect("valid key");
        let debug = format!("{key:?}");
        assert_eq!(debug, "AppKey([16 bytes])");
    }
}
