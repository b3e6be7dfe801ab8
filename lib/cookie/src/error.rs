//! Error types for cookie decryption.

use std::fmt;

/// Errors from decrypting a cookie envelope.
///
/// Messages never include key material or decrypted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    /// The envelope is not base64-wrapped JSON of the expected shape.
    MalformedEnvelope { reason: String },
    /// The application key is missing, not base64, or of the wrong length.
    InvalidKey { reason: String },
    /// The recomputed MAC does not match the envelope's MAC.
    MacMismatch,
    /// Block decryption or padding removal failed.
    CipherFailure { reason: String },
}

impl fmt::Display for DecryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedEnvelope { reason } => {
                write!(f, "malformed cookie envelope: {reason}")
            }
            Self::InvalidKey { reason } => {
                write!(f, "invalid application key: {reason}")
            }
            Self::MacMismatch => write!(f, "cookie MAC is invalid"),
            Self::CipherFailure { reason } => {
                write!(f, "could not decrypt cookie: {reason}")
            }
        }
    }
}

impl std::error::Error for DecryptionError {}
