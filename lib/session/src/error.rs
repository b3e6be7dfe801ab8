//! Error types for session payload decoding.
//!
//! Parser failures are attached beneath these variants via rootcause context,
//! so the full chain remains visible in logs.

use std::fmt;

/// Errors from decoding a stored session payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDecodeError {
    /// The payload is not valid base64.
    InvalidBase64 { reason: String },
    /// The decoded payload could not be parsed.
    Malformed,
    /// The payload parsed, but its top level is not a map.
    NotAMap { found: &'static str },
}

impl fmt::Display for SessionDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase64 { reason } => {
                write!(f, "session payload is not valid base64: {reason}")
            }
            Self::Malformed => write!(f, "session payload is malformed"),
            Self::NotAMap { found } => {
                write!(f, "session payload must be a map, found {found}")
            }
        }
    }
}

impl std::error::Error for SessionDecodeError {}
