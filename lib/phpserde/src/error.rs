//! Error types for the serialization parser.
//!
//! Every variant is a hard failure: the parser never returns a partial tree.
//! Offsets are byte positions into the input.

use std::fmt;

/// Errors raised while parsing serialized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhpSerdeError {
    /// Input ended before the current value was complete.
    Truncated { offset: usize },
    /// A declared string length or element count does not match the content.
    LengthMismatch { offset: usize, declared: usize },
    /// A value started with a tag character that is not part of the format.
    UnknownTag { offset: usize, tag: char },
    /// A named record uses a class that is neither registered nor allow-listed.
    UnknownClass { class: String },
    /// A numeric field could not be parsed.
    InvalidNumber { offset: usize, text: String },
    /// A structural character was missing.
    Unexpected {
        offset: usize,
        expected: char,
        found: char,
    },
    /// A map key was neither an integer nor a string.
    InvalidKey { offset: usize },
    /// Bytes remained after the top-level value.
    TrailingData { offset: usize },
    /// Nesting exceeded the parser's depth limit.
    NestingTooDeep { limit: usize },
}

impl fmt::Display for PhpSerdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { offset } => {
                write!(f, "input truncated at byte {offset}")
            }
            Self::LengthMismatch { offset, declared } => {
                write!(
                    f,
                    "declared length {declared} does not match content at byte {offset}"
                )
            }
            Self::UnknownTag { offset, tag } => {
                write!(f, "unknown type tag '{tag}' at byte {offset}")
            }
            Self::UnknownClass { class } => {
                write!(f, "class '{class}' is not registered")
            }
            Self::InvalidNumber { offset, text } => {
                write!(f, "invalid number '{text}' at byte {offset}")
            }
            Self::Unexpected {
                offset,
                expected,
                found,
            } => {
                write!(
                    f,
                    "expected '{expected}' at byte {offset}, found '{}'",
                    found.escape_default()
                )
            }
            Self::InvalidKey { offset } => {
                write!(f, "map key at byte {offset} must be an integer or string")
            }
            Self::TrailingData { offset } => {
                write!(f, "unexpected trailing data at byte {offset}")
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "nesting deeper than {limit} levels")
            }
        }
    }
}

impl std::error::Error for PhpSerdeError {}
