//! Error types for the store crate.
//!
//! Backend errors are flattened into `details` strings at this layer; the
//! validator adds its own context on top.

use std::fmt;

/// Errors from storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not connect to the backend.
    Connection { details: String },
    /// A query or command failed.
    Query { details: String },
    /// A row or value had an unexpected shape.
    Decode { details: String },
    /// Store configuration is invalid.
    InvalidConfig { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { details } => {
                write!(f, "store connection failed: {details}")
            }
            Self::Query { details } => {
                write!(f, "store query failed: {details}")
            }
            Self::Decode { details } => {
                write!(f, "unexpected data in store: {details}")
            }
            Self::InvalidConfig { details } => {
                write!(f, "invalid store configuration: {details}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub(crate) fn query(err: impl fmt::Display) -> Self {
        Self::Query {
            details: err.to_string(),
        }
    }
}
