//! Error types for the validator crate.
//!
//! Gate failures are not errors; they are invalid results. These variants
//! cover setup problems and backend failures that have no sensible invalid
//! result.

use std::fmt;

/// Errors escaping validation or validator construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// The store failed while reading sessions or users.
    Store,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => {
                write!(f, "invalid validator configuration: {details}")
            }
            Self::Store => write!(f, "session store failed"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ValidationError::Config {
            details: "redis driver selected without redis settings".to_string(),
        };
        assert!(err.to_string().contains("redis driver selected"));
    }
}
