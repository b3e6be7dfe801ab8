//! Errors reported by the command-line front end.

use std::fmt;

/// Failures that end a CLI run.
#[derive(Debug)]
pub enum CliError {
    /// Environment configuration could not be loaded.
    Config { details: String },
    /// The session store could not be reached.
    Connect,
    /// The store failed while validating.
    Validation,
    /// No application key was supplied.
    MissingKey,
    /// The cookie could not be decrypted.
    Decrypt,
    /// The session payload could not be decoded.
    Decode,
    /// Writing the JSON result failed.
    Output { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::Connect => write!(f, "failed to connect to the session store"),
            Self::Validation => write!(f, "validation failed"),
            Self::MissingKey => {
                write!(f, "no key given and SESSIONBRIDGE__APP_KEY is unset")
            }
            Self::Decrypt => write!(f, "failed to decrypt cookie"),
            Self::Decode => write!(f, "failed to decode session payload"),
            Self::Output { details } => write!(f, "failed to write result: {details}"),
        }
    }
}

impl std::error::Error for CliError {}
