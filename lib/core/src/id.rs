//! Strongly-typed identifier for framework users.
//!
//! The framework keys its users table by an auto-incrementing integer, and
//! the session payload stores that same integer under the `login_web_*` key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Primary key of a row in the framework's users table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates an ID from its numeric value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Converts a signed integer, rejecting zero and negative values.
    ///
    /// Serialized session payloads carry signed integers; the framework never
    /// issues a non-positive key.
    #[must_use]
    pub fn from_signed(id: i64) -> Option<Self> {
        u64::try_from(id).ok().filter(|id| *id > 0).map(Self)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: i64 = s.trim().parse().map_err(|e: std::num::ParseIntError| ParseIdError {
            id_type: "UserId",
            reason: e.to_string(),
        })?;
        Self::from_signed(parsed).ok_or_else(|| ParseIdError {
            id_type: "UserId",
            reason: format!("{parsed} is not a positive key"),
        })
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<UserId> for u64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}
