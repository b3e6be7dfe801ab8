//! Session validation for framework-issued session cookies.
//!
//! [`Validator`] takes a session ID (or the encrypted cookie carrying it),
//! reads the session from the framework's own storage, and walks a fixed
//! sequence of gates:
//!
//! 1. a session ID was provided
//! 2. the session exists
//! 3. the session has not expired
//! 4. the payload decodes
//! 5. the payload names an authenticated user
//! 6. the user exists and is not deleted
//! 7. the user's role is looked up (absence is fine)
//! 8. single-session enforcement for the `admin` role
//! 9. second-factor verification when the user has it enabled
//! 10. permissions are resolved, best effort
//!
//! The first failing gate produces an invalid [`ValidationResult`]; there are
//! no retries. Only unexpected backend failures surface as errors.

pub mod config;
pub mod error;
pub mod result;
pub mod validator;

pub use config::{BridgeConfig, Driver, SessionConfig};
pub use error::ValidationError;
pub use result::{InvalidReason, Rejection, ValidationResult};
pub use validator::Validator;
