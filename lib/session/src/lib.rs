//! Session payload decoding for sessionbridge.
//!
//! The framework stores each session as `base64(serialize($attributes))`.
//! This crate turns that blob into a [`DecodedSession`] and offers typed
//! accessors for the parts the validator cares about:
//!
//! - the authenticated user ID (`login_web_<hash>` key)
//! - the CSRF token (`_token`)
//! - permission data, either from configured dotted paths or from a set of
//!   conventional keys
//! - the second-factor verification marker
//!
//! # Example
//!
//! ```
//! use base64::Engine;
//! use sessionbridge_session::SessionDecoder;
//!
//! let raw = r#"a:2:{s:14:"login_web_59ba";i:42;s:6:"_token";s:6:"tok123";}"#;
//! let payload = base64::engine::general_purpose::STANDARD.encode(raw);
//!
//! let session = SessionDecoder::default().decode(&payload).expect("valid payload");
//! assert_eq!(session.user_id().map(|id| id.get()), Some(42));
//! assert_eq!(session.csrf_token(), Some("tok123"));
//! ```

pub mod decoder;
pub mod error;
pub mod permissions;

pub use decoder::{DecodedSession, SessionDecoder};
pub use error::SessionDecodeError;
pub use permissions::{PermissionKeys, Permissions, ResolvedPermissions};
