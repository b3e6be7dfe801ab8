//! Decryption of the framework's encrypted session cookie.
//!
//! The session cookie does not carry the session ID in the clear. It carries
//! a base64-wrapped JSON envelope:
//!
//! ```text
//! base64({"iv": "<b64>", "value": "<b64 ciphertext>", "mac": "<hex>", "tag": ""})
//! ```
//!
//! The MAC is HMAC-SHA256 over the base64 *text* of `iv` followed by the
//! base64 *text* of `value`, keyed with the application key. The ciphertext
//! is AES-CBC with PKCS#7 padding; the key length picks AES-128 or AES-256.
//!
//! The decrypted value is usually itself a serialized string whose content is
//! `<prefix hash>|<session id>`; [`decrypt`] strips both layers and returns
//! the bare session ID.

pub mod decrypt;
pub mod error;
pub mod header;
pub mod key;

pub use decrypt::{decrypt, strip_value_prefix};
pub use error::DecryptionError;
pub use header::find_cookie;
pub use key::AppKey;
