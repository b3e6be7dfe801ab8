//! Reader and writer for the framework's native serialization format.
//!
//! Session payloads and encrypted cookies produced by the web framework are
//! encoded with a compact, type-tagged, length-prefixed text format:
//!
//! ```text
//! a:2:{s:14:"login_web_59ba";i:42;s:6:"_token";s:6:"tok123";}
//! ```
//!
//! This crate parses that format into a [`Value`] tree and writes it back.
//! Named objects (`O:` records) are only accepted when their class is known
//! to a [`ClassRegistry`], which maps each class name onto one of a small set
//! of reconstruction [`ClassShape`]s.
//!
//! # Example
//!
//! ```
//! use sessionbridge_phpserde::{ClassRegistry, Unserializer, Value};
//!
//! let unserializer = Unserializer::new(ClassRegistry::new());
//! let value = unserializer
//!     .unserialize(br#"a:1:{s:5:"roles";a:1:{i:0;s:5:"admin";}}"#)
//!     .expect("valid payload");
//!
//! let roles = value.get("roles").and_then(Value::as_array).expect("roles");
//! assert_eq!(roles.len(), 1);
//! ```

pub mod de;
pub mod error;
mod json;
pub mod registry;
pub mod ser;
pub mod value;

pub use de::{Unserializer, from_bytes, from_str};
pub use error::PhpSerdeError;
pub use registry::{ClassRegistry, ClassShape};
pub use ser::to_string;
pub use value::{Array, Key, Object, Value};
