//! Storage backends for sessionbridge.
//!
//! The validator reads everything it needs through the [`SessionStore`]
//! trait. Two implementations are provided:
//!
//! - [`DatabaseStore`]: sessions, users, and role/permission join tables in
//!   the framework's MySQL database.
//! - `RedisStore` (feature `redis`, on by default): sessions in the
//!   framework's Redis cache; all user and permission queries go to an inner
//!   [`DatabaseStore`].
//!
//! A missing row is `Ok(None)`, never an error. Backend failures surface as
//! [`StoreError`] reports.

pub mod config;
pub mod database;
pub mod error;
pub mod record;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;

pub use config::{DatabaseConfig, RedisConfig, StoreOptions, TableNames};
pub use database::DatabaseStore;
pub use error::StoreError;
pub use record::{LaravelUser, SessionRecord};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use store::SessionStore;
