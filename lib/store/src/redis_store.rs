//! Redis-backed session store.
//!
//! Only sessions live in Redis. Users, roles, and permissions are always read
//! from the relational database through an inner [`DatabaseStore`].

use crate::config::RedisConfig;
use crate::database::DatabaseStore;
use crate::error::StoreError;
use crate::record::{LaravelUser, SessionRecord};
use crate::store::SessionStore;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use rootcause::prelude::Report;
use sessionbridge_core::UserId;
use sessionbridge_phpserde::{ClassRegistry, Value, from_str};
use sessionbridge_session::Permissions;
use tracing::{debug, instrument};

/// Session store reading from the framework's Redis cache.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    prefix: String,
    database: DatabaseStore,
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(
        config: &RedisConfig,
        database: DatabaseStore,
    ) -> Result<Self, Report<StoreError>> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            StoreError::Connection {
                details: e.to_string(),
            }
        })?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection {
                details: e.to_string(),
            })?;
        debug!("redis connection established");
        Ok(Self {
            connection,
            prefix: config.prefix.clone(),
            database,
        })
    }

    fn key(&self, id: &str) -> String {
        session_key(&self.prefix, id)
    }
}

fn session_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}

/// Brings a cached session value into the database payload form.
///
/// The cache layer serializes the already-serialized attributes a second
/// time, producing `s:<len>:"a:...";`. That outer layer is removed and the
/// result base64-encoded. Values that are already base64 pass through.
fn normalize_cached_payload(raw: &str) -> String {
    let unwrapped = match from_str(raw, &ClassRegistry::empty()) {
        Ok(Value::String(inner)) => inner,
        _ => raw.to_string(),
    };
    // ':' never occurs in base64, so this only matches serialized text.
    if unwrapped.contains(':') {
        STANDARD.encode(unwrapped)
    } else {
        unwrapped
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    #[instrument(skip(self, id))]
    async fn get_session(&self, id: &str) -> Result<Option<SessionRecord>, Report<StoreError>> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection
            .get(self.key(id))
            .await
            .map_err(StoreError::query)?;

        // Entries expire by TTL, so a value that is still present counts as
        // active now.
        Ok(raw.map(|raw| SessionRecord {
            id: id.to_string(),
            user_id: None,
            payload: normalize_cached_payload(&raw),
            last_activity: chrono::Utc::now().timestamp(),
        }))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<LaravelUser>, Report<StoreError>> {
        self.database.get_user(id).await
    }

    async fn get_user_role(&self, id: UserId) -> Result<Option<String>, Report<StoreError>> {
        self.database.get_user_role(id).await
    }

    async fn get_user_permissions(
        &self,
        id: UserId,
    ) -> Result<Option<Permissions>, Report<StoreError>> {
        self.database.get_user_permissions(id).await
    }

    async fn close(&self) {
        self.database.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionbridge_session::SessionDecoder;

    #[test]
    fn session_key_prepends_prefix() {
        assert_eq!(session_key("laravel_session:", "abc"), "laravel_session:abc");
    }

    #[test]
    fn double_serialized_value_is_unwrapped_and_encoded() {
        let inner = r#"a:1:{s:6:"_token";s:3:"tok";}"#;
        let cached = format!("s:{}:\"{inner}\";", inner.len());
        let payload = normalize_cached_payload(&cached);
        assert_eq!(payload, STANDARD.encode(inner));

        let session = SessionDecoder::default().decode(&payload).expect("decodes");
        assert_eq!(session.csrf_token(), Some("tok"));
    }

    #[test]
    fn bare_serialized_value_is_encoded() {
        let inner = r#"a:0:{}"#;
        assert_eq!(normalize_cached_payload(inner), STANDARD.encode(inner));
    }

    #[test]
    fn base64_value_passes_through() {
        let encoded = STANDARD.encode("a:0:{}");
        assert_eq!(normalize_cached_payload(&encoded), encoded);
    }
}
