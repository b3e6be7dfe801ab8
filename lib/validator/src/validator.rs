//! The validation state machine.

use crate::config::{BridgeConfig, Driver};
use crate::error::ValidationError;
use crate::result::{Rejection, ValidationResult};
use rootcause::prelude::{Report, ResultExt};
use sessionbridge_cookie::AppKey;
use sessionbridge_core::{UserId, security};
use sessionbridge_phpserde::ClassRegistry;
use sessionbridge_session::{DecodedSession, Permissions, SessionDecoder};
use sessionbridge_store::{DatabaseStore, SessionStore, StoreOptions};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Role whose users may hold only one live session.
const SINGLE_SESSION_ROLE: &str = "admin";

/// Validates sessions against a [`SessionStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct Validator {
    store: Arc<dyn SessionStore>,
    decoder: SessionDecoder,
    lifetime_minutes: i64,
    permission_paths: Vec<String>,
    app_key: Option<AppKey>,
    cookie_name: String,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("lifetime_minutes", &self.lifetime_minutes)
            .field("permission_paths", &self.permission_paths)
            .field("app_key", &self.app_key.is_some())
            .field("cookie_name", &self.cookie_name)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Creates a validator with a 1000-minute lifetime, the built-in class
    /// registry, and conventional permission keys.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let defaults = crate::config::SessionConfig::default();
        Self {
            store,
            decoder: SessionDecoder::default(),
            lifetime_minutes: defaults.lifetime_minutes,
            permission_paths: Vec::new(),
            app_key: None,
            cookie_name: defaults.cookie_name,
        }
    }

    #[must_use]
    pub fn with_lifetime_minutes(mut self, minutes: i64) -> Self {
        self.lifetime_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: SessionDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn with_permission_paths(mut self, paths: Vec<String>) -> Self {
        self.permission_paths = paths;
        self
    }

    /// Sets the key used by [`Validator::validate_cookie`].
    #[must_use]
    pub fn with_app_key(mut self, key: AppKey) -> Self {
        self.app_key = Some(key);
        self
    }

    /// Sets the cookie looked up by [`Validator::validate_cookie_header`].
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Connects the configured backend and builds a validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or the backend
    /// cannot be reached.
    pub async fn from_config(config: &BridgeConfig) -> Result<Self, Report<ValidationError>> {
        Self::from_config_with_registry(config, ClassRegistry::new()).await
    }

    /// Like [`Validator::from_config`], decoding with a caller-supplied
    /// class registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or the backend
    /// cannot be reached.
    pub async fn from_config_with_registry(
        config: &BridgeConfig,
        registry: ClassRegistry,
    ) -> Result<Self, Report<ValidationError>> {
        security::set_debug_logging(config.debug);

        let app_key = config.app_key().context(ValidationError::Config {
            details: "app_key is not a usable key".to_string(),
        })?;
        let decoder = SessionDecoder::new(registry);
        let permission_paths = config.permission_paths();
        let options = StoreOptions {
            tables: config.tables.clone(),
            decoder: decoder.clone(),
            permission_paths: permission_paths.clone(),
        };
        let database = DatabaseStore::connect(&config.database, options)
            .await
            .context(ValidationError::Store)?;

        let store = connect_store(config, database).await?;
        info!(driver = ?config.driver, "session store connected");

        let mut validator = Self::new(store)
            .with_decoder(decoder)
            .with_lifetime_minutes(config.session.lifetime_minutes)
            .with_permission_paths(permission_paths)
            .with_cookie_name(config.session.cookie_name.clone());
        validator.app_key = app_key;
        Ok(validator)
    }

    /// Validates the session referenced by an encrypted session cookie.
    ///
    /// Without a configured app key, the cookie value is taken to be the bare
    /// session ID.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails; see [`Validator::validate`].
    pub async fn validate_cookie(
        &self,
        cookie: &str,
    ) -> Result<ValidationResult, Report<ValidationError>> {
        let Some(key) = &self.app_key else {
            return self.validate(cookie).await;
        };
        if cookie.trim().is_empty() {
            return Ok(ValidationResult::invalid(Rejection::NoSessionId));
        }
        match sessionbridge_cookie::decrypt(cookie, key) {
            Ok(session_id) => self.validate(&session_id).await,
            Err(report) => {
                warn!(error = %report, "session cookie could not be decrypted");
                Ok(ValidationResult::invalid(Rejection::CookieUnreadable))
            }
        }
    }

    /// Validates the session cookie carried in a `Cookie` request header.
    ///
    /// A header without the configured session cookie is an invalid result
    /// with [`Rejection::NoSessionId`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails; see [`Validator::validate`].
    pub async fn validate_cookie_header(
        &self,
        header: &str,
    ) -> Result<ValidationResult, Report<ValidationError>> {
        match sessionbridge_cookie::find_cookie(header, &self.cookie_name) {
            Some(cookie) => self.validate_cookie(cookie).await,
            None => {
                debug!(cookie_name = %self.cookie_name, "no session cookie in header");
                Ok(ValidationResult::invalid(Rejection::NoSessionId))
            }
        }
    }

    /// Validates a session ID against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Store`] if reading the session or the user
    /// fails. Every other failure is an invalid result.
    pub async fn validate(
        &self,
        session_id: &str,
    ) -> Result<ValidationResult, Report<ValidationError>> {
        self.validate_at(session_id, chrono::Utc::now().timestamp())
            .await
    }

    /// Validates a session ID as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Store`] if reading the session or the user
    /// fails. Every other failure is an invalid result.
    #[instrument(skip(self, session_id), fields(session = %security::redact(session_id)))]
    pub async fn validate_at(
        &self,
        session_id: &str,
        now: i64,
    ) -> Result<ValidationResult, Report<ValidationError>> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Ok(reject(Rejection::NoSessionId));
        }

        let Some(record) = self
            .store
            .get_session(session_id)
            .await
            .context(ValidationError::Store)?
        else {
            return Ok(reject(Rejection::SessionNotFound));
        };

        if self.is_expired(record.last_activity, now) {
            return Ok(reject(Rejection::SessionExpired));
        }

        let session = match self.decoder.decode(&record.payload) {
            Ok(session) => session,
            Err(report) => {
                warn!(error = %report, "session payload could not be decoded");
                return Ok(reject(Rejection::DecodeFailed));
            }
        };

        let Some(user_id) = session.user_id() else {
            return Ok(reject(Rejection::NotAuthenticated));
        };

        let Some(user) = self
            .store
            .get_user(user_id)
            .await
            .context(ValidationError::Store)?
        else {
            return Ok(reject(Rejection::UserNotFound));
        };

        let role = match self.store.get_user_role(user_id).await {
            Ok(role) => role,
            Err(report) => {
                warn!(user_id = %user_id, error = %report, "role lookup failed");
                None
            }
        };

        if role.as_deref() == Some(SINGLE_SESSION_ROLE) {
            if let Some(pinned) = user.session_id.as_deref() {
                if pinned != session_id {
                    debug!(user_id = %user_id, "session superseded by a newer login");
                    return Ok(reject(Rejection::LoggedInElsewhere));
                }
            }
        }

        if user.two_factor_enabled() && !session.is_two_factor_verified() {
            return Ok(reject(Rejection::TwoFactorRequired));
        }

        let permissions = self.resolve_permissions(&session, user_id).await;
        let csrf_token = session.csrf_token().map(str::to_string);
        debug!(user_id = %user_id, role = ?role, "session valid");
        Ok(ValidationResult::valid(
            user,
            role,
            permissions,
            session_id.to_string(),
            csrf_token,
        ))
    }

    /// Releases the store's connections.
    pub async fn close(&self) {
        self.store.close().await;
    }

    /// A session is expired once more than the lifetime has passed since its
    /// last activity; exactly the lifetime is still live.
    fn is_expired(&self, last_activity: i64, now: i64) -> bool {
        now.saturating_sub(last_activity) > self.lifetime_minutes.saturating_mul(60)
    }

    /// Permission data from the session itself, else from the store. Lookup
    /// failures leave permissions unset.
    async fn resolve_permissions(
        &self,
        session: &DecodedSession,
        user_id: UserId,
    ) -> Option<Permissions> {
        if let Some(permissions) = session.permissions(&self.permission_paths) {
            return Some(permissions);
        }
        match self.store.get_user_permissions(user_id).await {
            Ok(permissions) => permissions,
            Err(report) => {
                warn!(user_id = %user_id, error = %report, "permission lookup failed");
                None
            }
        }
    }
}

fn reject(rejection: Rejection) -> ValidationResult {
    debug!(reason = rejection.message(), "session rejected");
    ValidationResult::invalid(rejection)
}

async fn connect_store(
    config: &BridgeConfig,
    database: DatabaseStore,
) -> Result<Arc<dyn SessionStore>, Report<ValidationError>> {
    match config.driver {
        Driver::Database => Ok(Arc::new(database)),
        #[cfg(feature = "redis")]
        Driver::Redis => {
            let redis = config.redis.as_ref().ok_or_else(|| ValidationError::Config {
                details: "redis driver selected without redis settings".to_string(),
            })?;
            let store = sessionbridge_store::RedisStore::connect(redis, database)
                .await
                .context(ValidationError::Store)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        Driver::Redis => Err(ValidationError::Config {
            details: "redis driver selected but redis support is not compiled in".to_string(),
        }
        .into()),
    }
}
