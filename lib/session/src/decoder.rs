//! Decoding of stored session payloads.

use crate::error::SessionDecodeError;
use crate::permissions::{Permissions, to_json};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use rootcause::prelude::{Report, ResultExt};
use sessionbridge_core::{UserId, security};
use sessionbridge_phpserde::{Array, ClassRegistry, Key, Unserializer, Value};

/// Key prefix the framework's `web` guard uses for the logged-in user ID.
const LOGIN_KEY_PREFIX: &str = "login_web_";

/// Key holding the CSRF token.
const CSRF_TOKEN_KEY: &str = "_token";

/// Key holding the second-factor verification marker.
const TWO_FACTOR_VERIFIED_KEY: &str = "2fa_verified";

/// Keys tried, in order, when no permission paths are configured.
const CONVENTIONAL_PERMISSION_KEYS: &[&str] = &[
    "permissions",
    "user_permissions",
    "role_permissions",
    "abilities",
    "user.permissions",
    "auth.permissions",
];

/// Longest payload excerpt written to trace logs.
const MAX_LOGGED_PAYLOAD_CHARS: usize = 512;

/// Decodes payloads with a shared class registry.
#[derive(Debug, Clone, Default)]
pub struct SessionDecoder {
    unserializer: Unserializer,
}

impl SessionDecoder {
    /// Creates a decoder that resolves classes through `registry`.
    #[must_use]
    pub fn new(registry: ClassRegistry) -> Self {
        Self {
            unserializer: Unserializer::new(registry),
        }
    }

    /// Returns the registry used by this decoder.
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        self.unserializer.registry()
    }

    /// Decodes a base64 session payload.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDecodeError`] if the payload is not base64, does not
    /// parse, or does not hold a map at the top level.
    pub fn decode(&self, payload: &str) -> Result<DecodedSession, Report<SessionDecodeError>> {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| SessionDecodeError::InvalidBase64 {
                reason: e.to_string(),
            })?;
        let text = String::from_utf8_lossy(&bytes);
        tracing::trace!(
            payload = %security::truncate(&security::redact(&text), MAX_LOGGED_PAYLOAD_CHARS),
            "decoding session payload"
        );

        let value = self
            .unserializer
            .unserialize(&bytes)
            .context(SessionDecodeError::Malformed)?;

        match value {
            Value::Array(entries) => Ok(DecodedSession { entries }),
            other => Err(SessionDecodeError::NotAMap {
                found: other.type_name(),
            }
            .into()),
        }
    }
}

/// Attributes of one session, in stored order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSession {
    entries: Array,
}

impl DecodedSession {
    /// Wraps already-parsed attributes.
    #[must_use]
    pub fn from_entries(entries: Array) -> Self {
        Self { entries }
    }

    /// Returns all attributes.
    #[must_use]
    pub fn entries(&self) -> &Array {
        &self.entries
    }

    /// Returns a top-level attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Key::from(key))
    }

    /// Resolves a dotted path such as `user.permissions`.
    ///
    /// Any missing segment makes the whole path missing. A key containing a
    /// literal dot is matched whole before the path is split.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.get(first)?;
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Returns the authenticated user ID.
    ///
    /// The first `login_web_*` key in stored order decides; its value must be
    /// an integer or a numeric string.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        let value = self.entries.iter().find_map(|(key, value)| {
            key.as_str()
                .filter(|k| k.starts_with(LOGIN_KEY_PREFIX))
                .map(|_| value)
        })?;
        match value {
            Value::Int(id) => UserId::from_signed(*id),
            Value::String(id) => id.parse().ok(),
            _ => None,
        }
    }

    /// Returns the CSRF token.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.get(CSRF_TOKEN_KEY).and_then(Value::as_str)
    }

    /// Returns true only if the verification marker is the string `"true"`.
    ///
    /// The marker is written as text; a stored boolean does not count.
    #[must_use]
    pub fn is_two_factor_verified(&self) -> bool {
        matches!(self.get(TWO_FACTOR_VERIFIED_KEY), Some(Value::String(s)) if s == "true")
    }

    /// Returns true only if the attribute is the boolean `true`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get_path(key), Some(Value::Bool(true)))
    }

    /// Extracts permission data.
    ///
    /// With no configured paths, the conventional keys are tried in order and
    /// the first present value wins. With one path its value is returned
    /// directly. With several, a map from path to value is returned; it is
    /// `None` only if every path is missing. Null values count as missing.
    #[must_use]
    pub fn permissions(&self, paths: &[String]) -> Option<Permissions> {
        match paths {
            [] => CONVENTIONAL_PERMISSION_KEYS
                .iter()
                .find_map(|key| self.present(key))
                .map(Permissions::from_value),
            [path] => self.present(path).map(Permissions::from_value),
            _ => {
                let named: IndexMap<String, Option<serde_json::Value>> = paths
                    .iter()
                    .map(|path| (path.clone(), self.present(path).map(to_json)))
                    .collect();
                named
                    .values()
                    .any(Option::is_some)
                    .then_some(Permissions::Named(named))
            }
        }
    }

    fn present(&self, path: &str) -> Option<&Value> {
        self.get_path(path).filter(|value| !value.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::ResolvedPermissions;
    use serde_json::json;

    fn decode_raw(raw: &str) -> DecodedSession {
        SessionDecoder::default()
            .decode(&STANDARD.encode(raw))
            .expect("payload decodes")
    }

    fn decode_err(payload: &str) -> SessionDecodeError {
        SessionDecoder::default()
            .decode(payload)
            .expect_err("payload should be rejected")
            .current_context()
            .clone()
    }

    const BASIC: &str = r#"a:2:{s:14:"login_web_59ba";i:42;s:6:"_token";s:6:"tok123";}"#;

    #[test]
    fn decodes_user_id_and_csrf_token() {
        let session = decode_raw(BASIC);
        assert_eq!(session.user_id(), Some(UserId::new(42)));
        assert_eq!(session.csrf_token(), Some("tok123"));
    }

    #[test]
    fn user_id_missing_without_login_key() {
        let session = decode_raw(r#"a:1:{s:6:"_token";s:3:"abc";}"#);
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn first_login_key_in_stored_order_wins() {
        let session = decode_raw(
            r#"a:2:{s:12:"login_web_zz";i:7;s:12:"login_web_aa";i:9;}"#,
        );
        assert_eq!(session.user_id(), Some(UserId::new(7)));
    }

    #[test]
    fn user_id_accepts_numeric_string() {
        let session = decode_raw(r#"a:1:{s:12:"login_web_ab";s:2:"15";}"#);
        assert_eq!(session.user_id(), Some(UserId::new(15)));
    }

    #[test]
    fn two_factor_marker_must_be_the_string_true() {
        assert!(decode_raw(r#"a:1:{s:12:"2fa_verified";s:4:"true";}"#).is_two_factor_verified());
        assert!(!decode_raw(r#"a:1:{s:12:"2fa_verified";b:1;}"#).is_two_factor_verified());
        assert!(!decode_raw(r#"a:1:{s:12:"2fa_verified";s:1:"1";}"#).is_two_factor_verified());
        assert!(!decode_raw(BASIC).is_two_factor_verified());
    }

    #[test]
    fn flag_requires_boolean_true() {
        let session = decode_raw(r#"a:2:{s:1:"a";b:1;s:1:"b";s:4:"true";}"#);
        assert!(session.flag("a"));
        assert!(!session.flag("b"));
        assert!(!session.flag("missing"));
    }

    #[test]
    fn get_path_traverses_maps_and_records() {
        let session = decode_raw(
            r#"a:2:{s:4:"user";O:8:"stdClass":1:{s:4:"meta";a:1:{s:4:"tier";s:4:"gold";}}s:5:"a.b.c";i:1;}"#,
        );
        assert_eq!(
            session.get_path("user.meta.tier"),
            Some(&Value::String("gold".to_string()))
        );
        assert_eq!(session.get_path("a.b.c"), Some(&Value::Int(1)));
        assert_eq!(session.get_path("user.missing.tier"), None);
        assert_eq!(session.get_path("user..meta"), None);
        assert_eq!(session.get_path(""), None);
    }

    #[test]
    fn permissions_check_conventional_keys_in_order() {
        let session = decode_raw(
            r#"a:2:{s:9:"abilities";a:1:{i:0;s:4:"read";}s:11:"permissions";N;}"#,
        );
        assert_eq!(
            session.permissions(&[]),
            Some(Permissions::Value(json!(["read"])))
        );
    }

    #[test]
    fn permissions_found_under_nested_user_path() {
        let session = decode_raw(
            r#"a:1:{s:4:"user";a:1:{s:11:"permissions";a:1:{s:7:"modules";a:1:{i:0;s:5:"users";}}}}"#,
        );
        let permissions = session.permissions(&[]).expect("found under user");
        assert!(matches!(permissions, Permissions::Resolved(ResolvedPermissions { ref modules, .. }) if modules == &["users"]));
    }

    #[test]
    fn permissions_none_when_nothing_matches() {
        assert_eq!(decode_raw(BASIC).permissions(&[]), None);
    }

    #[test]
    fn single_configured_path_returns_value_directly() {
        let session = decode_raw(r#"a:1:{s:3:"acl";a:1:{s:5:"level";i:3;}}"#);
        assert_eq!(
            session.permissions(&["acl.level".to_string()]),
            Some(Permissions::Value(json!(3)))
        );
        assert_eq!(session.permissions(&["acl.missing".to_string()]), None);
    }

    #[test]
    fn multiple_configured_paths_return_named_map() {
        let session = decode_raw(r#"a:1:{s:3:"acl";a:1:{s:5:"level";i:3;}}"#);
        let paths = vec!["acl.level".to_string(), "acl.missing".to_string()];
        let Some(Permissions::Named(named)) = session.permissions(&paths) else {
            panic!("expected named permissions");
        };
        assert_eq!(named.get("acl.level"), Some(&Some(json!(3))));
        assert_eq!(named.get("acl.missing"), Some(&None));
        let keys: Vec<&String> = named.keys().collect();
        assert_eq!(keys, vec!["acl.level", "acl.missing"]);

        let none = vec!["x".to_string(), "y".to_string()];
        assert_eq!(session.permissions(&none), None);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            decode_err("***"),
            SessionDecodeError::InvalidBase64 { .. }
        ));
    }

    #[test]
    fn wraps_parser_failures() {
        assert_eq!(
            decode_err(&STANDARD.encode(r#"a:1:{s:5:"x";i:1;}"#)),
            SessionDecodeError::Malformed
        );
        assert_eq!(
            decode_err(&STANDARD.encode(r#"O:7:"Unknown":0:{}"#)),
            SessionDecodeError::Malformed
        );
    }

    #[test]
    fn rejects_non_map_payload() {
        assert_eq!(
            decode_err(&STANDARD.encode("i:5;")),
            SessionDecodeError::NotAMap { found: "int" }
        );
    }

    #[test]
    fn registered_classes_decode_through_shared_registry() {
        let registry = ClassRegistry::new();
        let decoder = SessionDecoder::new(registry.clone());
        let payload = STANDARD.encode(r#"a:1:{s:4:"user";O:8:"App\User":0:{}}"#);
        assert!(decoder.decode(&payload).is_err());

        registry.register("App\\User", sessionbridge_phpserde::ClassShape::Generic);
        assert!(decoder.decode(&payload).is_ok());
    }
}
