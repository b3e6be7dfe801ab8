//! Rows read from the framework's storage.

use serde::Serialize;
use sessionbridge_core::UserId;

/// A stored session, exactly as read from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    /// Owning user, when the backend records it outside the payload.
    pub user_id: Option<UserId>,
    /// Base64-encoded serialized attributes.
    pub payload: String,
    /// Unix timestamp of the last request that touched the session.
    pub last_activity: i64,
}

/// Columns never copied into [`LaravelUser::extra`].
pub(crate) const HIDDEN_USER_COLUMNS: &[&str] = &[
    "password",
    "remember_token",
    "google2fa_secret",
    "two_factor_secret",
    "two_factor_recovery_codes",
];

/// A row of the framework's users table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaravelUser {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Second-factor switch as stored; may be a number or a string.
    pub google2fa_enable: serde_json::Value,
    /// Session the user is pinned to, if single-session login is in effect.
    pub session_id: Option<String>,
    /// Every other non-secret column.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LaravelUser {
    /// Creates a user with only an ID.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            name: None,
            google2fa_enable: serde_json::Value::Null,
            session_id: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Builds a user from a column-name to value map.
    ///
    /// Returns `None` if the `id` column is missing or not a positive integer.
    #[must_use]
    pub fn from_columns(mut columns: serde_json::Map<String, serde_json::Value>) -> Option<Self> {
        let id = match columns.remove("id")? {
            serde_json::Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_i64().and_then(|i| u64::try_from(i).ok()))?,
            serde_json::Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        if id == 0 {
            return None;
        }
        let take_string = |columns: &mut serde_json::Map<String, serde_json::Value>, name: &str| {
            match columns.remove(name) {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            }
        };

        let email = take_string(&mut columns, "email");
        let name = take_string(&mut columns, "name");
        let session_id = take_string(&mut columns, "session_id");
        let google2fa_enable = columns
            .remove("google2fa_enable")
            .unwrap_or(serde_json::Value::Null);
        for hidden in HIDDEN_USER_COLUMNS {
            columns.remove(*hidden);
        }

        Some(Self {
            id: UserId::new(id),
            email,
            name,
            google2fa_enable,
            session_id,
            extra: columns,
        })
    }

    /// Returns true if second-factor login is switched on.
    ///
    /// Only the number `1` or the string `"1"` count; other truthy values
    /// such as `true` or `"yes"` do not.
    #[must_use]
    pub fn two_factor_enabled(&self) -> bool {
        match &self.google2fa_enable {
            serde_json::Value::Number(n) => n.as_i64() == Some(1) || n.as_u64() == Some(1),
            serde_json::Value::String(s) => s == "1",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn from_columns_maps_known_fields_and_keeps_extra() {
        let user = LaravelUser::from_columns(columns(json!({
            "id": 42,
            "email": "a@b.com",
            "name": "Ada",
            "google2fa_enable": 0,
            "session_id": null,
            "department": "ops",
            "password": "$2y$10$hash",
            "remember_token": "tok",
        })))
        .expect("valid user");

        assert_eq!(user.id, UserId::new(42));
        assert_eq!(user.email.as_deref(), Some("a@b.com"));
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert!(user.session_id.is_none());
        assert!(!user.two_factor_enabled());
        assert_eq!(user.extra.get("department"), Some(&json!("ops")));
        assert!(!user.extra.contains_key("password"));
        assert!(!user.extra.contains_key("remember_token"));
    }

    #[test]
    fn from_columns_requires_positive_id() {
        assert!(LaravelUser::from_columns(columns(json!({"email": "x"}))).is_none());
        assert!(LaravelUser::from_columns(columns(json!({"id": 0}))).is_none());
        assert!(LaravelUser::from_columns(columns(json!({"id": "7"}))).is_some());
    }

    #[test]
    fn two_factor_flag_matches_one_exactly() {
        let mut user = LaravelUser::new(UserId::new(1));
        user.google2fa_enable = json!(1);
        assert!(user.two_factor_enabled());
        user.google2fa_enable = json!("1");
        assert!(user.two_factor_enabled());
        user.google2fa_enable = json!(true);
        assert!(!user.two_factor_enabled());
        user.google2fa_enable = json!("true");
        assert!(!user.two_factor_enabled());
        user.google2fa_enable = json!(2);
        assert!(!user.two_factor_enabled());
        user.google2fa_enable = serde_json::Value::Null;
        assert!(!user.two_factor_enabled());
    }

    #[test]
    fn serializes_flat() {
        let mut user = LaravelUser::new(UserId::new(5));
        user.extra.insert("team".to_string(), json!("blue"));
        let value = serde_json::to_value(&user).expect("serialize");
        assert_eq!(value["id"], json!(5));
        assert_eq!(value["team"], json!("blue"));
    }
}
