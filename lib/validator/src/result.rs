//! The outcome of a validation.

use serde::Serialize;
use sessionbridge_session::Permissions;
use sessionbridge_store::LaravelUser;

/// Machine-readable tag for rejections callers may want to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvalidReason {
    /// The user's pinned session is a different one.
    #[serde(rename = "single_session_violation")]
    SingleSessionViolation,
    /// The user must complete second-factor verification.
    #[serde(rename = "2fa_required")]
    TwoFactorRequired,
}

/// Why a validation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoSessionId,
    CookieUnreadable,
    SessionNotFound,
    SessionExpired,
    DecodeFailed,
    NotAuthenticated,
    UserNotFound,
    LoggedInElsewhere,
    TwoFactorRequired,
}

impl Rejection {
    /// Human-readable message, stable across releases.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NoSessionId => "No session ID provided",
            Self::CookieUnreadable => "Invalid session cookie",
            Self::SessionNotFound => "Session not found",
            Self::SessionExpired => "Session expired",
            Self::DecodeFailed => "Failed to decode session",
            Self::NotAuthenticated => "User not authenticated",
            Self::UserNotFound => "User not found or deleted",
            Self::LoggedInElsewhere => "Session invalidated. You were logged in elsewhere.",
            Self::TwoFactorRequired => "Two-factor authentication required",
        }
    }

    /// Reason tag, for the rejections that carry one.
    #[must_use]
    pub fn reason(self) -> Option<InvalidReason> {
        match self {
            Self::LoggedInElsewhere => Some(InvalidReason::SingleSessionViolation),
            Self::TwoFactorRequired => Some(InvalidReason::TwoFactorRequired),
            _ => None,
        }
    }
}

/// Result of validating one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<LaravelUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<InvalidReason>,
}

impl ValidationResult {
    /// Creates a successful result.
    #[must_use]
    pub fn valid(
        user: LaravelUser,
        role: Option<String>,
        permissions: Option<Permissions>,
        session_id: String,
        csrf_token: Option<String>,
    ) -> Self {
        Self {
            valid: true,
            user: Some(user),
            role,
            permissions,
            session_id: Some(session_id),
            csrf_token,
            error: None,
            reason: None,
        }
    }

    /// Creates a failed result for the given rejection.
    #[must_use]
    pub fn invalid(rejection: Rejection) -> Self {
        Self {
            valid: false,
            user: None,
            role: None,
            permissions: None,
            session_id: None,
            csrf_token: None,
            error: Some(rejection.message().to_string()),
            reason: rejection.reason(),
        }
    }

    /// Returns the error message of a failed result.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sessionbridge_core::UserId;

    #[test]
    fn invalid_result_serializes_error_only() {
        let result = ValidationResult::invalid(Rejection::SessionExpired);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"valid": false, "error": "Session expired"})
        );
    }

    #[test]
    fn reason_tags_are_stable() {
        let result = ValidationResult::invalid(Rejection::TwoFactorRequired);
        assert_eq!(
            serde_json::to_value(&result).unwrap()["reason"],
            json!("2fa_required")
        );
        let result = ValidationResult::invalid(Rejection::LoggedInElsewhere);
        assert_eq!(result.reason, Some(InvalidReason::SingleSessionViolation));
        assert_eq!(
            result.error(),
            Some("Session invalidated. You were logged in elsewhere.")
        );
    }

    #[test]
    fn only_two_rejections_carry_a_reason() {
        for rejection in [
            Rejection::NoSessionId,
            Rejection::CookieUnreadable,
            Rejection::SessionNotFound,
            Rejection::SessionExpired,
            Rejection::DecodeFailed,
            Rejection::NotAuthenticated,
            Rejection::UserNotFound,
        ] {
            assert_eq!(rejection.reason(), None, "{rejection:?}");
        }
    }

    #[test]
    fn valid_result_serializes_camel_case() {
        let result = ValidationResult::valid(
            LaravelUser::new(UserId::new(42)),
            None,
            None,
            "abc123".to_string(),
            Some("tok123".to_string()),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["sessionId"], json!("abc123"));
        assert_eq!(value["csrfToken"], json!("tok123"));
        assert_eq!(value["user"]["id"], json!(42));
        assert!(value.get("role").is_none());
    }
}
