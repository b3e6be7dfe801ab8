//! Log sanitization for sensitive values.
//!
//! Decrypted cookie contents, session payload dumps, and key material must
//! never reach the logs verbatim unless an operator explicitly asked for it.
//! A single process-wide switch controls this; it is normally set once at
//! startup from configuration.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_LOGGING: AtomicBool = AtomicBool::new(false);

/// Number of leading characters kept when a value is redacted.
const REDACTED_PREFIX_CHARS: usize = 4;

/// Enables or disables unredacted diagnostic logging.
pub fn set_debug_logging(enabled: bool) {
    let previous = DEBUG_LOGGING.swap(enabled, Ordering::SeqCst);
    if previous != enabled {
        tracing::info!(enabled, "debug logging of sensitive values changed");
    }
}

/// Returns true if secrets may be logged unredacted.
#[must_use]
pub fn debug_logging_enabled() -> bool {
    DEBUG_LOGGING.load(Ordering::SeqCst)
}

/// Renders a secret for logging.
///
/// With debug logging enabled the value is returned unchanged. Otherwise only
/// a short prefix and the total length survive.
#[must_use]
pub fn redact(secret: &str) -> String {
    if debug_logging_enabled() {
        return secret.to_string();
    }
    redact_always(secret)
}

/// Shortens `text` to at most `max` characters, appending a marker when cut.
///
/// Unlike [`redact`], this applies regardless of the debug switch; it is for
/// bounding log line size, not for hiding secrets.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{kept}...({total} chars)")
}

fn redact_always(secret: &str) -> String {
    let total = secret.chars().count();
    if total <= REDACTED_PREFIX_CHARS {
        return format!("[redacted {total} chars]");
    }
    let prefix: String = secret.chars().take(REDACTED_PREFIX_CHARS).collect();
    format!("{prefix}...[redacted {total} chars]")
}
