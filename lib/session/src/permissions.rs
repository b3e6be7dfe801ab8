//! Permission data carried in sessions or resolved from the database.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sessionbridge_phpserde::Value;

/// Configured lookup path(s) for permission data.
///
/// Accepts either a single path or a list; paths use dot notation
/// (`user.permissions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionKeys {
    One(String),
    Many(Vec<String>),
}

impl PermissionKeys {
    /// Returns the configured paths, skipping blank entries.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let paths: Vec<&String> = match self {
            Self::One(path) => vec![path],
            Self::Many(paths) => paths.iter().collect(),
        };
        paths
            .into_iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<&str> for PermissionKeys {
    fn from(path: &str) -> Self {
        Self::One(path.to_string())
    }
}

impl From<Vec<String>> for PermissionKeys {
    fn from(paths: Vec<String>) -> Self {
        Self::Many(paths)
    }
}

/// Role and access lists in the shape the database fallback produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPermissions {
    /// First role name, if the user has any role.
    pub role: Option<String>,
    /// All role names.
    pub role_arr: Vec<String>,
    /// Accessible module names, deduplicated.
    pub modules: Vec<String>,
    /// Accessible link names, deduplicated.
    pub links: Vec<String>,
}

impl ResolvedPermissions {
    /// Builds a set from fallback query rows, deduplicating modules and links
    /// while keeping their first-seen order.
    #[must_use]
    pub fn from_rows(roles: Vec<String>, modules: Vec<String>, links: Vec<String>) -> Self {
        Self {
            role: roles.first().cloned(),
            role_arr: roles,
            modules: dedup(modules),
            links: dedup(links),
        }
    }

    /// Reads a session value that already has the resolved shape.
    ///
    /// The value must be a map with at least one of `role_arr`, `modules`, or
    /// `links`, each holding only strings; `role` must be a string or absent.
    /// Anything else returns `None` and is kept as a raw value by the caller.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.as_array().is_none() && value.as_object().is_none() {
            return None;
        }
        if ["role_arr", "modules", "links"]
            .iter()
            .all(|key| value.get(key).is_none())
        {
            return None;
        }

        let role = match value.get("role") {
            None | Some(Value::Null) => None,
            Some(Value::String(role)) => Some(role.clone()),
            Some(_) => return None,
        };
        Some(Self {
            role,
            role_arr: string_list(value.get("role_arr"))?,
            modules: string_list(value.get("modules"))?,
            links: string_list(value.get("links"))?,
        })
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(entries)) => entries
            .values()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(_) => None,
    }
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Permission data attached to a validation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Permissions {
    /// Role/module/link structure from the session or the database.
    Resolved(ResolvedPermissions),
    /// A single configured path whose value has some other shape.
    Value(serde_json::Value),
    /// Several configured paths, keyed by path; missing paths map to `None`.
    Named(IndexMap<String, Option<serde_json::Value>>),
}

impl Permissions {
    /// Wraps a single extracted session value, normalizing it when it has
    /// the resolved shape.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match ResolvedPermissions::from_value(value) {
            Some(resolved) => Self::Resolved(resolved),
            None => Self::Value(to_json(value)),
        }
    }

    /// Returns the primary role, if this permission set names one.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Resolved(resolved) => resolved.role.as_deref(),
            Self::Value(value) => value.get("role").and_then(serde_json::Value::as_str),
            Self::Named(_) => None,
        }
    }
}

pub(crate) fn to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not convert session value to JSON");
        serde_json::Value::Null
    })
}
