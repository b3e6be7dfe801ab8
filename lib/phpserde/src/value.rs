//! The value tree produced by the parser.

use crate::registry::ClassShape;
use indexmap::IndexMap;
use std::fmt;

/// Ordered map used for both arrays and object fields.
///
/// Entries keep their wire order; integer and string keys may be mixed.
pub type Array = IndexMap<Key, Value>;

/// A key inside an ordered map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// Returns the key as a string slice if it is a string key.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// A parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// String payload as text.
    ///
    /// Conversion is lossy: bytes that are not valid UTF-8 are replaced with
    /// U+FFFD, so the stored length may differ from the declared byte length
    /// and binary values do not survive a round trip.
    String(String),
    Array(Array),
    Object(Object),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Looks up a child by name.
    ///
    /// For arrays a numeric name also matches the equivalent integer key, the
    /// same way the framework's runtime normalizes `"3"` to `3`. For objects
    /// the name is matched against fields with visibility markers removed.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Array(entries) => lookup(entries, name),
            Self::Object(object) => object.field(name),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

fn lookup<'a>(entries: &'a Array, name: &str) -> Option<&'a Value> {
    if let Some(value) = entries.get(&Key::Str(name.to_string())) {
        return Some(value);
    }
    name.parse::<i64>()
        .ok()
        .filter(|i| i.to_string() == name)
        .and_then(|i| entries.get(&Key::Int(i)))
}

/// Returns true if the keys are exactly `0..len` in order.
pub(crate) fn is_list(entries: &Array) -> bool {
    entries
        .keys()
        .enumerate()
        .all(|(index, key)| matches!(key, Key::Int(i) if usize::try_from(*i) == Ok(index)))
}

/// Strips the visibility marker from a serialized property name.
///
/// Protected properties are written as `\0*\0name` and private ones as
/// `\0Class\0name`; public properties carry no marker.
#[must_use]
pub fn unmangle(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('\0') {
        if let Some(end) = rest.find('\0') {
            return &rest[end + 1..];
        }
    }
    name
}

/// A named record reconstructed from an `O:` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    class: String,
    shape: ClassShape,
    fields: Array,
}

impl Object {
    /// Creates a record with the given class name, shape, and fields.
    #[must_use]
    pub fn new(class: impl Into<String>, shape: ClassShape, fields: Array) -> Self {
        Self {
            class: class.into(),
            shape,
            fields,
        }
    }

    /// Returns the class name exactly as it appeared on the wire.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Returns the reconstruction shape selected for this class.
    #[must_use]
    pub fn shape(&self) -> ClassShape {
        self.shape
    }

    /// Returns the raw fields, visibility markers included.
    #[must_use]
    pub fn fields(&self) -> &Array {
        &self.fields
    }

    /// Looks up a field by its bare property name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        if let Some(value) = lookup(&self.fields, name) {
            return Some(value);
        }
        self.fields.iter().find_map(|(key, value)| match key {
            Key::Str(raw) if unmangle(raw) == name => Some(value),
            _ => None,
        })
    }

    /// Returns the wrapped entries of a list-like record.
    ///
    /// Collections keep them in an `items` property; `ArrayObject` stores its
    /// storage array as the second positional field.
    #[must_use]
    pub fn items(&self) -> Option<&Array> {
        if self.shape != ClassShape::List {
            return None;
        }
        self.field("items")
            .or_else(|| self.fields.get(&Key::Int(1)))
            .or_else(|| self.field("storage"))
            .and_then(Value::as_array)
    }

    /// Returns the date text of a date-like record, e.g. `2024-01-31 10:00:00.000000`.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        if self.shape != ClassShape::Date {
            return None;
        }
        self.field("date").and_then(Value::as_str)
    }

    /// Returns the timezone name of a date-like record.
    #[must_use]
    pub fn timezone(&self) -> Option<&str> {
        if self.shape != ClassShape::Date {
            return None;
        }
        self.field("timezone").and_then(Value::as_str)
    }

    /// Returns the messages of a message-bag record.
    ///
    /// A bag of bags (the view error container) yields the messages of its
    /// `default` bag.
    #[must_use]
    pub fn messages(&self) -> Option<&Array> {
        if self.shape != ClassShape::MessageBag {
            return None;
        }
        if let Some(messages) = self.field("messages").and_then(Value::as_array) {
            return Some(messages);
        }
        self.field("bags")
            .and_then(|bags| bags.get("default"))
            .and_then(Value::as_object)
            .and_then(Object::messages)
    }
}
