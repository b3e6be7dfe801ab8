//! Class-name registry for named records.
//!
//! Serialized objects name their class; the parser only reconstructs classes
//! it has been told about. Each known class maps to a [`ClassShape`] that
//! decides which accessors make sense on the resulting [`Object`](crate::Object).
//!
//! A registry is a cheap, cloneable handle: clones share one underlying map,
//! so several unserializers can agree on the same mappings while callers keep
//! registering classes at runtime.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// How a named record is reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassShape {
    /// Plain bag of properties.
    Generic,
    /// Wrapper around an ordered list of items.
    List,
    /// Date/time value with `date`, `timezone_type` and `timezone` fields.
    Date,
    /// Container of keyed validation or flash messages.
    MessageBag,
}

/// Framework classes known at startup.
const BUILTIN_CLASSES: &[(&str, ClassShape)] = &[
    ("stdClass", ClassShape::Generic),
    ("ArrayObject", ClassShape::List),
    ("ArrayIterator", ClassShape::List),
    ("Illuminate\\Support\\Collection", ClassShape::List),
    ("Illuminate\\Database\\Eloquent\\Collection", ClassShape::List),
    ("DateTime", ClassShape::Date),
    ("DateTimeImmutable", ClassShape::Date),
    ("Carbon\\Carbon", ClassShape::Date),
    ("Carbon\\CarbonImmutable", ClassShape::Date),
    ("Illuminate\\Support\\Carbon", ClassShape::Date),
    ("Illuminate\\Support\\MessageBag", ClassShape::MessageBag),
    ("Illuminate\\Support\\ViewErrorBag", ClassShape::MessageBag),
];

/// Thread-safe mapping from class name to reconstruction shape.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: Arc<RwLock<HashMap<String, ClassShape>>>,
}

impl ClassRegistry {
    /// Creates a registry pre-populated with the framework built-ins.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        for (class, shape) in BUILTIN_CLASSES {
            registry.register(*class, *shape);
        }
        registry
    }

    /// Creates a registry with no mappings.
    ///
    /// Built-in classes still parse through the fallback allow-list, but only
    /// as [`ClassShape::Generic`] records.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            classes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers or replaces the shape for a class.
    ///
    /// Class names are case-insensitive and a leading namespace separator is
    /// ignored, matching how the framework's runtime resolves them.
    pub fn register(&self, class: impl AsRef<str>, shape: ClassShape) {
        let key = normalize(class.as_ref());
        tracing::debug!(class = %class.as_ref(), ?shape, "registering class shape");
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, shape);
    }

    /// Returns the registered shape for a class, ignoring the allow-list.
    #[must_use]
    pub fn shape_of(&self, class: &str) -> Option<ClassShape> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(class))
            .copied()
    }

    /// Resolves the shape a record of this class is parsed into.
    ///
    /// Registered classes use their registered shape. Unregistered classes on
    /// the built-in allow-list fall back to a generic property bag. Anything
    /// else yields `None`.
    #[must_use]
    pub fn resolve(&self, class: &str) -> Option<ClassShape> {
        self.shape_of(class).or_else(|| {
            let key = normalize(class);
            BUILTIN_CLASSES
                .iter()
                .any(|(builtin, _)| normalize(builtin) == key)
                .then_some(ClassShape::Generic)
        })
    }

    /// Returns the number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(class: &str) -> String {
    class.trim_start_matches('\\').to_ascii_lowercase()
}
