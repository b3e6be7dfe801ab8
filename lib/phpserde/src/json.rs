//! Serde projection of value trees.
//!
//! Mirrors the framework's own JSON encoding: maps whose keys are exactly
//! `0..n` become sequences, other maps become objects with stringified keys,
//! and records become objects keyed by bare property names.

use crate::value::{Array, Value, is_list, unmangle};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(entries) => serialize_entries(entries, serializer, false),
            Self::Object(object) => serialize_entries(object.fields(), serializer, true),
        }
    }
}

fn serialize_entries<S: Serializer>(
    entries: &Array,
    serializer: S,
    is_record: bool,
) -> Result<S::Ok, S::Error> {
    if !is_record && is_list(entries) {
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for value in entries.values() {
            seq.serialize_element(value)?;
        }
        return seq.end();
    }

    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (key, value) in entries {
        let name = key.to_string();
        map.serialize_entry(unmangle(&name), value)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use crate::de::from_str;
    use crate::registry::ClassRegistry;
    use serde_json::json;

    fn to_json(input: &str) -> serde_json::Value {
        let value = from_str(input, &ClassRegistry::new()).expect("parses");
        serde_json::to_value(&value).expect("serializes")
    }

    #[test]
    fn sequential_maps_become_arrays() {
        assert_eq!(
            to_json(r#"a:2:{i:0;s:5:"users";i:1;s:5:"posts";}"#),
            json!(["users", "posts"])
        );
        assert_eq!(to_json("a:0:{}"), json!([]));
    }

    #[test]
    fn sparse_or_string_keyed_maps_become_objects() {
        assert_eq!(
            to_json(r#"a:2:{i:3;b:1;s:4:"role";N;}"#),
            json!({"3": true, "role": null})
        );
    }

    #[test]
    fn records_use_bare_property_names() {
        assert_eq!(
            to_json("O:8:\"stdClass\":2:{s:4:\"\0*\0a\";i:1;s:1:\"b\";d:0.5;}"),
            json!({"a": 1, "b": 0.5})
        );
    }
}
