//! Writer for serialized text.
//!
//! Output re-parses to an equal tree. It is not guaranteed to match the
//! bytes the framework produced: floats are written in their shortest
//! round-tripping form, and strings that were not valid UTF-8 were already
//! normalized by the parser.

use crate::value::{Array, Key, Value};
use std::fmt::Write as _;

/// Serializes a value tree.
#[must_use]
pub fn to_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => {
            let _ = write!(out, "b:{};", u8::from(*b));
        }
        Value::Int(i) => {
            let _ = write!(out, "i:{i};");
        }
        Value::Float(f) => {
            out.push_str("d:");
            write_float(out, *f);
            out.push(';');
        }
        Value::String(s) => {
            write_string(out, s);
            out.push(';');
        }
        Value::Array(entries) => {
            out.push_str("a:");
            write_entries(out, entries);
        }
        Value::Object(object) => {
            out.push_str("O:");
            write_string(out, object.class());
            out.push(':');
            write_entries(out, object.fields());
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    let _ = write!(out, "{}:\"{s}\"", s.len());
}

fn write_float(out: &mut String, f: f64) {
    if f.is_nan() {
        out.push_str("NAN");
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "INF" } else { "-INF" });
    } else {
        let _ = write!(out, "{f}");
    }
}

fn write_entries(out: &mut String, entries: &Array) {
    let _ = write!(out, "{}:{{", entries.len());
    for (key, value) in entries {
        match key {
            Key::Int(i) => {
                let _ = write!(out, "i:{i};");
            }
            Key::Str(s) => {
                out.push('s');
                out.push(':');
                write_string(out, s);
                out.push(';');
            }
        }
        write_value(out, value);
    }
    out.push('}');
}
