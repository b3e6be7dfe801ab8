//! Recursive-descent parser for serialized text.
//!
//! The grammar is type-tagged and length-prefixed:
//!
//! | tag | form                                   |
//! |-----|----------------------------------------|
//! | `N` | `N;`                                   |
//! | `b` | `b:0;` / `b:1;`                        |
//! | `i` | `i:-12;`                               |
//! | `d` | `d:0.5;` / `d:INF;` / `d:NAN;`         |
//! | `s` | `s:<bytes>:"<raw>";`                   |
//! | `a` | `a:<count>:{<key><value>...}`          |
//! | `O` | `O:<bytes>:"<class>":<count>:{...}`    |
//!
//! String payloads may contain any byte, including `"` and `;`, so the
//! parser walks a byte cursor and trusts declared lengths instead of
//! scanning for delimiters.

use crate::error::PhpSerdeError;
use crate::registry::ClassRegistry;
use crate::value::{Array, Key, Object, Value};
use rootcause::prelude::Report;

/// Maximum nesting of arrays and records.
///
/// Each level costs several recursive frames; this bound keeps the deepest
/// accepted input within a 2 MiB thread stack in unoptimized builds.
const MAX_DEPTH: usize = 128;

/// Parses serialized bytes using the given registry.
///
/// # Errors
///
/// Returns [`PhpSerdeError`] on truncated input, length mismatches, unknown
/// tags, unknown classes, or trailing bytes after the value.
pub fn from_bytes(input: &[u8], registry: &ClassRegistry) -> Result<Value, Report<PhpSerdeError>> {
    let mut parser = Parser::new(input, registry);
    let value = parser.parse_value(0)?;
    if parser.pos != input.len() {
        return Err(PhpSerdeError::TrailingData { offset: parser.pos }.into());
    }
    Ok(value)
}

/// Parses serialized text using the given registry.
///
/// # Errors
///
/// See [`from_bytes`].
pub fn from_str(input: &str, registry: &ClassRegistry) -> Result<Value, Report<PhpSerdeError>> {
    from_bytes(input.as_bytes(), registry)
}

/// A parser bound to a class registry.
#[derive(Debug, Clone, Default)]
pub struct Unserializer {
    registry: ClassRegistry,
}

impl Unserializer {
    /// Creates an unserializer that resolves classes through `registry`.
    #[must_use]
    pub fn new(registry: ClassRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry shared with this unserializer.
    #[must_use]
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Parses serialized bytes.
    ///
    /// # Errors
    ///
    /// See [`from_bytes`].
    pub fn unserialize(&self, input: &[u8]) -> Result<Value, Report<PhpSerdeError>> {
        from_bytes(input, &self.registry)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    registry: &'a ClassRegistry,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8], registry: &'a ClassRegistry) -> Self {
        Self {
            input,
            pos: 0,
            registry,
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, PhpSerdeError> {
        let offset = self.pos;
        let tag = self.next_byte()?;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let (text, at) = self.read_until(b';')?;
                match text {
                    b"0" => Ok(Value::Bool(false)),
                    b"1" => Ok(Value::Bool(true)),
                    _ => Err(invalid_number(at, text)),
                }
            }
            b'i' => {
                self.expect(b':')?;
                let (text, at) = self.read_until(b';')?;
                parse_int(text, at).map(Value::Int)
            }
            b'd' => {
                self.expect(b':')?;
                let (text, at) = self.read_until(b';')?;
                parse_float(text, at).map(Value::Float)
            }
            b's' => {
                self.expect(b':')?;
                let text = self.read_string_body()?;
                self.expect(b';')?;
                Ok(Value::String(text))
            }
            b'a' => {
                self.expect(b':')?;
                let entries = self.read_entries(depth)?;
                Ok(Value::Array(entries))
            }
            b'O' => {
                self.expect(b':')?;
                let class = self.read_string_body()?;
                let shape = self
                    .registry
                    .resolve(&class)
                    .ok_or_else(|| PhpSerdeError::UnknownClass {
                        class: class.clone(),
                    })?;
                self.expect(b':')?;
                let fields = self.read_entries(depth)?;
                Ok(Value::Object(Object::new(class, shape, fields)))
            }
            other => Err(PhpSerdeError::UnknownTag {
                offset,
                tag: char::from(other),
            }),
        }
    }

    /// Reads `<count>:{<key><value>...}`.
    fn read_entries(&mut self, depth: usize) -> Result<Array, PhpSerdeError> {
        if depth >= MAX_DEPTH {
            return Err(PhpSerdeError::NestingTooDeep { limit: MAX_DEPTH });
        }
        let (text, at) = self.read_until(b':')?;
        let count = parse_len(text, at)?;
        self.expect(b'{')?;

        let mut entries = Array::with_capacity(count.min(1024));
        for _ in 0..count {
            if self.peek() == Some(b'}') {
                return Err(PhpSerdeError::LengthMismatch {
                    offset: self.pos,
                    declared: count,
                });
            }
            let key = self.parse_key(depth)?;
            let value = self.parse_value(depth + 1)?;
            entries.insert(key, value);
        }

        match self.peek() {
            Some(b'}') => {
                self.pos += 1;
                Ok(entries)
            }
            Some(_) => Err(PhpSerdeError::LengthMismatch {
                offset: self.pos,
                declared: count,
            }),
            None => Err(PhpSerdeError::Truncated { offset: self.pos }),
        }
    }

    fn parse_key(&mut self, depth: usize) -> Result<Key, PhpSerdeError> {
        let offset = self.pos;
        match self.parse_value(depth + 1)? {
            Value::Int(i) => Ok(Key::Int(i)),
            Value::String(s) => Ok(Key::Str(s)),
            _ => Err(PhpSerdeError::InvalidKey { offset }),
        }
    }

    /// Reads `<len>:"<raw bytes>"` and returns the raw bytes as text.
    fn read_string_body(&mut self) -> Result<String, PhpSerdeError> {
        let (text, at) = self.read_until(b':')?;
        let len = parse_len(text, at)?;
        self.expect(b'"')?;

        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(PhpSerdeError::Truncated {
                offset: self.input.len(),
            })?;
        if self.input.get(end) != Some(&b'"') {
            return Err(if end >= self.input.len() {
                PhpSerdeError::Truncated { offset: end }
            } else {
                PhpSerdeError::LengthMismatch {
                    offset: start,
                    declared: len,
                }
            });
        }
        self.pos = end + 1;
        Ok(bytes_to_string(&self.input[start..end], start))
    }

    fn read_until(&mut self, delimiter: u8) -> Result<(&'a [u8], usize), PhpSerdeError> {
        let start = self.pos;
        let input: &'a [u8] = self.input;
        let rest = &input[start..];
        let len = rest
            .iter()
            .position(|b| *b == delimiter)
            .ok_or(PhpSerdeError::Truncated {
                offset: input.len(),
            })?;
        self.pos = start + len + 1;
        Ok((&rest[..len], start))
    }

    fn next_byte(&mut self) -> Result<u8, PhpSerdeError> {
        let byte = self
            .peek()
            .ok_or(PhpSerdeError::Truncated { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> Result<(), PhpSerdeError> {
        let offset = self.pos;
        let found = self.next_byte()?;
        if found == expected {
            Ok(())
        } else {
            Err(PhpSerdeError::Unexpected {
                offset,
                expected: char::from(expected),
                found: char::from(found),
            })
        }
    }
}

fn bytes_to_string(bytes: &[u8], offset: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::warn!(offset, len = bytes.len(), "string is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn invalid_number(offset: usize, text: &[u8]) -> PhpSerdeError {
    PhpSerdeError::InvalidNumber {
        offset,
        text: String::from_utf8_lossy(text).into_owned(),
    }
}

fn parse_int(text: &[u8], offset: usize) -> Result<i64, PhpSerdeError> {
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| invalid_number(offset, text))
}

fn parse_len(text: &[u8], offset: usize) -> Result<usize, PhpSerdeError> {
    if text.is_empty() || !text.iter().all(u8::is_ascii_digit) {
        return Err(invalid_number(offset, text));
    }
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| invalid_number(offset, text))
}

fn parse_float(text: &[u8], offset: usize) -> Result<f64, PhpSerdeError> {
    match text {
        b"INF" => Ok(f64::INFINITY),
        b"-INF" => Ok(f64::NEG_INFINITY),
        b"NAN" => Ok(f64::NAN),
        _ => std::str::from_utf8(text)
            .ok()
            .filter(|s| {
                !s.is_empty()
                    && s.bytes()
                        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
            })
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| invalid_number(offset, text)),
    }
}
