//! Built-in primitive transforms and the registry the compiler resolves names against.

use crate::error::DecodeError;
use crate::transform::{Scope, Transform};
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Leaf decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// All remaining bytes as an ASCII string.
    Ascii,
    /// `known_length(len)`: exactly `len` bytes.
    KnownLength,
    /// Integer to boolean.
    NonzeroBoolean,
    Uint8,
    Uint16Le,
    Uint16Be,
    Uint32Le,
    Uint32Be,
    Uint64Le,
    Uint64Be,
    /// Bytes up to a `0` byte, which is consumed but not included.
    ZeroTerminated,
}

impl Primitive {
    pub const ALL: [(&'static str, Primitive); 11] = [
        ("ascii", Primitive::Ascii),
        ("known_length", Primitive::KnownLength),
        ("nonzero_boolean", Primitive::NonzeroBoolean),
        ("uint8", Primitive::Uint8),
        ("uint16le", Primitive::Uint16Le),
        ("uint16be", Primitive::Uint16Be),
        ("uint32le", Primitive::Uint32Le),
        ("uint32be", Primitive::Uint32Be),
        ("uint64le", Primitive::Uint64Le),
        ("uint64be", Primitive::Uint64Be),
        ("zero_terminated", Primitive::ZeroTerminated),
    ];

    pub fn num_params(self) -> usize {
        match self {
            Primitive::KnownLength => 1,
            _ => 0,
        }
    }

    /// Whether the primitive decodes raw bytes (as opposed to a decoded value).
    pub fn reads_bytes(self) -> bool {
        !matches!(self, Primitive::NonzeroBoolean)
    }

    fn width(self) -> Option<usize> {
        match self {
            Primitive::Uint8 => Some(1),
            Primitive::Uint16Le | Primitive::Uint16Be => Some(2),
            Primitive::Uint32Le | Primitive::Uint32Be => Some(4),
            Primitive::Uint64Le | Primitive::Uint64Be => Some(8),
            _ => None,
        }
    }

    fn read_uint(self, b: &[u8]) -> u64 {
        match self {
            Primitive::Uint8 => b[0] as u64,
            Primitive::Uint16Le => LittleEndian::read_u16(b) as u64,
            Primitive::Uint16Be => BigEndian::read_u16(b) as u64,
            Primitive::Uint32Le => LittleEndian::read_u32(b) as u64,
            Primitive::Uint32Be => BigEndian::read_u32(b) as u64,
            Primitive::Uint64Le => LittleEndian::read_u64(b),
            Primitive::Uint64Be => BigEndian::read_u64(b),
            _ => 0,
        }
    }

    pub fn prefix_apply(self, scope: &Scope, bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
        if let Some(width) = self.width() {
            let b = take(bytes, width)?;
            let raw = self.read_uint(b);
            let value = i64::try_from(raw)
                .map_err(|_| DecodeError::OutOfRange(format!("{} does not fit an integer", raw)))?;
            return Ok((Value::Integer(value), width));
        }
        match self {
            Primitive::Ascii => {
                if !bytes.is_ascii() {
                    return Err(DecodeError::InvalidAscii);
                }
                let s = String::from_utf8_lossy(bytes).into_owned();
                Ok((Value::String(s), bytes.len()))
            }
            Primitive::KnownLength => {
                let len = match scope.param(0) {
                    Some(Value::Integer(n)) => usize::try_from(*n)
                        .map_err(|_| DecodeError::OutOfRange(format!("length {}", n)))?,
                    Some(other) => {
                        return Err(DecodeError::TypeMismatch {
                            expected: "integer",
                            found: other.kind_name(),
                        })
                    }
                    None => return Err(DecodeError::UnboundParameter(0)),
                };
                Ok((Value::Bytes(take(bytes, len)?.to_vec()), len))
            }
            Primitive::ZeroTerminated => {
                let end = bytes
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(DecodeError::MissingTerminator)?;
                Ok((Value::Bytes(bytes[..end].to_vec()), end + 1))
            }
            _ => Err(DecodeError::TypeMismatch {
                expected: "value",
                found: "bytes",
            }),
        }
    }

    /// Apply to an already-decoded value.
    pub fn apply_value(self, input: &Value) -> Result<Value, DecodeError> {
        match (self, input) {
            (Primitive::NonzeroBoolean, Value::Integer(n)) => Ok(Value::Boolean(*n != 0)),
            (_, other) => Err(DecodeError::TypeMismatch {
                expected: "integer",
                found: other.kind_name(),
            }),
        }
    }
}

fn take(bytes: &[u8], n: usize) -> Result<&[u8], DecodeError> {
    bytes.get(..n).ok_or(DecodeError::ShortInput {
        needed: n,
        available: bytes.len(),
    })
}

/// Named transforms available to every script, plus the shared invalid
/// transform used as the "no case matched" fallback of `switch`.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<(String, Transform)>,
    invalid: Transform,
}

impl Registry {
    /// A registry with no named primitives.
    pub fn empty() -> Self {
        Registry {
            entries: Vec::new(),
            invalid: Transform::invalid(),
        }
    }

    /// The standard primitive set.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let invalid = registry.invalid.clone();
        registry.entries.push(("invalid".to_string(), invalid));
        for (name, p) in Primitive::ALL {
            registry.entries.push((name.to_string(), Transform::primitive(p)));
        }
        registry
    }

    /// Add a named transform, replacing any entry with the same name.
    pub fn with(mut self, name: impl Into<String>, transform: Transform) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = transform,
            None => self.entries.push((name, transform)),
        }
        self
    }

    /// Look up a primitive by name. The returned handle is a new reference.
    pub fn get(&self, name: &str) -> Option<Transform> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
    }

    pub fn invalid(&self) -> Transform {
        self.invalid.clone()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
