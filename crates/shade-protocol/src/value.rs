//! Value kinds and decoded values.
//!
//! This module provides:
//! - [`ValueKind`] - The primitive encoding of a field on the wire
//! - [`Value`] - A decoded scalar, independent of where it is stored

use serde::Serialize;

use crate::error::ValueError;

// ============================================================================
// Value Kind
// ============================================================================

/// The primitive encoding of a single field.
///
/// Every kind has a fixed width; there are no variable-length fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// One byte, 0 or 1.
    Boolean,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 32-bit integer.
    Int32,
    /// IEEE-754 single precision float.
    Float32,
    /// Exactly N bytes of NUL-padded text.
    FixedString(usize),
}

impl ValueKind {
    /// Number of bytes this kind occupies on the wire.
    pub const fn width(&self) -> usize {
        match self {
            ValueKind::Boolean | ValueKind::Uint8 => 1,
            ValueKind::Uint16 | ValueKind::Int16 => 2,
            ValueKind::Uint32 | ValueKind::Int32 | ValueKind::Float32 => 4,
            ValueKind::FixedString(n) => *n,
        }
    }

    /// Check if a value can be stored under this kind without conversion.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::Boolean, Value::Bool(_))
                | (ValueKind::Uint8, Value::U8(_))
                | (ValueKind::Uint16, Value::U16(_))
                | (ValueKind::Int16, Value::I16(_))
                | (ValueKind::Uint32, Value::U32(_))
                | (ValueKind::Int32, Value::I32(_))
                | (ValueKind::Float32, Value::F32(_))
                | (ValueKind::FixedString(_), Value::Text(_))
        )
    }

    /// Parse user-entered text into a value of this kind.
    pub fn parse(&self, input: &str) -> Result<Value, ValueError> {
        let trimmed = input.trim();
        let invalid = || ValueError::InvalidInput {
            kind: *self,
            input: input.to_string(),
        };

        match self {
            ValueKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Float32 => match trimmed.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(Value::F32(v)),
                _ => Err(invalid()),
            },
            ValueKind::FixedString(n) => {
                // One byte is reserved for the terminator.
                if input.len() >= *n {
                    return Err(invalid());
                }
                Ok(Value::Text(input.to_string()))
            }
            _ => {
                let v = trimmed.parse::<i64>().map_err(|_| invalid())?;
                integer(*self, v)
            }
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Boolean => write!(f, "Boolean"),
            ValueKind::Uint8 => write!(f, "Uint8"),
            ValueKind::Uint16 => write!(f, "Uint16"),
            ValueKind::Int16 => write!(f, "Int16"),
            ValueKind::Uint32 => write!(f, "Uint32"),
            ValueKind::Int32 => write!(f, "Int32"),
            ValueKind::Float32 => write!(f, "Float32"),
            ValueKind::FixedString(n) => write!(f, "FixedString({})", n),
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// A decoded scalar value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Unsigned 8-bit value.
    U8(u8),
    /// Unsigned 16-bit value.
    U16(u16),
    /// Signed 16-bit value.
    I16(i16),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Signed 32-bit value.
    I32(i32),
    /// Single precision float.
    F32(f32),
    /// Text decoded from a fixed-length string.
    Text(String),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::I16(_) => "i16",
            Value::U32(_) => "u32",
            Value::I32(_) => "i32",
            Value::F32(_) => "f32",
            Value::Text(_) => "text",
        }
    }

    /// Convert to i64 if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U8(v) => Some(*v as i64),
            Value::U16(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::U32(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Convert to f64 if this is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Convert to string slice if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Truthiness used by visibility rules: false, zero and empty text are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            Value::F32(v) => *v != 0.0,
            Value::Text(v) => !v.is_empty(),
            other => other.as_i64().is_some_and(|v| v != 0),
        }
    }

    /// Convert this value to the exact variant required by `kind`.
    ///
    /// Integers convert between widths when in range, booleans accept 0/1,
    /// and whole floats are accepted as integers.
    pub fn coerce(self, kind: ValueKind) -> Result<Value, ValueError> {
        if kind.matches(&self) {
            return Ok(self);
        }

        let mismatch = |found: &'static str| ValueError::KindMismatch {
            expected: kind,
            found,
        };

        match kind {
            ValueKind::Boolean => match self.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(mismatch(self.type_name())),
            },
            ValueKind::Float32 => self
                .as_f64()
                .map(|v| Value::F32(v as f32))
                .ok_or_else(|| mismatch(self.type_name())),
            ValueKind::FixedString(_) => Err(mismatch(self.type_name())),
            _ => {
                let v = match &self {
                    Value::Bool(b) => *b as i64,
                    Value::F32(f) if f.fract() == 0.0 => *f as i64,
                    other => other
                        .as_i64()
                        .ok_or_else(|| mismatch(other.type_name()))?,
                };
                integer(kind, v)
            }
        }
    }
}

/// Build an integer value of `kind`, checking the range.
fn integer(kind: ValueKind, v: i64) -> Result<Value, ValueError> {
    let value = match kind {
        ValueKind::Uint8 => u8::try_from(v).ok().map(Value::U8),
        ValueKind::Uint16 => u16::try_from(v).ok().map(Value::U16),
        ValueKind::Int16 => i16::try_from(v).ok().map(Value::I16),
        ValueKind::Uint32 => u32::try_from(v).ok().map(Value::U32),
        ValueKind::Int32 => i32::try_from(v).ok().map(Value::I32),
        _ => None,
    };
    value.ok_or(ValueError::OutOfRange { kind, value: v })
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}
