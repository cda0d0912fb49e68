//! Field-level binary encoding and decoding.
//!
//! [`Parser`] walks a byte buffer with a cursor and reads one typed field at a
//! time. [`Writer`] produces the same encoding. Both follow the device
//! conventions:
//!
//! | Kind             | Width | Encoding                                   |
//! |------------------|-------|--------------------------------------------|
//! | `Boolean`        | 1     | 0 or 1 (any non-zero byte decodes as true) |
//! | `Uint8`..`Int32` | 1-4   | little-endian two's complement             |
//! | `Float32`        | 4     | little-endian IEEE-754                     |
//! | `FixedString(N)` | N     | text, NUL-padded, at most N-1 content bytes |

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, ValueError};
use crate::value::{Value, ValueKind};

// ============================================================================
// Parser
// ============================================================================

/// Sequential decoder over a byte buffer.
///
/// Every read consumes exactly the width of its type. A read that would run
/// past the end fails with [`DecodeError::OutOfRange`] and leaves the cursor
/// where it was.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, offset: 0 }
    }

    /// Current cursor position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < needed {
            return Err(DecodeError::OutOfRange {
                offset: self.offset,
                needed,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a one-byte boolean.
    pub fn read_boolean(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_uint8()? != 0)
    }

    /// Read an unsigned 8-bit integer.
    pub fn read_uint8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_uint16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read a signed 16-bit integer.
    pub fn read_int16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_uint32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a signed 32-bit integer.
    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a single precision float.
    pub fn read_float32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Read exactly `n` bytes and decode them as text up to the first NUL.
    pub fn read_fixed_string(&mut self, n: usize) -> Result<String, DecodeError> {
        let bytes = self.take(n)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(n);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read one field of the given kind.
    pub fn read_value(&mut self, kind: ValueKind) -> Result<Value, DecodeError> {
        Ok(match kind {
            ValueKind::Boolean => Value::Bool(self.read_boolean()?),
            ValueKind::Uint8 => Value::U8(self.read_uint8()?),
            ValueKind::Uint16 => Value::U16(self.read_uint16()?),
            ValueKind::Int16 => Value::I16(self.read_int16()?),
            ValueKind::Uint32 => Value::U32(self.read_uint32()?),
            ValueKind::Int32 => Value::I32(self.read_int32()?),
            ValueKind::Float32 => Value::F32(self.read_float32()?),
            ValueKind::FixedString(n) => Value::Text(self.read_fixed_string(n)?),
        })
    }
}

/// Fail with [`DecodeError::LengthMismatch`] if `data` is shorter than `expected`.
pub fn ensure_len(data: &[u8], expected: usize) -> Result<(), DecodeError> {
    if data.len() < expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Writer
// ============================================================================

/// Encoder producing the device's field encoding.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    /// Create an empty writer.
    pub fn new() -> Self {
        Writer {
            buf: BytesMut::new(),
        }
    }

    /// Create a writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Write a one-byte boolean.
    pub fn write_boolean(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    /// Write an unsigned 8-bit integer.
    pub fn write_uint8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Write an unsigned 16-bit integer.
    pub fn write_uint16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    /// Write a signed 16-bit integer.
    pub fn write_int16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    /// Write an unsigned 32-bit integer.
    pub fn write_uint32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    /// Write a signed 32-bit integer.
    pub fn write_int32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    /// Write a single precision float.
    pub fn write_float32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    /// Write `text` into exactly `n` bytes.
    ///
    /// Content longer than `n - 1` bytes is cut at a character boundary so the
    /// device always finds a terminator.
    pub fn write_fixed_string(&mut self, text: &str, n: usize) {
        let content = truncate_utf8(text, n.saturating_sub(1));
        self.buf.put_slice(content.as_bytes());
        self.buf.put_bytes(0, n - content.len());
    }

    /// Write one field, converting `value` to `kind` first.
    pub fn write_value(&mut self, kind: ValueKind, value: &Value) -> Result<(), ValueError> {
        match value.clone().coerce(kind)? {
            Value::Bool(v) => self.write_boolean(v),
            Value::U8(v) => self.write_uint8(v),
            Value::U16(v) => self.write_uint16(v),
            Value::I16(v) => self.write_int16(v),
            Value::U32(v) => self.write_uint32(v),
            Value::I32(v) => self.write_int32(v),
            Value::F32(v) => self.write_float32(v),
            Value::Text(v) => {
                if let ValueKind::FixedString(n) = kind {
                    self.write_fixed_string(&v, n);
                }
            }
        }
        Ok(())
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish writing and return the encoded bytes.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Encode a single value as a standalone payload.
pub fn encode_value(kind: ValueKind, value: &Value) -> Result<Bytes, ValueError> {
    let mut writer = Writer::with_capacity(kind.width());
    writer.write_value(kind, value)?;
    Ok(writer.freeze())
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
