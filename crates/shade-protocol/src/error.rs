//! Protocol error types.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors that can occur while decoding device data.
///
/// Any decode error is fatal for the packet being decoded: the whole packet
/// is discarded and nothing from it is applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A read would run past the end of the buffer.
    #[error("read out of range at offset {offset}: need {needed} bytes, {remaining} remaining")]
    OutOfRange {
        /// Cursor position when the read was attempted.
        offset: usize,
        /// Width of the attempted read.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Payload is shorter than the fixed layout it should carry.
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Size of the fixed layout.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Unknown packet type code.
    #[error("unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Frame does not start with the packet signature.
    #[error("invalid packet signature: 0x{0:04X}")]
    InvalidSignature(u16),

    /// Frame announces a payload larger than the device can send.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum payload size.
        max: usize,
        /// Announced payload size.
        actual: usize,
    },

    /// A decoded value did not fit the field it was assigned to.
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Errors raised when a value does not fit a [`ValueKind`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The value has a different shape than the kind expects.
    #[error("expected {expected} value, got {found}")]
    KindMismatch {
        /// Kind the field is encoded with.
        expected: ValueKind,
        /// Short name of the value that was supplied.
        found: &'static str,
    },

    /// Integer does not fit the width of the kind.
    #[error("value {value} is out of range for {kind}")]
    OutOfRange {
        /// Target kind.
        kind: ValueKind,
        /// Offending value.
        value: i64,
    },

    /// Text input could not be parsed as the kind.
    #[error("cannot parse '{input}' as {kind}")]
    InvalidInput {
        /// Target kind.
        kind: ValueKind,
        /// Raw input.
        input: String,
    },
}

/// Errors that can occur while building an outbound frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Payload would exceed the device packet buffer.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Maximum payload size.
        max: usize,
    },

    /// The value could not be encoded.
    #[error(transparent)]
    Value(#[from] ValueError),
}
