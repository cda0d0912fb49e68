//! Unsolicited status pushes.
//!
//! The device sends a telemetry packet whenever one of its live values
//! changes. Each packet carries one status field encoded with that field's
//! kind.

use bytes::Bytes;

use crate::codec::{ensure_len, Parser, Writer};
use crate::error::DecodeError;
use crate::fields::StatusField;
use crate::packet_type::PacketType;
use crate::types::DeviceStatus;
use crate::value::Value;

/// One decoded status update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    /// Homing finished or was lost.
    Homed(bool),
    /// The stepper started or stopped.
    Moving(bool),
    /// Current position in steps.
    Position(i32),
    /// New target in percent.
    PositionTarget(f32),
}

impl Telemetry {
    /// Decode a telemetry payload.
    ///
    /// Returns `Ok(None)` when `packet_type` is not a telemetry type.
    pub fn decode(packet_type: PacketType, payload: &[u8]) -> Result<Option<Self>, DecodeError> {
        let Some(field) = packet_type.status_field() else {
            return Ok(None);
        };
        ensure_len(payload, field.kind().width())?;

        let mut parser = Parser::new(payload);
        let telemetry = match field {
            StatusField::Homed => Telemetry::Homed(parser.read_boolean()?),
            StatusField::Moving => Telemetry::Moving(parser.read_boolean()?),
            StatusField::Position => Telemetry::Position(parser.read_int32()?),
            StatusField::PositionTarget => Telemetry::PositionTarget(parser.read_float32()?),
            StatusField::Offset => return Ok(None),
        };
        Ok(Some(telemetry))
    }

    /// The packet type this update travels as.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Telemetry::Homed(_) => PacketType::Homed,
            Telemetry::Moving(_) => PacketType::Moving,
            Telemetry::Position(_) => PacketType::Position,
            Telemetry::PositionTarget(_) => PacketType::PositionTarget,
        }
    }

    /// The status field this update overwrites.
    pub fn field(&self) -> StatusField {
        match self {
            Telemetry::Homed(_) => StatusField::Homed,
            Telemetry::Moving(_) => StatusField::Moving,
            Telemetry::Position(_) => StatusField::Position,
            Telemetry::PositionTarget(_) => StatusField::PositionTarget,
        }
    }

    pub fn value(&self) -> Value {
        match *self {
            Telemetry::Homed(v) | Telemetry::Moving(v) => Value::Bool(v),
            Telemetry::Position(v) => Value::I32(v),
            Telemetry::PositionTarget(v) => Value::F32(v),
        }
    }

    /// Merge this update into `status`.
    pub fn apply(&self, status: &mut DeviceStatus) {
        match *self {
            Telemetry::Homed(v) => status.homed = v,
            Telemetry::Moving(v) => status.moving = v,
            Telemetry::Position(v) => status.position = v,
            Telemetry::PositionTarget(v) => status.position_target = v,
        }
    }

    /// Encode the payload.
    pub fn encode(&self) -> Bytes {
        let mut writer = Writer::with_capacity(self.field().kind().width());
        match *self {
            Telemetry::Homed(v) | Telemetry::Moving(v) => writer.write_boolean(v),
            Telemetry::Position(v) => writer.write_int32(v),
            Telemetry::PositionTarget(v) => writer.write_float32(v),
        }
        writer.freeze()
    }
}

impl std::fmt::Display for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.packet_type(), self.value())
    }
}
