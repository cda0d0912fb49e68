//! ESP Shade Controller Protocol
//!
//! This crate provides the wire codec for talking to the motorized shade
//! controller firmware. The device exposes its live state and persisted
//! configuration as fixed, ordered sequences of typed binary fields.
//!
//! # Protocol Overview
//!
//! Every exchange is a [`Packet`] carrying a [`PacketType`] and a payload:
//!
//! - **Queries** (`GET_STATE`, `GET_CONFIG`): empty request, the response
//!   payload is a bulk encoding of [`DeviceStatus`] or [`DeviceConfig`]
//! - **Apply commands** (`STEPPER_CONFIG_*`, `SYS_CONFIG_*`, ...): the request
//!   payload is one scalar encoded with the field's [`ValueKind`]
//! - **Telemetry pushes** (`HOMED`, `MOVING`, `POSITION`, ...): unsolicited
//!   status updates, see [`Telemetry`]
//!
//! All multi-byte values are little-endian.
//!
//! # Example
//!
//! ```rust,ignore
//! use shade_protocol::{DeviceStatus, ConfigField, Value, Writer};
//!
//! let status = DeviceStatus::decode(&payload)?;
//!
//! let mut writer = Writer::new();
//! writer.write_value(ConfigField::StepperOpenSpeed.kind(), &Value::U16(400))?;
//! ```

mod codec;
mod constants;
mod error;
mod fields;
mod frame;
mod packet_type;
mod telemetry;
mod types;
mod value;

pub use codec::*;
pub use constants::*;
pub use error::*;
pub use fields::*;
pub use frame::*;
pub use packet_type::*;
pub use telemetry::*;
pub use types::*;
pub use value::*;
