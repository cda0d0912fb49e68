//! Schema error types.

use shade_protocol::{PacketType, ValueError, ValueKind};
use thiserror::Error;

use crate::key::PropertyKey;

/// Errors raised while building or querying the property schema.
///
/// Construction errors (`Duplicate*`, `CyclicVisibility`, `LayoutMismatch`)
/// mean the descriptor tables are wrong. Query errors mean the caller asked
/// for something the schema does not describe.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Key does not name any property.
    #[error("unknown property key: {0}")]
    UnknownKey(String),

    /// Key is declared more than once.
    #[error("property {0} is declared more than once")]
    DuplicateKey(PropertyKey),

    /// Two properties are bound to the same command.
    #[error("command {command} is bound to both {first} and {second}")]
    DuplicateCommand {
        command: PacketType,
        first: PropertyKey,
        second: PropertyKey,
    },

    /// The `visible_if` references form a cycle.
    #[error("visibility cycle: {}", format_cycle(.cycle))]
    CyclicVisibility { cycle: Vec<PropertyKey> },

    /// A configuration descriptor disagrees with the wire layout.
    #[error("property {key} does not match the device layout: {reason}")]
    LayoutMismatch {
        key: PropertyKey,
        reason: LayoutIssue,
    },

    /// The key names a title or button, which has no value.
    #[error("property {0} is not bound to a value")]
    NotDataBound(PropertyKey),

    /// The key names a live status value, which cannot be written.
    #[error("property {0} is read-only")]
    ReadOnly(PropertyKey),

    /// The key names a button with no device command.
    #[error("property {0} has no device command")]
    NoCommand(PropertyKey),

    /// Input does not fit the property's kind.
    #[error("invalid value for {key}: {source}")]
    InvalidValue {
        key: PropertyKey,
        #[source]
        source: ValueError,
    },
}

/// Ways a configuration descriptor can disagree with the wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutIssue {
    /// Declared kind differs from the field's wire kind.
    Kind { declared: ValueKind, wire: ValueKind },
    /// Declared command is not the field's apply command.
    Command { declared: Option<PacketType>, wire: PacketType },
    /// Field is declared before a field that precedes it on the wire.
    OutOfOrder,
    /// Field is not declared at all.
    Missing,
}

impl std::fmt::Display for LayoutIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutIssue::Kind { declared, wire } => {
                write!(f, "declared as {}, encoded as {}", declared, wire)
            }
            LayoutIssue::Command { declared: Some(declared), wire } => {
                write!(f, "bound to {}, written by {}", declared, wire)
            }
            LayoutIssue::Command { declared: None, wire } => {
                write!(f, "has no command, written by {}", wire)
            }
            LayoutIssue::OutOfOrder => write!(f, "declared out of wire order"),
            LayoutIssue::Missing => write!(f, "not declared"),
        }
    }
}

fn format_cycle(cycle: &[PropertyKey]) -> String {
    cycle
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_protocol::{ConfigField, StatusField};

    #[test]
    fn test_error_display() {
        let err = SchemaError::CyclicVisibility {
            cycle: vec![
                PropertyKey::Status(StatusField::Homed),
                PropertyKey::Status(StatusField::Moving),
                PropertyKey::Status(StatusField::Homed),
            ],
        };
        assert_eq!(
            err.to_string(),
            "visibility cycle: status.homed -> status.moving -> status.homed"
        );

        let err = SchemaError::LayoutMismatch {
            key: PropertyKey::Config(ConfigField::SysMqttPort),
            reason: LayoutIssue::Kind {
                declared: ValueKind::Uint8,
                wire: ValueKind::Uint16,
            },
        };
        assert_eq!(
            err.to_string(),
            "property sysConfig.mqttPort does not match the device layout: declared as Uint8, encoded as Uint16"
        );
    }
}
