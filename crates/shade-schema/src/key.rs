//! Typed property keys.
//!
//! A [`PropertyKey`] is the parsed form of a dotted path such as
//! `status.homed` or `stepperConfig.openSpeed`. Parsing checks that the
//! path names a real field, so an unknown key never reaches the state trees.

use std::str::FromStr;

use serde::{Serialize, Serializer};
use shade_protocol::{ConfigField, ControlField, DeviceConfig, DeviceStatus, Controls, StatusField, Value};

use crate::error::SchemaError;

const STATUS_PREFIX: &str = "status";

/// A client-side action with no stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKey {
    Homing,
    Open,
    Close,
    ApplyStepperConfig,
    ApplySysConfig,
}

impl ActionKey {
    pub const ALL: [ActionKey; 5] = [
        ActionKey::Homing,
        ActionKey::Open,
        ActionKey::Close,
        ActionKey::ApplyStepperConfig,
        ActionKey::ApplySysConfig,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ActionKey::Homing => "do_homing",
            ActionKey::Open => "do_open",
            ActionKey::Close => "do_close",
            ActionKey::ApplyStepperConfig => "apply_stepper_config",
            ActionKey::ApplySysConfig => "apply_sys_config",
        }
    }
}

/// Path to one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    /// A live status field (`status.*`).
    Status(StatusField),
    /// A persisted configuration field (`<group>.<field>`).
    Config(ConfigField),
    /// A client-side control (`power`).
    Control(ControlField),
    /// A button (`do_homing`, `apply_sys_config`, ...).
    Action(ActionKey),
}

impl PropertyKey {
    /// Current value of the property, or `None` for actions.
    pub fn value_in(&self, snapshot: &Snapshot) -> Option<Value> {
        match *self {
            PropertyKey::Status(field) => Some(snapshot.status.get(field)),
            PropertyKey::Config(field) => Some(snapshot.config.get(field)),
            PropertyKey::Control(field) => Some(snapshot.controls.get(field)),
            PropertyKey::Action(_) => None,
        }
    }
}

impl FromStr for PropertyKey {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, SchemaError> {
        let unknown = || SchemaError::UnknownKey(s.to_string());

        if let Some((prefix, name)) = s.split_once('.') {
            if prefix == STATUS_PREFIX {
                return StatusField::from_name(name)
                    .map(PropertyKey::Status)
                    .ok_or_else(unknown);
            }
            return ConfigField::from_path(s)
                .map(PropertyKey::Config)
                .ok_or_else(unknown);
        }

        if let Some(control) = ControlField::from_name(s) {
            return Ok(PropertyKey::Control(control));
        }
        ActionKey::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .map(PropertyKey::Action)
            .ok_or_else(unknown)
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKey::Status(field) => write!(f, "{}.{}", STATUS_PREFIX, field.name()),
            PropertyKey::Config(field) => write!(f, "{}", field),
            PropertyKey::Control(field) => f.write_str(field.name()),
            PropertyKey::Action(action) => f.write_str(action.name()),
        }
    }
}

impl Serialize for PropertyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything a property can read: decoded status, configuration and controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub status: DeviceStatus,
    pub config: DeviceConfig,
    pub controls: Controls,
}
