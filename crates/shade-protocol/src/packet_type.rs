//! Packet type registry.
//!
//! Every packet exchanged with the device carries a one-byte type code.
//! Codes are grouped in contiguous ranges by purpose and never change:
//!
//! | Range       | Purpose                                  |
//! |-------------|------------------------------------------|
//! | `0x01-0x0F` | live state, pushed as telemetry          |
//! | `0x10-0x1F` | actions (no stored value)                |
//! | `0x20-0x2F` | stepper calibration apply                |
//! | `0x30-0x3F` | night mode apply                         |
//! | `0x40-0x4F` | stepper configuration apply              |
//! | `0x50-0x6F` | system configuration apply               |
//! | `0xA0-0xA1` | bulk state/configuration queries         |
//! | `0xFF`      | negative acknowledgment                  |

use serde::{Serialize, Serializer};

use crate::error::DecodeError;
use crate::fields::{ConfigField, StatusField};

/// Purpose of a packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketCategory {
    /// Fetch the live device status.
    StateQuery,
    /// Fetch the whole persisted configuration.
    ConfigQuery,
    /// Live status value, also pushed unprompted by the device.
    Telemetry,
    /// Write one configuration field.
    ConfigApply,
    /// Trigger an action on the device.
    Action,
    /// Negative acknowledgment.
    Error,
}

macro_rules! packet_types {
    ($( $(#[$meta:meta])* $variant:ident = $code:literal => $name:literal, )*) => {
        /// Command/response identifier understood by both client and device.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum PacketType {
            $( $(#[$meta])* $variant = $code, )*
        }

        impl PacketType {
            /// Every packet type, in code order.
            pub const ALL: &'static [PacketType] = &[ $( PacketType::$variant, )* ];

            /// Protocol name of the packet type (e.g. `GET_STATE`).
            pub const fn name(self) -> &'static str {
                match self {
                    $( PacketType::$variant => $name, )*
                }
            }
        }
    };
}

packet_types! {
    /// Device has completed homing.
    Homed = 0x01 => "HOMED",
    /// Stepper is moving.
    Moving = 0x02 => "MOVING",
    /// Current stepper position in steps.
    Position = 0x03 => "POSITION",
    /// Target position in percent (0 = open, 100 = closed).
    PositionTarget = 0x04 => "POSITION_TARGET",

    /// Power toggle.
    Power = 0x10 => "POWER",
    /// Start the homing sequence.
    Homing = 0x11 => "HOMING",
    /// Move to the open position.
    Open = 0x12 => "OPEN",
    /// Move to the closed position.
    Close = 0x13 => "CLOSE",
    /// Emergency stop.
    Stop = 0x14 => "STOP",
    /// Restart the device.
    Restart = 0x15 => "RESTART",
    /// Re-apply the calibration offset to the current position.
    ApplyOffset = 0x16 => "APPLY_OFFSET",

    StepperCalibrationOffset = 0x20 => "STEPPER_CALIBRATION_OFFSET",
    StepperCalibrationOpenPosition = 0x21 => "STEPPER_CALIBRATION_OPEN_POSITION",

    NightModeEnabled = 0x30 => "NIGHT_MODE_ENABLED",
    NightModeStart = 0x31 => "NIGHT_MODE_START",
    NightModeEnd = 0x32 => "NIGHT_MODE_END",

    StepperConfigReverse = 0x40 => "STEPPER_CONFIG_REVERSE",
    StepperConfigResolution = 0x41 => "STEPPER_CONFIG_RESOLUTION",
    StepperConfigOpenSpeed = 0x42 => "STEPPER_CONFIG_OPEN_SPEED",
    StepperConfigCloseSpeed = 0x43 => "STEPPER_CONFIG_CLOSE_SPEED",
    StepperConfigAcceleration = 0x44 => "STEPPER_CONFIG_ACCELERATION",
    StepperConfigHomingSpeed = 0x45 => "STEPPER_CONFIG_HOMING_SPEED",
    StepperConfigHomingSpeedSecond = 0x46 => "STEPPER_CONFIG_HOMING_SPEED_SECOND",
    StepperConfigHomingSteps = 0x47 => "STEPPER_CONFIG_HOMING_STEPS",
    StepperConfigHomingStepsMax = 0x48 => "STEPPER_CONFIG_HOMING_STEPS_MAX",

    SysConfigMdnsName = 0x50 => "SYS_CONFIG_MDNS_NAME",
    SysConfigWifiMode = 0x51 => "SYS_CONFIG_WIFI_MODE",
    SysConfigWifiSsid = 0x52 => "SYS_CONFIG_WIFI_SSID",
    SysConfigWifiPassword = 0x53 => "SYS_CONFIG_WIFI_PASSWORD",
    SysConfigWifiConnectionCheckInterval = 0x54 => "SYS_CONFIG_WIFI_CONNECTION_CHECK_INTERVAL",
    SysConfigWifiMaxConnectionAttemptInterval = 0x55 => "SYS_CONFIG_WIFI_MAX_CONNECTION_ATTEMPT_INTERVAL",
    SysConfigStepper1Pin = 0x56 => "SYS_CONFIG_STEPPER_1_PIN",
    SysConfigStepper2Pin = 0x57 => "SYS_CONFIG_STEPPER_2_PIN",
    SysConfigStepper3Pin = 0x58 => "SYS_CONFIG_STEPPER_3_PIN",
    SysConfigStepper4Pin = 0x59 => "SYS_CONFIG_STEPPER_4_PIN",
    SysConfigStepperEnPin = 0x5A => "SYS_CONFIG_STEPPER_EN_PIN",
    SysConfigEndstopPin = 0x5B => "SYS_CONFIG_ENDSTOP_PIN",
    SysConfigEndstopHighState = 0x5C => "SYS_CONFIG_ENDSTOP_HIGH_STATE",
    SysConfigTimeZone = 0x5D => "SYS_CONFIG_TIME_ZONE",
    SysConfigMqttEnabled = 0x5E => "SYS_CONFIG_MQTT_ENABLED",
    SysConfigMqttHost = 0x5F => "SYS_CONFIG_MQTT_HOST",
    SysConfigMqttPort = 0x60 => "SYS_CONFIG_MQTT_PORT",
    SysConfigMqttUser = 0x61 => "SYS_CONFIG_MQTT_USER",
    SysConfigMqttPassword = 0x62 => "SYS_CONFIG_MQTT_PASSWORD",

    /// Fetch the live device status.
    GetState = 0xA0 => "GET_STATE",
    /// Fetch the persisted configuration.
    GetConfig = 0xA1 => "GET_CONFIG",

    /// Negative acknowledgment; payload is a UTF-8 reason.
    Error = 0xFF => "ERROR",
}

impl PacketType {
    /// The wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// What the packet type is used for.
    pub const fn category(self) -> PacketCategory {
        match self {
            PacketType::GetState => PacketCategory::StateQuery,
            PacketType::GetConfig => PacketCategory::ConfigQuery,
            PacketType::Homed
            | PacketType::Moving
            | PacketType::Position
            | PacketType::PositionTarget => PacketCategory::Telemetry,
            PacketType::Power
            | PacketType::Homing
            | PacketType::Open
            | PacketType::Close
            | PacketType::Stop
            | PacketType::Restart
            | PacketType::ApplyOffset => PacketCategory::Action,
            PacketType::Error => PacketCategory::Error,
            _ => PacketCategory::ConfigApply,
        }
    }

    /// The configuration field this apply command writes, if any.
    pub fn config_field(self) -> Option<ConfigField> {
        ConfigField::ALL
            .iter()
            .copied()
            .find(|field| field.apply_command() == self)
    }

    /// The status field this telemetry packet carries, if any.
    pub const fn status_field(self) -> Option<StatusField> {
        match self {
            PacketType::Homed => Some(StatusField::Homed),
            PacketType::Moving => Some(StatusField::Moving),
            PacketType::Position => Some(StatusField::Position),
            PacketType::PositionTarget => Some(StatusField::PositionTarget),
            _ => None,
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, DecodeError> {
        PacketType::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or(DecodeError::UnknownPacketType(code))
    }
}

impl From<PacketType> for u8 {
    fn from(t: PacketType) -> Self {
        t.code()
    }
}

impl Serialize for PacketType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for t in PacketType::ALL {
            assert!(seen.insert(t.code()), "duplicate code for {}", t);
            assert_eq!(PacketType::try_from(t.code()), Ok(*t));
        }
    }

    #[test]
    fn test_frozen_codes() {
        assert_eq!(PacketType::GetState.code(), 0xA0);
        assert_eq!(PacketType::GetConfig.code(), 0xA1);
        assert_eq!(PacketType::Homed.code(), 0x01);
        assert_eq!(PacketType::Homing.code(), 0x11);
        assert_eq!(PacketType::SysConfigMqttPassword.code(), 0x62);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            PacketType::try_from(0x00),
            Err(DecodeError::UnknownPacketType(0x00))
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(PacketType::GetState.category(), PacketCategory::StateQuery);
        assert_eq!(PacketType::GetConfig.category(), PacketCategory::ConfigQuery);
        assert_eq!(PacketType::Position.category(), PacketCategory::Telemetry);
        assert_eq!(PacketType::Open.category(), PacketCategory::Action);
        assert_eq!(
            PacketType::NightModeStart.category(),
            PacketCategory::ConfigApply
        );
    }

    #[test]
    fn test_every_apply_command_maps_to_one_field() {
        for t in PacketType::ALL {
            let field = t.config_field();
            if t.category() == PacketCategory::ConfigApply {
                let field = field.unwrap_or_else(|| panic!("{} has no field", t));
                assert_eq!(field.apply_command(), *t);
            } else {
                assert!(field.is_none(), "{} should not map to a field", t);
            }
        }
    }

    #[test]
    fn test_display_uses_protocol_name() {
        assert_eq!(PacketType::StepperConfigHomingSpeedSecond.to_string(), "STEPPER_CONFIG_HOMING_SPEED_SECOND");
    }
}
