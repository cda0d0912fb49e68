//! Typed field accessors for the device layouts.
//!
//! The order of [`StatusField::ALL`] and [`ConfigField::ALL`] is the wire
//! order of the `GET_STATE` and `GET_CONFIG` responses. Adding, removing or
//! reordering a variant changes the protocol.

use crate::constants::CONFIG_STRING_SIZE;
use crate::packet_type::PacketType;
use crate::value::ValueKind;

const TEXT: ValueKind = ValueKind::FixedString(CONFIG_STRING_SIZE);

// ============================================================================
// Status
// ============================================================================

/// A field of the live device status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusField {
    /// Homing has completed.
    Homed,
    /// Stepper is moving.
    Moving,
    /// Current position in steps.
    Position,
    /// Target position in percent.
    PositionTarget,
    /// Calibration offset currently applied.
    Offset,
}

impl StatusField {
    /// Every status field, in wire order.
    pub const ALL: [StatusField; 5] = [
        StatusField::Homed,
        StatusField::Moving,
        StatusField::Position,
        StatusField::PositionTarget,
        StatusField::Offset,
    ];

    /// Field name within the status tree.
    pub const fn name(self) -> &'static str {
        match self {
            StatusField::Homed => "homed",
            StatusField::Moving => "moving",
            StatusField::Position => "position",
            StatusField::PositionTarget => "position_target",
            StatusField::Offset => "offset",
        }
    }

    /// Encoding of the field.
    pub const fn kind(self) -> ValueKind {
        match self {
            StatusField::Homed | StatusField::Moving => ValueKind::Boolean,
            StatusField::Position => ValueKind::Int32,
            StatusField::PositionTarget => ValueKind::Float32,
            StatusField::Offset => ValueKind::Int16,
        }
    }

    /// Look up a field by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Size of the `GET_STATE` payload.
pub const STATE_SIZE: usize = {
    let mut size = 0;
    let mut i = 0;
    while i < StatusField::ALL.len() {
        size += StatusField::ALL[i].kind().width();
        i += 1;
    }
    size
};

// ============================================================================
// Configuration
// ============================================================================

/// A group of persisted configuration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigGroup {
    /// Endstop offset and open position.
    StepperCalibration,
    /// Scheduled closing window.
    NightMode,
    /// Motion and homing parameters.
    StepperConfig,
    /// Network, pins, time and MQTT.
    SysConfig,
}

impl ConfigGroup {
    /// Every group, in wire order.
    pub const ALL: [ConfigGroup; 4] = [
        ConfigGroup::StepperCalibration,
        ConfigGroup::NightMode,
        ConfigGroup::StepperConfig,
        ConfigGroup::SysConfig,
    ];

    /// Group name within the configuration tree.
    pub const fn name(self) -> &'static str {
        match self {
            ConfigGroup::StepperCalibration => "stepperCalibration",
            ConfigGroup::NightMode => "nightMode",
            ConfigGroup::StepperConfig => "stepperConfig",
            ConfigGroup::SysConfig => "sysConfig",
        }
    }

    /// Look up a group by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }

    /// Fields of this group, in wire order.
    pub fn fields(self) -> impl Iterator<Item = ConfigField> {
        ConfigField::ALL.into_iter().filter(move |f| f.group() == self)
    }
}

macro_rules! config_fields {
    ($( $variant:ident => ($group:ident, $name:literal, $kind:expr, $command:ident), )*) => {
        /// A persisted configuration field.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ConfigField {
            $(
                #[doc = concat!("`", $name, "` of the ", stringify!($group), " group.")]
                $variant,
            )*
        }

        impl ConfigField {
            /// Every configuration field, in wire order.
            pub const ALL: [ConfigField; config_fields!(@count $($variant)*)] = [
                $( ConfigField::$variant, )*
            ];

            /// Group the field belongs to.
            pub const fn group(self) -> ConfigGroup {
                match self {
                    $( ConfigField::$variant => ConfigGroup::$group, )*
                }
            }

            /// Field name within its group.
            pub const fn name(self) -> &'static str {
                match self {
                    $( ConfigField::$variant => $name, )*
                }
            }

            /// Encoding of the field, shared by decode and apply.
            pub const fn kind(self) -> ValueKind {
                match self {
                    $( ConfigField::$variant => $kind, )*
                }
            }

            /// Command that writes this field on the device.
            pub const fn apply_command(self) -> PacketType {
                match self {
                    $( ConfigField::$variant => PacketType::$command, )*
                }
            }
        }
    };
    (@count) => { 0 };
    (@count $head:ident $($tail:ident)*) => { 1 + config_fields!(@count $($tail)*) };
}

config_fields! {
    CalibrationOffset => (StepperCalibration, "offset", ValueKind::Uint16, StepperCalibrationOffset),
    CalibrationOpenPosition => (StepperCalibration, "openPosition", ValueKind::Int32, StepperCalibrationOpenPosition),

    NightModeEnabled => (NightMode, "enabled", ValueKind::Boolean, NightModeEnabled),
    NightModeStartTime => (NightMode, "startTime", ValueKind::Uint32, NightModeStart),
    NightModeEndTime => (NightMode, "endTime", ValueKind::Uint32, NightModeEnd),

    StepperReverse => (StepperConfig, "reverse", ValueKind::Boolean, StepperConfigReverse),
    StepperResolution => (StepperConfig, "resolution", ValueKind::Uint16, StepperConfigResolution),
    StepperOpenSpeed => (StepperConfig, "openSpeed", ValueKind::Uint16, StepperConfigOpenSpeed),
    StepperCloseSpeed => (StepperConfig, "closeSpeed", ValueKind::Uint16, StepperConfigCloseSpeed),
    StepperAcceleration => (StepperConfig, "acceleration", ValueKind::Uint16, StepperConfigAcceleration),
    StepperHomingSpeed => (StepperConfig, "homingSpeed", ValueKind::Uint16, StepperConfigHomingSpeed),
    StepperHomingSpeedSecond => (StepperConfig, "homingSpeedSecond", ValueKind::Uint16, StepperConfigHomingSpeedSecond),
    StepperHomingSteps => (StepperConfig, "homingSteps", ValueKind::Int32, StepperConfigHomingSteps),
    StepperHomingStepsMax => (StepperConfig, "homingStepsMax", ValueKind::Int32, StepperConfigHomingStepsMax),

    SysMdnsName => (SysConfig, "mdnsName", TEXT, SysConfigMdnsName),
    SysWifiMode => (SysConfig, "wifiMode", ValueKind::Uint8, SysConfigWifiMode),
    SysWifiSsid => (SysConfig, "wifiSsid", TEXT, SysConfigWifiSsid),
    SysWifiPassword => (SysConfig, "wifiPassword", TEXT, SysConfigWifiPassword),
    SysWifiConnectionCheckInterval => (SysConfig, "wifiConnectionCheckInterval", ValueKind::Uint32, SysConfigWifiConnectionCheckInterval),
    SysWifiMaxConnectionAttemptInterval => (SysConfig, "wifiMaxConnectionAttemptInterval", ValueKind::Uint32, SysConfigWifiMaxConnectionAttemptInterval),
    SysStepperPin1 => (SysConfig, "stepperPin1", ValueKind::Uint8, SysConfigStepper1Pin),
    SysStepperPin2 => (SysConfig, "stepperPin2", ValueKind::Uint8, SysConfigStepper2Pin),
    SysStepperPin3 => (SysConfig, "stepperPin3", ValueKind::Uint8, SysConfigStepper3Pin),
    SysStepperPin4 => (SysConfig, "stepperPin4", ValueKind::Uint8, SysConfigStepper4Pin),
    SysStepperPinEn => (SysConfig, "stepperPinEn", ValueKind::Uint8, SysConfigStepperEnPin),
    SysEndstopPin => (SysConfig, "endstopPin", ValueKind::Uint8, SysConfigEndstopPin),
    SysEndstopHighState => (SysConfig, "endstopHighState", ValueKind::Boolean, SysConfigEndstopHighState),
    SysTimeZone => (SysConfig, "timeZone", ValueKind::Float32, SysConfigTimeZone),
    SysMqtt => (SysConfig, "mqtt", ValueKind::Boolean, SysConfigMqttEnabled),
    SysMqttHost => (SysConfig, "mqttHost", TEXT, SysConfigMqttHost),
    SysMqttPort => (SysConfig, "mqttPort", ValueKind::Uint16, SysConfigMqttPort),
    SysMqttUser => (SysConfig, "mqttUser", TEXT, SysConfigMqttUser),
    SysMqttPassword => (SysConfig, "mqttPassword", TEXT, SysConfigMqttPassword),
}

impl ConfigField {
    /// Dotted path of the field, e.g. `sysConfig.wifiMode`.
    pub fn path(self) -> String {
        format!("{}.{}", self.group().name(), self.name())
    }

    /// Look up a field by its dotted path.
    pub fn from_path(path: &str) -> Option<Self> {
        let (group, name) = path.split_once('.')?;
        let group = ConfigGroup::from_name(group)?;
        group.fields().find(|f| f.name() == name)
    }

    /// Byte offset of the field within the `GET_CONFIG` payload.
    pub fn offset(self) -> usize {
        Self::ALL
            .iter()
            .take_while(|f| **f != self)
            .map(|f| f.kind().width())
            .sum()
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.group().name(), self.name())
    }
}

impl std::fmt::Display for StatusField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Size of the `GET_CONFIG` payload.
pub const CONFIG_SIZE: usize = {
    let mut size = 0;
    let mut i = 0;
    while i < ConfigField::ALL.len() {
        size += ConfigField::ALL[i].kind().width();
        i += 1;
    }
    size
};

// ============================================================================
// Controls
// ============================================================================

/// A client-side control with no stored device value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlField {
    /// Power toggle.
    Power,
}

impl ControlField {
    /// Every control.
    pub const ALL: [ControlField; 1] = [ControlField::Power];

    /// Key of the control; controls live at the top level.
    pub const fn name(self) -> &'static str {
        match self {
            ControlField::Power => "power",
        }
    }

    /// Encoding of the apply payload.
    pub const fn kind(self) -> ValueKind {
        match self {
            ControlField::Power => ValueKind::Boolean,
        }
    }

    /// Command that applies the control.
    pub const fn command(self) -> PacketType {
        match self {
            ControlField::Power => PacketType::Power,
        }
    }

    /// Look up a control by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_size(group: ConfigGroup) -> usize {
        group.fields().map(|f| f.kind().width()).sum()
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(STATE_SIZE, 12);
        assert_eq!(group_size(ConfigGroup::StepperCalibration), 6);
        assert_eq!(group_size(ConfigGroup::NightMode), 9);
        assert_eq!(group_size(ConfigGroup::StepperConfig), 21);
        assert_eq!(group_size(ConfigGroup::SysConfig), 215);
        assert_eq!(CONFIG_SIZE, 251);
    }

    #[test]
    fn test_groups_are_contiguous() {
        let groups: Vec<ConfigGroup> = ConfigField::ALL.iter().map(|f| f.group()).collect();
        let mut deduped = groups.clone();
        deduped.dedup();
        assert_eq!(deduped, ConfigGroup::ALL.to_vec());
    }

    #[test]
    fn test_path_round_trip() {
        for field in ConfigField::ALL {
            assert_eq!(ConfigField::from_path(&field.path()), Some(field));
        }
        assert_eq!(ConfigField::from_path("sysConfig.nope"), None);
        assert_eq!(ConfigField::from_path("stepperConfig"), None);
        assert_eq!(
            ConfigField::SysWifiMaxConnectionAttemptInterval.to_string(),
            "sysConfig.wifiMaxConnectionAttemptInterval"
        );
    }

    #[test]
    fn test_offsets() {
        assert_eq!(ConfigField::CalibrationOffset.offset(), 0);
        assert_eq!(ConfigField::NightModeEnabled.offset(), 6);
        assert_eq!(ConfigField::StepperReverse.offset(), 15);
        assert_eq!(ConfigField::SysMdnsName.offset(), 36);
        assert_eq!(
            ConfigField::SysMqttPassword.offset() + CONFIG_STRING_SIZE,
            CONFIG_SIZE
        );
    }

    #[test]
    fn test_status_names() {
        for field in StatusField::ALL {
            assert_eq!(StatusField::from_name(field.name()), Some(field));
        }
        assert_eq!(StatusField::from_name("position_target"), Some(StatusField::PositionTarget));
    }
}
