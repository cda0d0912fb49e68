//! Descriptor tables for the shade controller.
//!
//! Configuration entries must appear in wire order; [`crate::Schema::new`]
//! rejects the tables otherwise.

use shade_protocol::{ConfigField, ControlField, PacketType, StatusField, ValueKind};

use crate::descriptor::{ButtonDescriptor, Entry, FieldDescriptor, ListItem, Section, UiType, Visibility};
use crate::key::{ActionKey, PropertyKey};

const TEXT: ValueKind = ValueKind::FixedString(32);
const HOMED: PropertyKey = PropertyKey::Status(StatusField::Homed);

const fn status(field: StatusField, title: &'static str, command: PacketType) -> FieldDescriptor {
    FieldDescriptor::new(PropertyKey::Status(field), title, UiType::Label, field.kind())
        .with_command(command)
}

const fn config(
    field: ConfigField,
    title: &'static str,
    ui: UiType,
    kind: ValueKind,
    command: PacketType,
) -> Entry {
    Entry::Field(FieldDescriptor::new(PropertyKey::Config(field), title, ui, kind).with_command(command))
}

const fn button(action: ActionKey, label: &'static str) -> ButtonDescriptor {
    ButtonDescriptor::new(PropertyKey::Action(action), label)
}

const fn title(label: &'static str) -> Entry {
    Entry::Title {
        label,
        margin_top: false,
    }
}

const ACTIONS_TITLE: Entry = Entry::Title {
    label: "Actions",
    margin_top: true,
};

/// Select lists referenced by [`FieldDescriptor::list`].
pub static LISTS: &[(&str, &[ListItem])] = &[(
    "wifiMode",
    &[
        ListItem { code: 0, name: "AP" },
        ListItem { code: 1, name: "STA" },
    ],
)];

/// All sections, in display order.
pub static SECTIONS: &[Section] = &[
    Section {
        id: "status",
        title: "Status",
        collapse: false,
        entries: &[
            Entry::Field(status(StatusField::Homed, "Homed", PacketType::Homed)),
            Entry::Field(
                status(StatusField::Moving, "Moving", PacketType::Moving)
                    .visible_if(Visibility::when(HOMED)),
            ),
            Entry::Field(
                status(StatusField::Position, "Position", PacketType::Position)
                    .visible_if(Visibility::when(HOMED)),
            ),
        ],
    },
    Section {
        id: "general",
        title: "General",
        collapse: false,
        entries: &[
            Entry::Field(
                FieldDescriptor::new(
                    PropertyKey::Control(ControlField::Power),
                    "Power",
                    UiType::Trigger,
                    ValueKind::Boolean,
                )
                .with_command(PacketType::Power),
            ),
            ACTIONS_TITLE,
            Entry::Button(
                button(ActionKey::Homing, "Homing")
                    .with_command(PacketType::Homing)
                    .visible_if(Visibility::unless(HOMED)),
            ),
            Entry::Button(
                button(ActionKey::Open, "Open")
                    .with_command(PacketType::Open)
                    .visible_if(Visibility::when(HOMED)),
            ),
            Entry::Button(
                button(ActionKey::Close, "Close")
                    .with_command(PacketType::Close)
                    .visible_if(Visibility::when(HOMED)),
            ),
        ],
    },
    Section {
        id: "calibration",
        title: "Calibration",
        collapse: true,
        entries: &[
            config(
                ConfigField::CalibrationOffset,
                "Offset",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperCalibrationOffset,
            ),
            config(
                ConfigField::CalibrationOpenPosition,
                "Open Position",
                UiType::Int,
                ValueKind::Int32,
                PacketType::StepperCalibrationOpenPosition,
            ),
        ],
    },
    Section {
        id: "night_mode",
        title: "Night Mode",
        collapse: true,
        entries: &[
            config(
                ConfigField::NightModeEnabled,
                "Enabled",
                UiType::Trigger,
                ValueKind::Boolean,
                PacketType::NightModeEnabled,
            ),
            config(
                ConfigField::NightModeStartTime,
                "Start Time",
                UiType::Time,
                ValueKind::Uint32,
                PacketType::NightModeStart,
            ),
            config(
                ConfigField::NightModeEndTime,
                "End Time",
                UiType::Time,
                ValueKind::Uint32,
                PacketType::NightModeEnd,
            ),
        ],
    },
    Section {
        id: "stepper",
        title: "Stepper",
        collapse: true,
        entries: &[
            config(
                ConfigField::StepperReverse,
                "Reverse Direction",
                UiType::Trigger,
                ValueKind::Boolean,
                PacketType::StepperConfigReverse,
            ),
            config(
                ConfigField::StepperResolution,
                "Resolution",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperConfigResolution,
            ),
            title("Speed Settings"),
            config(
                ConfigField::StepperOpenSpeed,
                "Open Speed",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperConfigOpenSpeed,
            ),
            config(
                ConfigField::StepperCloseSpeed,
                "Close Speed",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperConfigCloseSpeed,
            ),
            config(
                ConfigField::StepperAcceleration,
                "Acceleration",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperConfigAcceleration,
            ),
            title("Homing Settings"),
            config(
                ConfigField::StepperHomingSpeed,
                "Homing Speed",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperConfigHomingSpeed,
            ),
            config(
                ConfigField::StepperHomingSpeedSecond,
                "Secondary Homing Speed",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::StepperConfigHomingSpeedSecond,
            ),
            config(
                ConfigField::StepperHomingSteps,
                "Homing Steps",
                UiType::Int,
                ValueKind::Int32,
                PacketType::StepperConfigHomingSteps,
            ),
            config(
                ConfigField::StepperHomingStepsMax,
                "Max Homing Steps",
                UiType::Int,
                ValueKind::Int32,
                PacketType::StepperConfigHomingStepsMax,
            ),
            ACTIONS_TITLE,
            Entry::Button(button(ActionKey::ApplyStepperConfig, "Apply")),
        ],
    },
    Section {
        id: "system",
        title: "System Settings",
        collapse: true,
        entries: &[
            config(
                ConfigField::SysMdnsName,
                "mDNS Name",
                UiType::Text,
                TEXT,
                PacketType::SysConfigMdnsName,
            ),
            title("WiFi"),
            Entry::Field(
                FieldDescriptor::new(
                    PropertyKey::Config(ConfigField::SysWifiMode),
                    "Mode",
                    UiType::Select,
                    ValueKind::Uint8,
                )
                .with_command(PacketType::SysConfigWifiMode)
                .with_list("wifiMode"),
            ),
            config(
                ConfigField::SysWifiSsid,
                "SSID",
                UiType::Text,
                TEXT,
                PacketType::SysConfigWifiSsid,
            ),
            config(
                ConfigField::SysWifiPassword,
                "Password",
                UiType::Password,
                TEXT,
                PacketType::SysConfigWifiPassword,
            ),
            title("WiFi Advanced"),
            config(
                ConfigField::SysWifiConnectionCheckInterval,
                "Connection Check Interval",
                UiType::Int,
                ValueKind::Uint32,
                PacketType::SysConfigWifiConnectionCheckInterval,
            ),
            config(
                ConfigField::SysWifiMaxConnectionAttemptInterval,
                "Max Connection Attempt Interval",
                UiType::Int,
                ValueKind::Uint32,
                PacketType::SysConfigWifiMaxConnectionAttemptInterval,
            ),
            title("Stepper Pins"),
            config(
                ConfigField::SysStepperPin1,
                "Pin 1",
                UiType::Int,
                ValueKind::Uint8,
                PacketType::SysConfigStepper1Pin,
            ),
            config(
                ConfigField::SysStepperPin2,
                "Pin 2",
                UiType::Int,
                ValueKind::Uint8,
                PacketType::SysConfigStepper2Pin,
            ),
            config(
                ConfigField::SysStepperPin3,
                "Pin 3",
                UiType::Int,
                ValueKind::Uint8,
                PacketType::SysConfigStepper3Pin,
            ),
            config(
                ConfigField::SysStepperPin4,
                "Pin 4",
                UiType::Int,
                ValueKind::Uint8,
                PacketType::SysConfigStepper4Pin,
            ),
            config(
                ConfigField::SysStepperPinEn,
                "Enable Pin",
                UiType::Int,
                ValueKind::Uint8,
                PacketType::SysConfigStepperEnPin,
            ),
            title("Endstop"),
            config(
                ConfigField::SysEndstopPin,
                "Pin",
                UiType::Int,
                ValueKind::Uint8,
                PacketType::SysConfigEndstopPin,
            ),
            config(
                ConfigField::SysEndstopHighState,
                "Active High",
                UiType::Trigger,
                ValueKind::Boolean,
                PacketType::SysConfigEndstopHighState,
            ),
            title("Time"),
            config(
                ConfigField::SysTimeZone,
                "Time Zone",
                UiType::Float,
                ValueKind::Float32,
                PacketType::SysConfigTimeZone,
            ),
            title("MQTT"),
            config(
                ConfigField::SysMqtt,
                "Enabled",
                UiType::Trigger,
                ValueKind::Boolean,
                PacketType::SysConfigMqttEnabled,
            ),
            config(
                ConfigField::SysMqttHost,
                "Host",
                UiType::Text,
                TEXT,
                PacketType::SysConfigMqttHost,
            ),
            config(
                ConfigField::SysMqttPort,
                "Port",
                UiType::Int,
                ValueKind::Uint16,
                PacketType::SysConfigMqttPort,
            ),
            config(
                ConfigField::SysMqttUser,
                "User",
                UiType::Text,
                TEXT,
                PacketType::SysConfigMqttUser,
            ),
            config(
                ConfigField::SysMqttPassword,
                "Password",
                UiType::Password,
                TEXT,
                PacketType::SysConfigMqttPassword,
            ),
            ACTIONS_TITLE,
            Entry::Button(button(ActionKey::ApplySysConfig, "Apply")),
        ],
    },
];

/// Options of a select list.
pub fn list(name: &str) -> Option<&'static [ListItem]> {
    LISTS
        .iter()
        .find(|(list, _)| *list == name)
        .map(|(_, items)| *items)
}
