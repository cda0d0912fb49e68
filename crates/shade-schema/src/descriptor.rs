//! Schema entry types.
//!
//! This module provides:
//! - [`UiType`] - How a field is presented and edited
//! - [`Visibility`] - A `visible_if` dependency on another property
//! - [`FieldDescriptor`] - A value-bound property
//! - [`ButtonDescriptor`] - A button, optionally bound to a device command
//! - [`Entry`] - One row of a section: title, button or field
//! - [`Section`] - An ordered group of entries
//!
//! All types are const-constructible so the descriptor tables can be statics.

use serde::Serialize;
use shade_protocol::{PacketType, ValueKind};

use crate::key::PropertyKey;

// ============================================================================
// UI Type
// ============================================================================

/// How a field is presented and edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiType {
    /// Read-only text.
    Label,
    /// On/off switch.
    Trigger,
    /// Integer input.
    Int,
    /// Decimal input.
    Float,
    /// Free text.
    Text,
    /// Masked text.
    Password,
    /// One of a named list of codes.
    Select,
    /// Seconds from midnight, shown as `HH:MM`.
    Time,
}

impl std::fmt::Display for UiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UiType::Label => "label",
            UiType::Trigger => "trigger",
            UiType::Int => "int",
            UiType::Float => "float",
            UiType::Text => "text",
            UiType::Password => "password",
            UiType::Select => "select",
            UiType::Time => "time",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Visibility
// ============================================================================

/// Show a property only when another property's value is truthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Visibility {
    /// Property whose value gates this one.
    pub key: PropertyKey,
    /// Show when the value is falsy instead.
    pub invert: bool,
}

impl Visibility {
    pub const fn when(key: PropertyKey) -> Self {
        Visibility { key, invert: false }
    }

    pub const fn unless(key: PropertyKey) -> Self {
        Visibility { key, invert: true }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// A property bound to a value in the status, configuration or control tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub key: PropertyKey,
    pub title: &'static str,
    pub ui: UiType,
    #[serde(serialize_with = "serialize_display")]
    pub kind: ValueKind,
    /// Device command bound to the field: the apply command for writable
    /// fields, the telemetry packet for status labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<PacketType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Visibility>,
    /// Name of the select list for [`UiType::Select`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn new(key: PropertyKey, title: &'static str, ui: UiType, kind: ValueKind) -> Self {
        FieldDescriptor {
            key,
            title,
            ui,
            kind,
            command: None,
            visible_if: None,
            list: None,
        }
    }

    pub const fn with_command(mut self, command: PacketType) -> Self {
        self.command = Some(command);
        self
    }

    pub const fn visible_if(mut self, visibility: Visibility) -> Self {
        self.visible_if = Some(visibility);
        self
    }

    pub const fn with_list(mut self, list: &'static str) -> Self {
        self.list = Some(list);
        self
    }

    /// Maximum text length in bytes for fixed-string fields.
    pub fn max_length(&self) -> Option<usize> {
        match self.kind {
            ValueKind::FixedString(n) => Some(n.saturating_sub(1)),
            _ => None,
        }
    }
}

/// A button. Buttons without a command are client-side grouping markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonDescriptor {
    pub key: PropertyKey,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<PacketType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Visibility>,
}

impl ButtonDescriptor {
    pub const fn new(key: PropertyKey, label: &'static str) -> Self {
        ButtonDescriptor {
            key,
            label,
            command: None,
            visible_if: None,
        }
    }

    pub const fn with_command(mut self, command: PacketType) -> Self {
        self.command = Some(command);
        self
    }

    pub const fn visible_if(mut self, visibility: Visibility) -> Self {
        self.visible_if = Some(visibility);
        self
    }
}

/// One row of a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    /// Section sub-heading.
    Title {
        label: &'static str,
        /// Extra spacing above the heading.
        margin_top: bool,
    },
    Button(ButtonDescriptor),
    Field(FieldDescriptor),
}

impl Entry {
    /// Key of the entry; titles have none.
    pub fn key(&self) -> Option<PropertyKey> {
        match self {
            Entry::Title { .. } => None,
            Entry::Button(button) => Some(button.key),
            Entry::Field(field) => Some(field.key),
        }
    }

    pub fn command(&self) -> Option<PacketType> {
        match self {
            Entry::Title { .. } => None,
            Entry::Button(button) => button.command,
            Entry::Field(field) => field.command,
        }
    }

    pub fn visible_if(&self) -> Option<Visibility> {
        match self {
            Entry::Title { .. } => None,
            Entry::Button(button) => button.visible_if,
            Entry::Field(field) => field.visible_if,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Entry::Title { label, .. } => *label,
            Entry::Button(button) => button.label,
            Entry::Field(field) => field.title,
        }
    }

    pub fn as_field(&self) -> Option<&FieldDescriptor> {
        match self {
            Entry::Field(field) => Some(field),
            _ => None,
        }
    }
}

/// An ordered group of entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    /// Collapsed by default.
    pub collapse: bool,
    pub entries: &'static [Entry],
}

/// One option of a select list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub code: i64,
    pub name: &'static str,
}

fn serialize_display<T: std::fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_protocol::{ConfigField, StatusField};

    #[test]
    fn test_field_builder() {
        let field = FieldDescriptor::new(
            PropertyKey::Config(ConfigField::SysMqttHost),
            "Host",
            UiType::Text,
            ValueKind::FixedString(32),
        )
        .with_command(PacketType::SysConfigMqttHost)
        .visible_if(Visibility::when(PropertyKey::Config(ConfigField::SysMqtt)));

        assert_eq!(field.command, Some(PacketType::SysConfigMqttHost));
        assert_eq!(field.max_length(), Some(31));
        assert!(!field.visible_if.unwrap().invert);
    }

    #[test]
    fn test_entry_accessors() {
        let title = Entry::Title {
            label: "WiFi",
            margin_top: false,
        };
        assert_eq!(title.key(), None);
        assert_eq!(title.label(), "WiFi");

        let label = Entry::Field(FieldDescriptor::new(
            PropertyKey::Status(StatusField::Homed),
            "Homed",
            UiType::Label,
            ValueKind::Boolean,
        ));
        assert_eq!(label.key(), Some(PropertyKey::Status(StatusField::Homed)));
        assert!(label.as_field().is_some());
    }

    #[test]
    fn test_entry_serializes_tagged() {
        let json = serde_json::to_value(Entry::Title {
            label: "MQTT",
            margin_top: true,
        })
        .unwrap();
        assert_eq!(json["type"], "title");
        assert_eq!(json["label"], "MQTT");
    }
}
