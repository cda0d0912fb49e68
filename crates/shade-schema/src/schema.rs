//! Validated property schema.
//!
//! [`Schema`] indexes the descriptor tables by key and by command, checks
//! them against the wire layout, and answers lookups for the synchronizer
//! and the UI layer.

use std::collections::HashMap;

use shade_protocol::{
    ensure_len, ConfigField, DecodeError, DeviceConfig, PacketType, Parser, Value, ValueKind,
    CONFIG_SIZE,
};

use crate::definitions::{self, SECTIONS};
use crate::descriptor::{Entry, FieldDescriptor, ListItem, Section};
use crate::error::{LayoutIssue, SchemaError};
use crate::key::{PropertyKey, Snapshot};
use crate::visibility::VisibilityGraph;

/// Position of an entry in the section tables.
#[derive(Debug, Clone, Copy)]
struct EntryRef {
    section: usize,
    entry: usize,
}

/// Where a successful apply must be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyTarget {
    pub key: PropertyKey,
    pub kind: ValueKind,
    pub command: PacketType,
}

/// The validated property schema.
#[derive(Debug, Clone)]
pub struct Schema {
    sections: &'static [Section],
    index: HashMap<PropertyKey, EntryRef>,
    commands: HashMap<PacketType, PropertyKey>,
    config_order: Vec<ConfigField>,
    visibility: VisibilityGraph,
}

impl Schema {
    /// Build the schema for the shade controller.
    pub fn new() -> Result<Self, SchemaError> {
        Self::from_sections(SECTIONS)
    }

    /// Build and validate a schema from descriptor tables.
    ///
    /// Fails if a key or command is declared twice, if the `visible_if`
    /// references contain a cycle, or if the configuration fields do not
    /// match the wire layout.
    pub fn from_sections(sections: &'static [Section]) -> Result<Self, SchemaError> {
        let mut index = HashMap::new();
        let mut commands: HashMap<PacketType, PropertyKey> = HashMap::new();
        let mut config_order = Vec::new();
        let mut edges = Vec::new();

        for (s, section) in sections.iter().enumerate() {
            for (e, entry) in section.entries.iter().enumerate() {
                let Some(key) = entry.key() else {
                    continue;
                };

                if index.insert(key, EntryRef { section: s, entry: e }).is_some() {
                    return Err(SchemaError::DuplicateKey(key));
                }

                if let Some(command) = entry.command() {
                    if let Some(&first) = commands.get(&command) {
                        return Err(SchemaError::DuplicateCommand {
                            command,
                            first,
                            second: key,
                        });
                    }
                    commands.insert(command, key);
                }

                if let Some(visibility) = entry.visible_if() {
                    edges.push((key, visibility));
                }

                if let Entry::Field(field) = entry {
                    check_field(field)?;
                    if let PropertyKey::Config(config) = field.key {
                        config_order.push(config);
                    }
                }
            }
        }

        let visibility = VisibilityGraph::new(edges)?;
        check_layout(&config_order)?;

        Ok(Schema {
            sections,
            index,
            commands,
            config_order,
            visibility,
        })
    }

    /// All sections, in display order.
    pub fn sections(&self) -> &'static [Section] {
        self.sections
    }

    /// Every keyed entry, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static Section, &'static Entry)> {
        let sections = self.sections;
        sections
            .iter()
            .flat_map(|section| section.entries.iter().map(move |entry| (section, entry)))
            .filter(|(_, entry)| entry.key().is_some())
    }

    /// Resolve a dotted key to its entry.
    pub fn lookup(&self, key: &str) -> Result<&'static Entry, SchemaError> {
        self.entry(key.parse()?)
    }

    /// Resolve a typed key to its entry.
    pub fn entry(&self, key: PropertyKey) -> Result<&'static Entry, SchemaError> {
        let sections = self.sections;
        self.index
            .get(&key)
            .map(|r| &sections[r.section].entries[r.entry])
            .ok_or_else(|| SchemaError::UnknownKey(key.to_string()))
    }

    /// Resolve a key to a value-bound field.
    pub fn field(&self, key: PropertyKey) -> Result<&'static FieldDescriptor, SchemaError> {
        self.entry(key)?
            .as_field()
            .ok_or(SchemaError::NotDataBound(key))
    }

    /// Property bound to `command`, if any.
    pub fn command_key(&self, command: PacketType) -> Option<PropertyKey> {
        self.commands.get(&command).copied()
    }

    /// Current value of `key`.
    ///
    /// Returns `Ok(None)` for buttons, which have no value.
    pub fn current_value(&self, key: &str, snapshot: &Snapshot) -> Result<Option<Value>, SchemaError> {
        let entry = self.lookup(key)?;
        Ok(entry.key().and_then(|k| k.value_in(snapshot)))
    }

    /// Whether `key` should be shown for the given state.
    pub fn is_visible(&self, key: &str, snapshot: &Snapshot) -> Result<bool, SchemaError> {
        let key: PropertyKey = key.parse()?;
        self.entry(key)?;
        Ok(self.visibility.is_visible(&key, snapshot))
    }

    /// Visibility of an already resolved key.
    pub fn is_key_visible(&self, key: PropertyKey, snapshot: &Snapshot) -> bool {
        self.visibility.is_visible(&key, snapshot)
    }

    /// Where and how an edit of `key` is sent.
    ///
    /// Only configuration fields and controls can be written.
    pub fn apply_target(&self, key: PropertyKey) -> Result<ApplyTarget, SchemaError> {
        let field = self.field(key)?;

        match key {
            PropertyKey::Config(_) | PropertyKey::Control(_) => {}
            PropertyKey::Status(_) => return Err(SchemaError::ReadOnly(key)),
            PropertyKey::Action(_) => return Err(SchemaError::NotDataBound(key)),
        }

        let command = field.command.ok_or(SchemaError::NoCommand(key))?;
        Ok(ApplyTarget {
            key,
            kind: field.kind,
            command,
        })
    }

    /// Command sent when the button `key` is pressed.
    pub fn trigger_command(&self, key: PropertyKey) -> Result<PacketType, SchemaError> {
        match self.entry(key)? {
            Entry::Button(button) => button.command.ok_or(SchemaError::NoCommand(key)),
            _ => Err(SchemaError::NotDataBound(key)),
        }
    }

    /// Configuration fields in declaration order, which is the wire order.
    pub fn config_fields(&self) -> &[ConfigField] {
        &self.config_order
    }

    /// Decode a `GET_CONFIG` payload by walking the configuration fields in
    /// declaration order.
    pub fn decode_config(&self, data: &[u8]) -> Result<DeviceConfig, DecodeError> {
        ensure_len(data, CONFIG_SIZE)?;

        let mut parser = Parser::new(data);
        let mut config = DeviceConfig::default();
        for &field in &self.config_order {
            let value = parser.read_value(field.kind())?;
            config.set(field, value)?;
        }
        Ok(config)
    }

    /// Options of a select list.
    pub fn list(&self, name: &str) -> Option<&'static [ListItem]> {
        definitions::list(name)
    }
}

/// Check a field descriptor against the wire kind of its key.
fn check_field(field: &FieldDescriptor) -> Result<(), SchemaError> {
    let wire_kind = match field.key {
        PropertyKey::Status(f) => f.kind(),
        PropertyKey::Config(f) => f.kind(),
        PropertyKey::Control(f) => f.kind(),
        PropertyKey::Action(_) => return Err(SchemaError::NotDataBound(field.key)),
    };
    if field.kind != wire_kind {
        return Err(SchemaError::LayoutMismatch {
            key: field.key,
            reason: LayoutIssue::Kind {
                declared: field.kind,
                wire: wire_kind,
            },
        });
    }

    let wire_command = match field.key {
        PropertyKey::Config(f) => Some(f.apply_command()),
        PropertyKey::Control(f) => Some(f.command()),
        _ => None,
    };
    if let Some(wire) = wire_command {
        if field.command != Some(wire) {
            return Err(SchemaError::LayoutMismatch {
                key: field.key,
                reason: LayoutIssue::Command {
                    declared: field.command,
                    wire,
                },
            });
        }
    }
    Ok(())
}

/// Check that configuration fields are declared exactly once, in wire order.
fn check_layout(declared: &[ConfigField]) -> Result<(), SchemaError> {
    for pair in declared.windows(2) {
        if pair[1] < pair[0] {
            return Err(SchemaError::LayoutMismatch {
                key: PropertyKey::Config(pair[1]),
                reason: LayoutIssue::OutOfOrder,
            });
        }
    }
    if let Some(missing) = ConfigField::ALL.into_iter().find(|f| !declared.contains(f)) {
        return Err(SchemaError::LayoutMismatch {
            key: PropertyKey::Config(missing),
            reason: LayoutIssue::Missing,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ButtonDescriptor, UiType, Visibility};
    use crate::key::ActionKey;
    use shade_protocol::{ControlField, StatusField};

    #[test]
    fn test_builtin_schema_is_valid() {
        let schema = Schema::new().unwrap();
        assert_eq!(schema.config_fields(), &ConfigField::ALL[..]);
        assert_eq!(
            schema.command_key(PacketType::SysConfigWifiMode),
            Some(PropertyKey::Config(ConfigField::SysWifiMode))
        );
        assert_eq!(
            schema.command_key(PacketType::Homing),
            Some(PropertyKey::Action(ActionKey::Homing))
        );
    }

    #[test]
    fn test_lookup_unknown_key() {
        let schema = Schema::new().unwrap();
        assert_eq!(
            schema.lookup("stepperConfig.turbo"),
            Err(SchemaError::UnknownKey("stepperConfig.turbo".into()))
        );
        // A real field that no section declares is unknown to the schema.
        assert!(matches!(
            schema.lookup("status.offset"),
            Err(SchemaError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_apply_targets() {
        let schema = Schema::new().unwrap();

        let target = schema
            .apply_target(PropertyKey::Config(ConfigField::NightModeEndTime))
            .unwrap();
        assert_eq!(target.command, PacketType::NightModeEnd);
        assert_eq!(target.kind, ValueKind::Uint32);

        let power = schema
            .apply_target(PropertyKey::Control(ControlField::Power))
            .unwrap();
        assert_eq!(power.command, PacketType::Power);

        assert_eq!(
            schema.apply_target(PropertyKey::Status(StatusField::Homed)),
            Err(SchemaError::ReadOnly(PropertyKey::Status(StatusField::Homed)))
        );
        assert_eq!(
            schema.apply_target(PropertyKey::Action(ActionKey::Open)),
            Err(SchemaError::NotDataBound(PropertyKey::Action(ActionKey::Open)))
        );
    }

    #[test]
    fn test_trigger_commands() {
        let schema = Schema::new().unwrap();
        assert_eq!(
            schema.trigger_command(PropertyKey::Action(ActionKey::Close)),
            Ok(PacketType::Close)
        );
        assert_eq!(
            schema.trigger_command(PropertyKey::Action(ActionKey::ApplySysConfig)),
            Err(SchemaError::NoCommand(PropertyKey::Action(
                ActionKey::ApplySysConfig
            )))
        );
    }

    static DUPLICATE_KEY: &[Section] = &[Section {
        id: "dup",
        title: "Dup",
        collapse: false,
        entries: &[
            Entry::Button(ButtonDescriptor::new(PropertyKey::Action(ActionKey::Open), "Open")),
            Entry::Button(ButtonDescriptor::new(PropertyKey::Action(ActionKey::Open), "Again")),
        ],
    }];

    static DUPLICATE_COMMAND: &[Section] = &[Section {
        id: "dup",
        title: "Dup",
        collapse: false,
        entries: &[
            Entry::Button(
                ButtonDescriptor::new(PropertyKey::Action(ActionKey::Open), "Open")
                    .with_command(PacketType::Open),
            ),
            Entry::Button(
                ButtonDescriptor::new(PropertyKey::Action(ActionKey::Close), "Close")
                    .with_command(PacketType::Open),
            ),
        ],
    }];

    static CYCLIC: &[Section] = &[Section {
        id: "cyclic",
        title: "Cyclic",
        collapse: false,
        entries: &[
            Entry::Button(
                ButtonDescriptor::new(PropertyKey::Action(ActionKey::Open), "Open")
                    .visible_if(Visibility::when(PropertyKey::Action(ActionKey::Close))),
            ),
            Entry::Button(
                ButtonDescriptor::new(PropertyKey::Action(ActionKey::Close), "Close")
                    .visible_if(Visibility::when(PropertyKey::Action(ActionKey::Open))),
            ),
        ],
    }];

    static WRONG_KIND: &[Section] = &[Section {
        id: "wrong",
        title: "Wrong",
        collapse: false,
        entries: &[Entry::Field(
            FieldDescriptor::new(
                PropertyKey::Config(ConfigField::SysMqttPort),
                "Port",
                UiType::Int,
                ValueKind::Uint8,
            )
            .with_command(PacketType::SysConfigMqttPort),
        )],
    }];

    #[test]
    fn test_rejects_duplicate_key() {
        assert_eq!(
            Schema::from_sections(DUPLICATE_KEY).unwrap_err(),
            SchemaError::DuplicateKey(PropertyKey::Action(ActionKey::Open))
        );
    }

    #[test]
    fn test_rejects_duplicate_command() {
        assert!(matches!(
            Schema::from_sections(DUPLICATE_COMMAND),
            Err(SchemaError::DuplicateCommand {
                command: PacketType::Open,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_cycle_at_construction() {
        assert!(matches!(
            Schema::from_sections(CYCLIC),
            Err(SchemaError::CyclicVisibility { .. })
        ));
    }

    #[test]
    fn test_rejects_kind_mismatch() {
        assert!(matches!(
            Schema::from_sections(WRONG_KIND),
            Err(SchemaError::LayoutMismatch {
                reason: LayoutIssue::Kind { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_layout_check() {
        assert_eq!(check_layout(&ConfigField::ALL), Ok(()));

        let mut swapped = ConfigField::ALL.to_vec();
        swapped.swap(0, 1);
        assert_eq!(
            check_layout(&swapped),
            Err(SchemaError::LayoutMismatch {
                key: PropertyKey::Config(ConfigField::CalibrationOffset),
                reason: LayoutIssue::OutOfOrder,
            })
        );

        let missing = &ConfigField::ALL[1..];
        assert_eq!(
            check_layout(missing),
            Err(SchemaError::LayoutMismatch {
                key: PropertyKey::Config(ConfigField::CalibrationOffset),
                reason: LayoutIssue::Missing,
            })
        );
    }

    #[test]
    fn test_decode_config_matches_layout_decode() {
        let schema = Schema::new().unwrap();
        let bytes = DeviceConfig::factory_defaults().encode().unwrap();
        assert_eq!(
            schema.decode_config(&bytes).unwrap(),
            DeviceConfig::factory_defaults()
        );
        assert!(schema.decode_config(&bytes[..10]).is_err());
    }
}
