//! Integration tests for the built-in schema: visibility rules, lookups and
//! the values they resolve to.

use shade_protocol::{ConfigField, DeviceConfig, PacketType, Value};
use shade_schema::{Entry, PropertyKey, Schema, SchemaError, Snapshot, UiType};

fn snapshot(homed: bool) -> Snapshot {
    let mut snapshot = Snapshot {
        config: DeviceConfig::factory_defaults(),
        ..Snapshot::default()
    };
    snapshot.status.homed = homed;
    snapshot
}

#[test]
fn test_moving_visible_only_when_homed() {
    let schema = Schema::new().unwrap();
    assert!(!schema.is_visible("status.moving", &snapshot(false)).unwrap());
    assert!(schema.is_visible("status.moving", &snapshot(true)).unwrap());
}

#[test]
fn test_homing_visible_only_when_not_homed() {
    let schema = Schema::new().unwrap();
    assert!(schema.is_visible("do_homing", &snapshot(false)).unwrap());
    assert!(!schema.is_visible("do_homing", &snapshot(true)).unwrap());
}

#[test]
fn test_open_close_follow_homed() {
    let schema = Schema::new().unwrap();
    for key in ["do_open", "do_close", "status.position"] {
        assert!(!schema.is_visible(key, &snapshot(false)).unwrap(), "{key}");
        assert!(schema.is_visible(key, &snapshot(true)).unwrap(), "{key}");
    }
}

#[test]
fn test_ungated_properties_always_visible() {
    let schema = Schema::new().unwrap();
    for homed in [false, true] {
        assert!(schema.is_visible("status.homed", &snapshot(homed)).unwrap());
        assert!(schema.is_visible("power", &snapshot(homed)).unwrap());
        assert!(schema
            .is_visible("sysConfig.mqttHost", &snapshot(homed))
            .unwrap());
    }
}

#[test]
fn test_unknown_key_is_reported() {
    let schema = Schema::new().unwrap();
    assert_eq!(
        schema.is_visible("status.speed", &snapshot(true)),
        Err(SchemaError::UnknownKey("status.speed".into()))
    );
    assert!(schema
        .current_value("sysConfig.hostname", &snapshot(true))
        .is_err());
}

#[test]
fn test_current_value_navigates_trees() {
    let schema = Schema::new().unwrap();
    let mut snapshot = snapshot(true);
    snapshot.status.position = 1234;
    snapshot.controls.power = true;

    assert_eq!(
        schema.current_value("status.position", &snapshot).unwrap(),
        Some(Value::I32(1234))
    );
    assert_eq!(
        schema
            .current_value("stepperConfig.closeSpeed", &snapshot)
            .unwrap(),
        Some(Value::U16(500))
    );
    assert_eq!(
        schema.current_value("sysConfig.mdnsName", &snapshot).unwrap(),
        Some(Value::Text("esp_shade".into()))
    );
    assert_eq!(
        schema.current_value("power", &snapshot).unwrap(),
        Some(Value::Bool(true))
    );
    assert_eq!(schema.current_value("do_open", &snapshot).unwrap(), None);
}

#[test]
fn test_every_command_resolves_to_one_leaf() {
    let schema = Schema::new().unwrap();
    let snapshot = snapshot(true);

    for (_, entry) in schema.entries() {
        let Entry::Field(field) = entry else {
            continue;
        };
        let command = field.command.expect("every field has a command");
        assert_eq!(schema.command_key(command), Some(field.key));

        let value = field
            .key
            .value_in(&snapshot)
            .expect("data-bound fields have a value");
        assert!(field.kind.matches(&value), "{} is {}", field.key, field.kind);
    }
}

#[test]
fn test_sections_in_display_order() {
    let schema = Schema::new().unwrap();
    let titles: Vec<&str> = schema.sections().iter().map(|s| s.title).collect();
    assert_eq!(
        titles,
        [
            "Status",
            "General",
            "Calibration",
            "Night Mode",
            "Stepper",
            "System Settings"
        ]
    );

    let wifi_mode = schema.lookup("sysConfig.wifiMode").unwrap();
    let field = wifi_mode.as_field().unwrap();
    assert_eq!(field.ui, UiType::Select);
    assert_eq!(field.list, Some("wifiMode"));
    assert_eq!(field.command, Some(PacketType::SysConfigWifiMode));
}

#[test]
fn test_schema_serializes() {
    let schema = Schema::new().unwrap();
    let json = serde_json::to_value(schema.sections()).unwrap();
    let status = &json[0]["entries"][1];
    assert_eq!(status["type"], "field");
    assert_eq!(status["key"], "status.moving");
    assert_eq!(status["visible_if"]["key"], "status.homed");
    assert_eq!(status["command"], "MOVING");
    assert_eq!(status["kind"], "Boolean");

    let key: PropertyKey = "sysConfig.mqttPort".parse().unwrap();
    assert_eq!(key, PropertyKey::Config(ConfigField::SysMqttPort));
}
