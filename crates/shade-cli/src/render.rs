//! Text output for `dump` and `schema`.

use std::fmt::Write;

use shade_schema::{Entry, Schema, SchemaError, Snapshot};

/// Render every section with current values.
///
/// Entries hidden by their `visible_if` rule are skipped unless `all` is set.
pub fn render_state(schema: &Schema, snapshot: &Snapshot, all: bool) -> Result<String, SchemaError> {
    let mut out = String::new();

    for section in schema.sections() {
        let _ = writeln!(out, "{}", section.title);

        for entry in section.entries {
            if let Some(key) = entry.key() {
                if !all && !schema.is_key_visible(key, snapshot) {
                    continue;
                }
            }

            match entry {
                Entry::Title { label, .. } => {
                    let _ = writeln!(out, "  -- {} --", label);
                }
                Entry::Button(button) => {
                    let _ = writeln!(out, "  [{}] {}", button.label, button.key);
                }
                Entry::Field(field) => {
                    let value = schema
                        .display(&field.key.to_string(), snapshot)?
                        .unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "  {:<34} {:<20} {}",
                        field.key.to_string(),
                        field.title,
                        value
                    );
                }
            }
        }
        out.push('\n');
    }
    Ok(out)
}

/// Render the schema tables: key, ui, kind, command and visibility rule.
pub fn render_schema(schema: &Schema) -> String {
    let mut out = String::new();

    for section in schema.sections() {
        let _ = writeln!(out, "{} ({})", section.title, section.id);
        for entry in section.entries {
            let Some(key) = entry.key() else {
                continue;
            };

            let mut line = format!("  {:<34}", key.to_string());
            if let Some(field) = entry.as_field() {
                let _ = write!(
                    line,
                    " {:<8} {:<16}",
                    field.ui.to_string(),
                    field.kind.to_string()
                );
            } else {
                let _ = write!(line, " {:<8} {:<16}", "button", "");
            }
            match entry.command() {
                Some(command) => {
                    let _ = write!(line, " {:<40}", format!("{} (0x{:02X})", command, command.code()));
                }
                None => {
                    let _ = write!(line, " {:<40}", "-");
                }
            }
            if let Some(rule) = entry.visible_if() {
                let op = if rule.invert { "unless" } else { "if" };
                let _ = write!(line, " {} {}", op, rule.key);
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_protocol::DeviceConfig;

    fn snapshot(homed: bool) -> Snapshot {
        let mut snapshot = Snapshot {
            config: DeviceConfig::factory_defaults(),
            ..Snapshot::default()
        };
        snapshot.status.homed = homed;
        snapshot
    }

    #[test]
    fn test_state_hides_invisible_entries() {
        let schema = Schema::new().unwrap();

        let text = render_state(&schema, &snapshot(false), false).unwrap();
        assert!(text.contains("do_homing"));
        assert!(!text.contains("do_open"));
        assert!(!text.contains("status.moving"));

        let text = render_state(&schema, &snapshot(true), false).unwrap();
        assert!(!text.contains("do_homing"));
        assert!(text.contains("do_open"));

        let text = render_state(&schema, &snapshot(true), true).unwrap();
        assert!(text.contains("do_homing"));
    }

    #[test]
    fn test_state_masks_passwords() {
        let schema = Schema::new().unwrap();
        let mut snapshot = snapshot(true);
        snapshot.config.sys_config.mqtt_password = "secret".into();

        let text = render_state(&schema, &snapshot, false).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains("********"));
    }

    #[test]
    fn test_schema_lists_commands_and_rules() {
        let schema = Schema::new().unwrap();
        let text = render_schema(&schema);

        let homing = text
            .lines()
            .find(|line| line.trim_start().starts_with("do_homing"))
            .unwrap();
        assert!(homing.contains("HOMING (0x11)"));
        assert!(homing.ends_with("unless status.homed"));
        assert!(text.contains("SYS_CONFIG_MQTT_PORT (0x"));
    }
}
