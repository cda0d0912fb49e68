//! Human-readable rendering and text input parsing.

use chrono::{NaiveTime, Timelike};
use shade_protocol::{ConfigField, StatusField, Value, ValueError, SECONDS_PER_DAY};

use crate::descriptor::{FieldDescriptor, UiType};
use crate::error::SchemaError;
use crate::key::{PropertyKey, Snapshot};
use crate::schema::Schema;

const PASSWORD_MASK: &str = "********";

impl Schema {
    /// Render the current value of `key` for display.
    ///
    /// Returns `Ok(None)` for entries without a value.
    pub fn display(&self, key: &str, snapshot: &Snapshot) -> Result<Option<String>, SchemaError> {
        let entry = self.lookup(key)?;
        let Some(field) = entry.as_field() else {
            return Ok(None);
        };
        Ok(field
            .key
            .value_in(snapshot)
            .map(|value| self.format_value(field, &value, snapshot)))
    }

    /// Render `value` the way `field` presents it.
    pub fn format_value(&self, field: &FieldDescriptor, value: &Value, snapshot: &Snapshot) -> String {
        match field.ui {
            UiType::Label => match (field.key, value) {
                (_, Value::Bool(v)) => (if *v { "YES" } else { "NO" }).to_string(),
                (PropertyKey::Status(StatusField::Position), Value::I32(position)) => {
                    let open = snapshot.config.stepper_calibration.open_position;
                    format_position(*position, open)
                }
                _ => value.to_string(),
            },
            UiType::Time => value
                .as_i64()
                .and_then(format_time)
                .unwrap_or_else(|| value.to_string()),
            UiType::Password => match value.as_str() {
                Some("") => String::new(),
                _ => PASSWORD_MASK.to_string(),
            },
            UiType::Select => {
                let item = field
                    .list
                    .and_then(|name| self.list(name))
                    .and_then(|items| {
                        let code = value.as_i64()?;
                        items.iter().find(|item| item.code == code)
                    });
                match item {
                    Some(item) => item.name.to_string(),
                    None => value.to_string(),
                }
            }
            UiType::Trigger | UiType::Int | UiType::Float | UiType::Text => value.to_string(),
        }
    }

    /// Parse user text into a value for `key`.
    ///
    /// Time fields accept `HH:MM` or raw seconds, select fields accept an
    /// option name or its code, everything else is parsed by value kind.
    pub fn parse_input(&self, key: &str, input: &str) -> Result<Value, SchemaError> {
        let key: PropertyKey = key.parse()?;
        let field = self.field(key)?;
        let invalid = |source: ValueError| SchemaError::InvalidValue { key, source };

        match field.ui {
            UiType::Time => {
                if let Ok(time) = NaiveTime::parse_from_str(input.trim(), "%H:%M") {
                    return Ok(Value::U32(time.num_seconds_from_midnight()));
                }
                let value = field.kind.parse(input).map_err(invalid)?;
                match value.as_i64() {
                    Some(secs) if secs < SECONDS_PER_DAY as i64 => Ok(value),
                    _ => Err(invalid(ValueError::InvalidInput {
                        kind: field.kind,
                        input: input.to_string(),
                    })),
                }
            }
            UiType::Select => {
                let by_name = field
                    .list
                    .and_then(|name| self.list(name))
                    .and_then(|items| {
                        items
                            .iter()
                            .find(|item| item.name.eq_ignore_ascii_case(input.trim()))
                    });
                match by_name {
                    Some(item) => Value::U32(item.code as u32)
                        .coerce(field.kind)
                        .map_err(invalid),
                    None => field.kind.parse(input).map_err(invalid),
                }
            }
            _ => field.kind.parse(input).map_err(invalid),
        }
    }
}

/// `HH:MM` for seconds from midnight; `None` past the end of the day.
fn format_time(secs: i64) -> Option<String> {
    let secs = u32::try_from(secs).ok()?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)?;
    Some(format!("{:02}:{:02}", time.hour(), time.minute()))
}

/// Position with its percentage of the open position.
fn format_position(position: i32, open_position: i32) -> String {
    if open_position == 0 {
        return position.to_string();
    }
    let percent = position as f64 / open_position as f64 * 100.0;
    format!("{} ({:.0}%)", position, percent)
}

/// Config fields whose values are secrets.
fn is_secret(field: ConfigField) -> bool {
    matches!(field, ConfigField::SysWifiPassword | ConfigField::SysMqttPassword)
}

impl Snapshot {
    /// Copy with every non-empty secret replaced by the display mask.
    pub fn redacted(&self) -> Snapshot {
        let mut snapshot = self.clone();
        for field in ConfigField::ALL.into_iter().filter(|f| is_secret(*f)) {
            if snapshot.config.get(field).as_str() != Some("") {
                // The mask fits every secret field.
                let _ = snapshot.config.set(field, Value::from(PASSWORD_MASK));
            }
        }
        snapshot
    }
}
