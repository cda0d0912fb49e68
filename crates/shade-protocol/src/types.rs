//! Decoded device status and configuration.
//!
//! Both structures are decoded by walking the field tables in
//! [`crate::fields`], so the wire order lives in exactly one place.

use bytes::Bytes;
use serde::Serialize;

use crate::codec::{ensure_len, Parser, Writer};
use crate::error::{DecodeError, ValueError};
use crate::fields::{ConfigField, ControlField, StatusField, CONFIG_SIZE, STATE_SIZE};
use crate::value::{Value, ValueKind};

// ============================================================================
// Device Status
// ============================================================================

/// Live device status (`GET_STATE` response).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeviceStatus {
    /// The endstop has been found since boot.
    pub homed: bool,
    /// The stepper is running.
    pub moving: bool,
    /// Current position in steps.
    pub position: i32,
    /// Target position in percent.
    pub position_target: f32,
    /// Calibration offset applied after homing, in steps.
    pub offset: i16,
}

impl DeviceStatus {
    /// Decode a `GET_STATE` payload. Trailing bytes are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(data, STATE_SIZE)?;

        let mut parser = Parser::new(data);
        let mut status = DeviceStatus::default();
        for field in StatusField::ALL {
            let value = parser.read_value(field.kind())?;
            status.set(field, value)?;
        }
        Ok(status)
    }

    /// Encode as a `GET_STATE` payload.
    pub fn encode(&self) -> Bytes {
        let mut writer = Writer::with_capacity(STATE_SIZE);
        writer.write_boolean(self.homed);
        writer.write_boolean(self.moving);
        writer.write_int32(self.position);
        writer.write_float32(self.position_target);
        writer.write_int16(self.offset);
        writer.freeze()
    }

    /// Read one field.
    pub fn get(&self, field: StatusField) -> Value {
        match field {
            StatusField::Homed => Value::Bool(self.homed),
            StatusField::Moving => Value::Bool(self.moving),
            StatusField::Position => Value::I32(self.position),
            StatusField::PositionTarget => Value::F32(self.position_target),
            StatusField::Offset => Value::I16(self.offset),
        }
    }

    /// Overwrite one field, converting `value` to the field's kind.
    pub fn set(&mut self, field: StatusField, value: Value) -> Result<(), ValueError> {
        let value = value.coerce(field.kind())?;
        match (field, value) {
            (StatusField::Homed, Value::Bool(v)) => self.homed = v,
            (StatusField::Moving, Value::Bool(v)) => self.moving = v,
            (StatusField::Position, Value::I32(v)) => self.position = v,
            (StatusField::PositionTarget, Value::F32(v)) => self.position_target = v,
            (StatusField::Offset, Value::I16(v)) => self.offset = v,
            (field, value) => return Err(mismatch(field.kind(), &value)),
        }
        Ok(())
    }
}

// ============================================================================
// Device Configuration
// ============================================================================

/// Stepper calibration group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepperCalibration {
    /// Steps between the endstop and the closed position.
    pub offset: u16,
    /// Fully open position in steps.
    pub open_position: i32,
}

/// Night mode group. Times are seconds from local midnight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NightMode {
    pub enabled: bool,
    /// Window start.
    pub start_time: u32,
    /// Window end; may be earlier than the start to wrap past midnight.
    pub end_time: u32,
}

/// Stepper motion group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepperConfig {
    /// Invert the motor direction.
    pub reverse: bool,
    /// Steps per revolution.
    pub resolution: u16,
    /// Opening speed in steps per second.
    pub open_speed: u16,
    /// Closing speed in steps per second.
    pub close_speed: u16,
    /// Acceleration in steps per second squared.
    pub acceleration: u16,
    /// Speed of the first approach to the endstop.
    pub homing_speed: u16,
    /// Speed of the slow second approach.
    pub homing_speed_second: u16,
    /// Back-off distance between the two approaches.
    pub homing_steps: i32,
    /// Travel limit before homing gives up.
    pub homing_steps_max: i32,
}

/// System group: network, pins, time and MQTT.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SysConfig {
    /// mDNS host name.
    pub mdns_name: String,
    /// 0 = access point, 1 = station.
    pub wifi_mode: u8,
    /// Network to join in station mode.
    pub wifi_ssid: String,
    /// Station mode password.
    pub wifi_password: String,
    /// Link check period in milliseconds.
    pub wifi_connection_check_interval: u32,
    /// Longest wait between reconnect attempts in milliseconds.
    pub wifi_max_connection_attempt_interval: u32,
    /// Stepper driver coil pin 1.
    pub stepper_pin_1: u8,
    /// Stepper driver coil pin 2.
    pub stepper_pin_2: u8,
    /// Stepper driver coil pin 3.
    pub stepper_pin_3: u8,
    /// Stepper driver coil pin 4.
    pub stepper_pin_4: u8,
    /// Stepper driver enable pin.
    pub stepper_pin_en: u8,
    /// Endstop input pin.
    pub endstop_pin: u8,
    /// The endstop reads high when triggered.
    pub endstop_high_state: bool,
    /// UTC offset in hours.
    pub time_zone: f32,
    /// MQTT client enabled.
    pub mqtt: bool,
    /// Broker host.
    pub mqtt_host: String,
    /// Broker port.
    pub mqtt_port: u16,
    /// Broker user.
    pub mqtt_user: String,
    /// Broker password.
    pub mqtt_password: String,
}

/// Persisted device configuration (`GET_CONFIG` response).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// First on the wire.
    pub stepper_calibration: StepperCalibration,
    pub night_mode: NightMode,
    pub stepper_config: StepperConfig,
    /// Last on the wire.
    pub sys_config: SysConfig,
}

/// Borrowed storage slot of one configuration field.
enum Slot<'a> {
    Bool(&'a mut bool),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    I32(&'a mut i32),
    F32(&'a mut f32),
    Text(&'a mut String),
}

impl DeviceConfig {
    /// Values the firmware ships with.
    pub fn factory_defaults() -> Self {
        const RESOLUTION: u16 = 4096;
        DeviceConfig {
            stepper_calibration: StepperCalibration {
                offset: 100,
                open_position: RESOLUTION as i32 * 10,
            },
            night_mode: NightMode {
                enabled: false,
                start_time: 0,
                end_time: 10 * 60 * 60,
            },
            stepper_config: StepperConfig {
                reverse: false,
                resolution: RESOLUTION,
                open_speed: 300,
                close_speed: 500,
                acceleration: 300,
                homing_speed: 300,
                homing_speed_second: 100,
                homing_steps: 300,
                homing_steps_max: RESOLUTION as i32 * 10,
            },
            sys_config: SysConfig {
                mdns_name: "esp_shade".to_string(),
                wifi_mode: 0,
                wifi_ssid: String::new(),
                wifi_password: String::new(),
                wifi_connection_check_interval: 5_000,
                wifi_max_connection_attempt_interval: 120_000,
                stepper_pin_1: 9,
                stepper_pin_2: 6,
                stepper_pin_3: 7,
                stepper_pin_4: 5,
                stepper_pin_en: 8,
                endstop_pin: 20,
                endstop_high_state: false,
                time_zone: 5.0,
                mqtt: false,
                mqtt_host: String::new(),
                mqtt_port: 1883,
                mqtt_user: String::new(),
                mqtt_password: String::new(),
            },
        }
    }

    /// Decode a `GET_CONFIG` payload, all four groups in wire order.
    ///
    /// A short buffer fails before anything is read. Trailing bytes are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        ensure_len(data, CONFIG_SIZE)?;

        let mut parser = Parser::new(data);
        let mut config = DeviceConfig::default();
        for field in ConfigField::ALL {
            let value = parser.read_value(field.kind())?;
            config.set(field, value)?;
        }
        Ok(config)
    }

    /// Encode as a `GET_CONFIG` payload.
    pub fn encode(&self) -> Result<Bytes, ValueError> {
        let mut writer = Writer::with_capacity(CONFIG_SIZE);
        for field in ConfigField::ALL {
            writer.write_value(field.kind(), &self.get(field))?;
        }
        Ok(writer.freeze())
    }

    /// Read one field.
    pub fn get(&self, field: ConfigField) -> Value {
        let cal = &self.stepper_calibration;
        let night = &self.night_mode;
        let stepper = &self.stepper_config;
        let sys = &self.sys_config;

        match field {
            ConfigField::CalibrationOffset => cal.offset.into(),
            ConfigField::CalibrationOpenPosition => cal.open_position.into(),

            ConfigField::NightModeEnabled => night.enabled.into(),
            ConfigField::NightModeStartTime => night.start_time.into(),
            ConfigField::NightModeEndTime => night.end_time.into(),

            ConfigField::StepperReverse => stepper.reverse.into(),
            ConfigField::StepperResolution => stepper.resolution.into(),
            ConfigField::StepperOpenSpeed => stepper.open_speed.into(),
            ConfigField::StepperCloseSpeed => stepper.close_speed.into(),
            ConfigField::StepperAcceleration => stepper.acceleration.into(),
            ConfigField::StepperHomingSpeed => stepper.homing_speed.into(),
            ConfigField::StepperHomingSpeedSecond => stepper.homing_speed_second.into(),
            ConfigField::StepperHomingSteps => stepper.homing_steps.into(),
            ConfigField::StepperHomingStepsMax => stepper.homing_steps_max.into(),

            ConfigField::SysMdnsName => sys.mdns_name.as_str().into(),
            ConfigField::SysWifiMode => sys.wifi_mode.into(),
            ConfigField::SysWifiSsid => sys.wifi_ssid.as_str().into(),
            ConfigField::SysWifiPassword => sys.wifi_password.as_str().into(),
            ConfigField::SysWifiConnectionCheckInterval => {
                sys.wifi_connection_check_interval.into()
            }
            ConfigField::SysWifiMaxConnectionAttemptInterval => {
                sys.wifi_max_connection_attempt_interval.into()
            }
            ConfigField::SysStepperPin1 => sys.stepper_pin_1.into(),
            ConfigField::SysStepperPin2 => sys.stepper_pin_2.into(),
            ConfigField::SysStepperPin3 => sys.stepper_pin_3.into(),
            ConfigField::SysStepperPin4 => sys.stepper_pin_4.into(),
            ConfigField::SysStepperPinEn => sys.stepper_pin_en.into(),
            ConfigField::SysEndstopPin => sys.endstop_pin.into(),
            ConfigField::SysEndstopHighState => sys.endstop_high_state.into(),
            ConfigField::SysTimeZone => sys.time_zone.into(),
            ConfigField::SysMqtt => sys.mqtt.into(),
            ConfigField::SysMqttHost => sys.mqtt_host.as_str().into(),
            ConfigField::SysMqttPort => sys.mqtt_port.into(),
            ConfigField::SysMqttUser => sys.mqtt_user.as_str().into(),
            ConfigField::SysMqttPassword => sys.mqtt_password.as_str().into(),
        }
    }

    /// Overwrite one field, converting `value` to the field's kind.
    ///
    /// On error the configuration is unchanged.
    pub fn set(&mut self, field: ConfigField, value: Value) -> Result<(), ValueError> {
        let kind = field.kind();
        let value = value.coerce(kind)?;
        match (self.slot(field), value) {
            (Slot::Bool(slot), Value::Bool(v)) => *slot = v,
            (Slot::U8(slot), Value::U8(v)) => *slot = v,
            (Slot::U16(slot), Value::U16(v)) => *slot = v,
            (Slot::U32(slot), Value::U32(v)) => *slot = v,
            (Slot::I32(slot), Value::I32(v)) => *slot = v,
            (Slot::F32(slot), Value::F32(v)) => *slot = v,
            (Slot::Text(slot), Value::Text(v)) => *slot = v,
            (_, value) => return Err(mismatch(kind, &value)),
        }
        Ok(())
    }

    fn slot(&mut self, field: ConfigField) -> Slot<'_> {
        let cal = &mut self.stepper_calibration;
        let night = &mut self.night_mode;
        let stepper = &mut self.stepper_config;
        let sys = &mut self.sys_config;

        match field {
            ConfigField::CalibrationOffset => Slot::U16(&mut cal.offset),
            ConfigField::CalibrationOpenPosition => Slot::I32(&mut cal.open_position),

            ConfigField::NightModeEnabled => Slot::Bool(&mut night.enabled),
            ConfigField::NightModeStartTime => Slot::U32(&mut night.start_time),
            ConfigField::NightModeEndTime => Slot::U32(&mut night.end_time),

            ConfigField::StepperReverse => Slot::Bool(&mut stepper.reverse),
            ConfigField::StepperResolution => Slot::U16(&mut stepper.resolution),
            ConfigField::StepperOpenSpeed => Slot::U16(&mut stepper.open_speed),
            ConfigField::StepperCloseSpeed => Slot::U16(&mut stepper.close_speed),
            ConfigField::StepperAcceleration => Slot::U16(&mut stepper.acceleration),
            ConfigField::StepperHomingSpeed => Slot::U16(&mut stepper.homing_speed),
            ConfigField::StepperHomingSpeedSecond => Slot::U16(&mut stepper.homing_speed_second),
            ConfigField::StepperHomingSteps => Slot::I32(&mut stepper.homing_steps),
            ConfigField::StepperHomingStepsMax => Slot::I32(&mut stepper.homing_steps_max),

            ConfigField::SysMdnsName => Slot::Text(&mut sys.mdns_name),
            ConfigField::SysWifiMode => Slot::U8(&mut sys.wifi_mode),
            ConfigField::SysWifiSsid => Slot::Text(&mut sys.wifi_ssid),
            ConfigField::SysWifiPassword => Slot::Text(&mut sys.wifi_password),
            ConfigField::SysWifiConnectionCheckInterval => {
                Slot::U32(&mut sys.wifi_connection_check_interval)
            }
            ConfigField::SysWifiMaxConnectionAttemptInterval => {
                Slot::U32(&mut sys.wifi_max_connection_attempt_interval)
            }
            ConfigField::SysStepperPin1 => Slot::U8(&mut sys.stepper_pin_1),
            ConfigField::SysStepperPin2 => Slot::U8(&mut sys.stepper_pin_2),
            ConfigField::SysStepperPin3 => Slot::U8(&mut sys.stepper_pin_3),
            ConfigField::SysStepperPin4 => Slot::U8(&mut sys.stepper_pin_4),
            ConfigField::SysStepperPinEn => Slot::U8(&mut sys.stepper_pin_en),
            ConfigField::SysEndstopPin => Slot::U8(&mut sys.endstop_pin),
            ConfigField::SysEndstopHighState => Slot::Bool(&mut sys.endstop_high_state),
            ConfigField::SysTimeZone => Slot::F32(&mut sys.time_zone),
            ConfigField::SysMqtt => Slot::Bool(&mut sys.mqtt),
            ConfigField::SysMqttHost => Slot::Text(&mut sys.mqtt_host),
            ConfigField::SysMqttPort => Slot::U16(&mut sys.mqtt_port),
            ConfigField::SysMqttUser => Slot::Text(&mut sys.mqtt_user),
            ConfigField::SysMqttPassword => Slot::Text(&mut sys.mqtt_password),
        }
    }
}

// ============================================================================
// Controls
// ============================================================================

/// Client-side control values. The device has no query for these; they only
/// change when an apply is acknowledged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub power: bool,
}

impl Controls {
    pub fn get(&self, field: ControlField) -> Value {
        match field {
            ControlField::Power => Value::Bool(self.power),
        }
    }

    pub fn set(&mut self, field: ControlField, value: Value) -> Result<(), ValueError> {
        match (field, value.coerce(field.kind())?) {
            (ControlField::Power, Value::Bool(v)) => self.power = v,
            (field, value) => return Err(mismatch(field.kind(), &value)),
        }
        Ok(())
    }
}

fn mismatch(expected: ValueKind, value: &Value) -> ValueError {
    ValueError::KindMismatch {
        expected,
        found: value.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_zeroes() {
        let status = DeviceStatus::decode(&[0u8; STATE_SIZE]).unwrap();
        assert_eq!(status, DeviceStatus::default());
        assert!(!status.homed);
        assert_eq!(status.position_target, 0.0);
    }

    #[test]
    fn test_status_short_buffer() {
        for len in 0..STATE_SIZE {
            assert_eq!(
                DeviceStatus::decode(&vec![0u8; len]),
                Err(DecodeError::LengthMismatch {
                    expected: STATE_SIZE,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn test_status_field_order() {
        let mut data = vec![1u8, 0];
        data.extend_from_slice(&(-1200i32).to_le_bytes());
        data.extend_from_slice(&42.5f32.to_le_bytes());
        data.extend_from_slice(&(-3i16).to_le_bytes());

        let status = DeviceStatus::decode(&data).unwrap();
        assert!(status.homed);
        assert!(!status.moving);
        assert_eq!(status.position, -1200);
        assert_eq!(status.position_target, 42.5);
        assert_eq!(status.offset, -3);
        assert_eq!(&status.encode()[..], &data[..]);
    }

    #[test]
    fn test_config_get_set() {
        let mut config = DeviceConfig::factory_defaults();
        assert_eq!(config.get(ConfigField::StepperOpenSpeed), Value::U16(300));

        config.set(ConfigField::StepperOpenSpeed, Value::I32(450)).unwrap();
        assert_eq!(config.stepper_config.open_speed, 450);

        let err = config.set(ConfigField::StepperOpenSpeed, Value::I32(-1));
        assert!(err.is_err());
        assert_eq!(config.stepper_config.open_speed, 450);

        config
            .set(ConfigField::SysMqttHost, Value::from("broker.lan"))
            .unwrap();
        assert_eq!(
            config.get(ConfigField::SysMqttHost),
            Value::Text("broker.lan".into())
        );
    }

    #[test]
    fn test_config_encode_size() {
        let bytes = DeviceConfig::factory_defaults().encode().unwrap();
        assert_eq!(bytes.len(), CONFIG_SIZE);
        assert_eq!(
            DeviceConfig::decode(&bytes).unwrap(),
            DeviceConfig::factory_defaults()
        );
    }

    #[test]
    fn test_controls() {
        let mut controls = Controls::default();
        controls.set(ControlField::Power, Value::U8(1)).unwrap();
        assert!(controls.power);
        assert_eq!(controls.get(ControlField::Power), Value::Bool(true));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(DeviceConfig::factory_defaults()).unwrap();
        assert_eq!(json["stepperCalibration"]["openPosition"], 40960);
        assert_eq!(json["sysConfig"]["stepperPinEn"], 8);
        assert_eq!(json["sysConfig"]["wifiMaxConnectionAttemptInterval"], 120000);
    }
}
