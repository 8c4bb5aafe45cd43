//! Controls: the addressable switches, sensors and LED strips a device exposes.
//!
//! Devices report their controls as a JSON array whose entries are tagged
//! by a `type` field. Each variant validates its own shape at
//! deserialisation time; unknown types are kept as
//! [`Control::Unsupported`] so the rest of the snapshot stays usable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One control reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Control {
    #[serde(rename = "switch")]
    Switch(SwitchControl),
    #[serde(rename = "temp/humidity")]
    Sensor(SensorControl),
    #[serde(rename = "rgb")]
    Rgb(ProgramControl),
    #[serde(rename = "argb")]
    Argb(ProgramControl),
    #[serde(rename = "dummy")]
    Dummy(NamedControl),
    #[serde(other, rename = "unsupported")]
    Unsupported,
}

/// Kind of a [`Control`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Switch,
    Sensor,
    Rgb,
    Argb,
    Dummy,
    Unsupported,
}

impl Control {
    /// Name of the control, `None` for unsupported entries.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Switch(c) => Some(&c.name),
            Self::Sensor(c) => Some(&c.name),
            Self::Rgb(c) | Self::Argb(c) => Some(&c.name),
            Self::Dummy(c) => Some(&c.name),
            Self::Unsupported => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::Switch(_) => ControlKind::Switch,
            Self::Sensor(_) => ControlKind::Sensor,
            Self::Rgb(_) => ControlKind::Rgb,
            Self::Argb(_) => ControlKind::Argb,
            Self::Dummy(_) => ControlKind::Dummy,
            Self::Unsupported => ControlKind::Unsupported,
        }
    }

    #[must_use]
    pub fn as_switch(&self) -> Option<&SwitchControl> {
        match self {
            Self::Switch(switch) => Some(switch),
            _ => None,
        }
    }
}

/// An on/off relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchControl {
    pub name: String,
    #[serde(deserialize_with = "flag::deserialize")]
    pub state: bool,
    #[serde(default)]
    pub context: SwitchContext,
    /// Motion pulse length in seconds, only reported by switches wired to
    /// a motion sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_interval: Option<u32>,
}

/// Provenance of a switch's last state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchContext {
    #[default]
    Init,
    Network,
    Manual,
    Motion,
    #[serde(other)]
    Unknown,
}

/// A temperature/humidity sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorControl {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub humidity: Option<f64>,
}

/// An LED strip driven by a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramControl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<serde_json::Value>,
}

/// A control that only carries a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedControl {
    pub name: String,
}

/// A single corrective or manual command for one control.
///
/// Serialised as one entry of the `controls` array posted to a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlCommand {
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "flag::serialize"
    )]
    pub state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion_interval: Option<u32>,
}

impl ControlCommand {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
            program: None,
            motion_interval: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: bool) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_program(mut self, program: serde_json::Value) -> Self {
        self.program = Some(program);
        self
    }

    #[must_use]
    pub fn with_motion_interval(mut self, interval: u32) -> Self {
        self.motion_interval = Some(interval);
        self
    }

    /// Whether the command would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.program.is_none() && self.motion_interval.is_none()
    }
}

/// Body of a `POST /control` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlRequest {
    pub controls: Vec<ControlCommand>,
}

/// Devices encode booleans as `0`/`1`, sometimes as strings.
pub(crate) mod flag {
    use super::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    fn interpret<E: serde::de::Error>(raw: Raw) -> Result<bool, E> {
        match raw {
            Raw::Bool(value) => Ok(value),
            Raw::Int(value) => Ok(value != 0),
            Raw::Text(text) => match text.trim() {
                "1" | "true" | "on" => Ok(true),
                "0" | "false" | "off" => Ok(false),
                other => Err(E::custom(format!("invalid flag value {other:?}"))),
            },
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        interpret(Raw::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            Some(raw) => interpret(raw).map(Some),
            None => Ok(None),
        }
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(flag) => serializer.serialize_u8(u8::from(*flag)),
            None => serializer.serialize_none(),
        }
    }
}

/// Sensors report `"dummy"` or similar placeholders when not wired.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_switch_with_integer_state() {
        let control: Control = serde_json::from_str(
            r#"{"name":"Lights","type":"switch","state":1,"context":"manual","motion_interval":60}"#,
        )
        .unwrap();
        let switch = control.as_switch().unwrap();
        assert!(switch.state);
        assert_eq!(switch.context, SwitchContext::Manual);
        assert_eq!(switch.motion_interval, Some(60));
    }

    #[test]
    fn should_parse_switch_with_string_state() {
        let control: Control =
            serde_json::from_str(r#"{"name":"Fan","type":"switch","state":"0"}"#).unwrap();
        let switch = control.as_switch().unwrap();
        assert!(!switch.state);
        assert_eq!(switch.context, SwitchContext::Init);
    }

    #[test]
    fn should_map_unknown_context_to_unknown() {
        let control: Control = serde_json::from_str(
            r#"{"name":"Fan","type":"switch","state":0,"context":"timer"}"#,
        )
        .unwrap();
        assert_eq!(control.as_switch().unwrap().context, SwitchContext::Unknown);
    }

    #[test]
    fn should_keep_unknown_control_types_as_unsupported() {
        let control: Control =
            serde_json::from_str(r#"{"name":"Blinds","type":"shutter"}"#).unwrap();
        assert_eq!(control, Control::Unsupported);
        assert_eq!(control.name(), None);
    }

    #[test]
    fn should_parse_sensor_with_placeholder_values() {
        let control: Control = serde_json::from_str(
            r#"{"name":"Temp","type":"temp/humidity","temp":"dummy","humidity":41.5}"#,
        )
        .unwrap();
        let Control::Sensor(sensor) = control else {
            panic!("expected sensor");
        };
        assert_eq!(sensor.temp, None);
        assert_eq!(sensor.humidity, Some(41.5));
    }

    #[test]
    fn should_reject_switch_without_state() {
        let result = serde_json::from_str::<Control>(r#"{"name":"Lights","type":"switch"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn should_serialize_command_state_as_integer() {
        let cmd = ControlCommand::new("Lights").with_state(true);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Lights", "state": 1}));
    }

    #[test]
    fn should_omit_unset_command_fields() {
        let cmd = ControlCommand::new("Strip").with_program(serde_json::json!("rainbow"));
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Strip", "program": "rainbow"}));
        assert!(ControlCommand::new("Idle").is_empty());
    }

    #[test]
    fn should_report_kind_of_program_controls() {
        let rgb = Control::Rgb(ProgramControl {
            name: "Strip".to_string(),
            program: None,
        });
        assert_eq!(rgb.kind(), ControlKind::Rgb);
    }
}
