//! Rules: timer windows, motion pulses, paired switches and scheduled
//! program events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::program::ProgramRule;
use crate::sun::SunTimes;
use crate::time::ClockTime;

/// A window boundary: a fixed clock time or a symbolic sun event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AnchorRepr", into = "String")]
pub enum Anchor {
    Clock(ClockTime),
    Sunset,
    Sunrise,
}

impl Anchor {
    /// Resolve to a clock time using the current sun times.
    #[must_use]
    pub fn resolve(self, sun: &SunTimes) -> ClockTime {
        match self {
            Self::Clock(time) => time,
            Self::Sunset => sun.sunset,
            Self::Sunrise => sun.sunrise,
        }
    }
}

impl FromStr for Anchor {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sunset" => Ok(Self::Sunset),
            "sunrise" => Ok(Self::Sunrise),
            other => other
                .parse()
                .map(Self::Clock)
                .map_err(|_| ValidationError::InvalidAnchor {
                    value: value.to_string(),
                }),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock(time) => time.fmt(f),
            Self::Sunset => f.write_str("sunset"),
            Self::Sunrise => f.write_str("sunrise"),
        }
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnchorRepr {
    Text(String),
    Number(u16),
}

impl TryFrom<AnchorRepr> for Anchor {
    type Error = ValidationError;

    fn try_from(repr: AnchorRepr) -> Result<Self, Self::Error> {
        match repr {
            AnchorRepr::Text(text) => text.parse(),
            AnchorRepr::Number(hhmm) => ClockTime::from_hhmm(hhmm).map(Self::Clock),
        }
    }
}

/// Daily on/off window for one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRule {
    pub zone: String,
    pub control: String,
    pub on: Anchor,
    pub off: Anchor,
    /// Earlier time from which a switch already on is kept on.
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionRule>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl TimerRule {
    /// Whether the rule targets the given zone and control.
    #[must_use]
    pub fn targets(&self, zone: &str, control: &str) -> bool {
        self.enabled && self.zone == zone && self.control == control
    }
}

/// Motion pulse window attached to a timer rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionRule {
    pub on: Anchor,
    pub off: Anchor,
    /// Pulse length in seconds while inside the window.
    pub interval: u32,
}

/// The `b` switch mirrors the `a` switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedSwitchRule {
    pub a_zone: String,
    pub a_control: String,
    pub b_zone: String,
    pub b_control: String,
}

/// Every rule the dispatcher evaluates against, loaded as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub timers: Vec<TimerRule>,
    pub paired: Vec<PairedSwitchRule>,
    pub programs: Vec<ProgramRule>,
}

impl RuleSet {
    /// Enabled timer rules targeting a control.
    pub fn timers_for<'a>(
        &'a self,
        zone: &'a str,
        control: &'a str,
    ) -> impl Iterator<Item = &'a TimerRule> {
        self.timers.iter().filter(move |t| t.targets(zone, control))
    }

    /// Enabled program schedules targeting a control.
    pub fn programs_for<'a>(
        &'a self,
        zone: &'a str,
        control: &'a str,
    ) -> impl Iterator<Item = &'a ProgramRule> {
        self.programs.iter().filter(move |p| p.targets(zone, control))
    }

    /// The pairing whose `b` side is the given control, if any.
    #[must_use]
    pub fn pairing_for(&self, zone: &str, control: &str) -> Option<&PairedSwitchRule> {
        self.paired
            .iter()
            .find(|p| p.b_zone == zone && p.b_control == control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_symbolic_and_clock_anchors() {
        assert_eq!("sunset".parse::<Anchor>().unwrap(), Anchor::Sunset);
        assert_eq!("Sunrise".parse::<Anchor>().unwrap(), Anchor::Sunrise);
        assert_eq!(
            "0100".parse::<Anchor>().unwrap(),
            Anchor::Clock(ClockTime::from_hm(1, 0).unwrap())
        );
    }

    #[test]
    fn should_reject_unknown_anchor() {
        let err = "dusk".parse::<Anchor>().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidAnchor {
                value: "dusk".to_string()
            }
        );
    }

    #[test]
    fn should_resolve_sun_anchors() {
        let sun = SunTimes::default();
        assert_eq!(Anchor::Sunset.resolve(&sun), sun.sunset);
        assert_eq!(Anchor::Sunrise.resolve(&sun), sun.sunrise);
    }

    #[test]
    fn should_deserialize_rule_set_from_json() {
        let rules: RuleSet = serde_json::from_value(serde_json::json!({
            "timers": [
                {"zone": "Kitchen", "control": "Lights", "on": "sunset", "off": "01:00",
                 "override": "17:00",
                 "motion": {"on": "22:00", "off": "sunrise", "interval": 60}},
                {"zone": "Hall", "control": "Lamp", "on": 700, "off": "0800", "enabled": false}
            ],
            "paired": [
                {"a_zone": "Kitchen", "a_control": "Lights", "b_zone": "Hall", "b_control": "Lamp"}
            ],
            "programs": [
                {"zone": "Hall", "control": "Strip", "events": [
                    {"time": "sunset", "params": {"program": "sunrise"}}
                ]},
                {"zone": "Hall", "control": "Fan", "enabled": false, "events": [
                    {"time": "12:00", "params": {"state": 1}}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(rules.timers.len(), 2);
        assert_eq!(rules.timers[0].override_anchor, Some("17:00".parse().unwrap()));
        assert_eq!(rules.timers[0].motion.as_ref().unwrap().interval, 60);
        assert!(rules.timers[0].enabled);
        assert_eq!(rules.timers_for("Hall", "Lamp").count(), 0);
        assert!(rules.pairing_for("Hall", "Lamp").is_some());
        assert!(rules.pairing_for("Kitchen", "Lights").is_none());
        assert_eq!(rules.programs_for("Hall", "Strip").count(), 1);
        assert_eq!(rules.programs_for("Hall", "Fan").count(), 0);
    }

    #[test]
    fn should_reject_rule_with_invalid_anchor() {
        let result = serde_json::from_value::<TimerRule>(serde_json::json!({
            "zone": "Kitchen", "control": "Lights", "on": "25:00", "off": "sunrise"
        }));
        assert!(result.is_err());
    }
}
