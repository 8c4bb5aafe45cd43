//! Light programs and the events that push them on a schedule.
//!
//! RGB and ARGB strips speak different program formats, so the named
//! programs live in two separate libraries and a name is always resolved
//! against the library matching the control's kind.

use std::collections::{BTreeMap, HashMap};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::control::{ControlCommand, ControlKind, flag};
use crate::error::ValidationError;
use crate::rule::Anchor;
use crate::sun::SunTimes;
use crate::time::{ClockTime, Timestamp};

/// An event is not fired again for the same control and time within this
/// many seconds.
pub const EVENT_REPEAT_GUARD_SECS: i64 = 60;

/// Named programs for each strip kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramLibrary {
    pub rgb: BTreeMap<String, serde_json::Value>,
    pub argb: BTreeMap<String, serde_json::Value>,
}

impl ProgramLibrary {
    /// Program definition for a control kind, `None` when that kind has no
    /// program of this name.
    #[must_use]
    pub fn get(&self, kind: ControlKind, name: &str) -> Option<&serde_json::Value> {
        match kind {
            ControlKind::Rgb => self.rgb.get(name),
            ControlKind::Argb => self.argb.get(name),
            _ => None,
        }
    }

    /// Whether either library knows the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rgb.contains_key(name) || self.argb.contains_key(name)
    }
}

/// Scheduled events for one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRule {
    pub zone: String,
    pub control: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub events: Vec<ProgramEvent>,
}

fn enabled_by_default() -> bool {
    true
}

impl ProgramRule {
    #[must_use]
    pub fn targets(&self, zone: &str, control: &str) -> bool {
        self.enabled && self.zone == zone && self.control == control
    }
}

/// Parameters pushed to a control at one or more times of day.
///
/// Written with either a single `time` or a `times` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgramEventRepr")]
pub struct ProgramEvent {
    pub times: Vec<Anchor>,
    pub params: EventParams,
}

impl ProgramEvent {
    /// The event time falling on `clock`, if any.
    #[must_use]
    pub fn due_at(&self, clock: ClockTime, sun: &SunTimes) -> Option<ClockTime> {
        self.times
            .iter()
            .map(|anchor| anchor.resolve(sun))
            .find(|at| *at == clock)
    }
}

#[derive(Deserialize)]
struct ProgramEventRepr {
    #[serde(default)]
    time: Option<Anchor>,
    #[serde(default)]
    times: Vec<Anchor>,
    params: EventParams,
}

impl TryFrom<ProgramEventRepr> for ProgramEvent {
    type Error = ValidationError;

    fn try_from(repr: ProgramEventRepr) -> Result<Self, Self::Error> {
        let times = match (repr.time, repr.times.is_empty()) {
            (Some(time), true) => vec![time],
            (None, false) => repr.times,
            _ => return Err(ValidationError::InvalidEventTimes),
        };
        if repr.params.state.is_none() && repr.params.program.is_none() {
            return Err(ValidationError::EmptyEventParams);
        }
        Ok(Self {
            times,
            params: repr.params,
        })
    }
}

/// What an event sets: a switch state, a program, or both for rules that
/// cover mixed controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventParams {
    #[serde(
        default,
        deserialize_with = "flag::deserialize_option",
        serialize_with = "flag::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<ProgramRef>,
}

/// A program given by library name or spelled out in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgramRef {
    Named(String),
    Inline(serde_json::Value),
}

impl EventParams {
    /// Command carrying the part of the params that applies to the control.
    ///
    /// Switches take the state, strips take the program. A named program
    /// missing from the control kind's library yields `None`.
    #[must_use]
    pub fn command(
        &self,
        control: &str,
        kind: ControlKind,
        library: &ProgramLibrary,
    ) -> Option<ControlCommand> {
        match kind {
            ControlKind::Switch => self
                .state
                .map(|state| ControlCommand::new(control).with_state(state)),
            ControlKind::Rgb | ControlKind::Argb => {
                let program = match self.program.as_ref()? {
                    ProgramRef::Named(name) => library.get(kind, name)?.clone(),
                    ProgramRef::Inline(program) => program.clone(),
                };
                Some(ControlCommand::new(control).with_program(program))
            }
            _ => None,
        }
    }

    /// Library name referenced by the params, if any.
    #[must_use]
    pub fn program_name(&self) -> Option<&str> {
        match &self.program {
            Some(ProgramRef::Named(name)) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FiredKey {
    device: String,
    control: String,
    at: ClockTime,
}

/// When each scheduled event last reached its device.
#[derive(Debug, Clone, Default)]
pub struct FiredEvents {
    fired: HashMap<FiredKey, Timestamp>,
}

impl FiredEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, device: &str, control: &str, at: ClockTime, now: Timestamp) {
        let key = FiredKey {
            device: device.to_string(),
            control: control.to_string(),
            at,
        };
        self.fired.insert(key, now);
    }

    /// Whether the event was delivered within the repeat guard.
    #[must_use]
    pub fn fired_recently(&self, device: &str, control: &str, at: ClockTime, now: Timestamp) -> bool {
        let key = FiredKey {
            device: device.to_string(),
            control: control.to_string(),
            at,
        };
        self.fired
            .get(&key)
            .is_some_and(|fired| now - *fired <= TimeDelta::seconds(EVENT_REPEAT_GUARD_SECS))
    }

    /// Drop entries older than the repeat guard.
    pub fn forget_stale(&mut self, now: Timestamp) {
        let guard = TimeDelta::seconds(EVENT_REPEAT_GUARD_SECS);
        self.fired.retain(|_, fired| now - *fired <= guard);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fired.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
