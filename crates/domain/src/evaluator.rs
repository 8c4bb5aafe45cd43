//! Desired-state evaluation.
//!
//! Given the clock, the rule set, the sun times, the manual override table
//! and the current device snapshot, decide what state one switch should be
//! in. Evaluation is pure; the dispatcher turns decisions into commands.
//!
//! Precedence: a live manual override silences everything, a scheduled
//! program event due this minute goes out as is, a paired `b` side mirrors
//! its `a` side, and only then are timer windows consulted. LED strips only
//! ever receive scheduled program events.

use serde::Serialize;

use crate::control::{ControlCommand, ControlKind};
use crate::device::{Device, switch_state};
use crate::manual_override::ManualOverrides;
use crate::program::{FiredEvents, ProgramLibrary};
use crate::rule::{RuleSet, TimerRule};
use crate::sun::SunTimes;
use crate::time::{ClockTime, Timestamp};

/// Desired state of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Desired {
    NoOpinion,
    Off,
    On,
}

impl Desired {
    fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// The state to command when it differs from `current`.
    #[must_use]
    pub fn correction(self, current: bool) -> Option<bool> {
        match self {
            Self::NoOpinion => None,
            Self::On => (!current).then_some(true),
            Self::Off => current.then_some(false),
        }
    }
}

/// Outcome of evaluating one control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub state: Desired,
    /// Motion pulse length to apply, `None` when no rule has an opinion.
    pub motion_interval: Option<u32>,
    /// Scheduled event to deliver instead of any state correction.
    pub event: Option<DueEvent>,
}

impl Decision {
    pub const NO_OPINION: Self = Self {
        state: Desired::NoOpinion,
        motion_interval: None,
        event: None,
    };
}

/// A scheduled program event due now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueEvent {
    /// Scheduled time, the key for repeat suppression.
    pub at: ClockTime,
    pub command: ControlCommand,
}

/// The control being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub device: &'a str,
    pub zone: &'a str,
    pub control: &'a str,
    pub kind: ControlKind,
    /// Reported state, `None` when unknown.
    pub state: Option<bool>,
}

/// Everything the evaluator reads, fixed for one reconciliation tick.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub now: Timestamp,
    pub clock: ClockTime,
    pub rules: &'a RuleSet,
    pub sun: &'a SunTimes,
    pub overrides: &'a ManualOverrides,
    pub devices: &'a [Device],
    pub programs: &'a ProgramLibrary,
    pub fired: &'a FiredEvents,
}

impl Evaluation<'_> {
    /// Compute the desired state of a control.
    #[must_use]
    pub fn evaluate(&self, target: &Target<'_>) -> Decision {
        match target.kind {
            ControlKind::Switch => {}
            ControlKind::Rgb | ControlKind::Argb => {
                return Decision {
                    event: self.due_event(target),
                    ..Decision::NO_OPINION
                };
            }
            _ => return Decision::NO_OPINION,
        }
        if self.overrides.is_live(target.zone, target.control, self.now) {
            return Decision::NO_OPINION;
        }
        if let Some(event) = self.due_event(target) {
            return Decision {
                event: Some(event),
                ..Decision::NO_OPINION
            };
        }
        if let Some(pairing) = self.rules.pairing_for(target.zone, target.control) {
            let a_side = switch_state(self.devices, &pairing.a_zone, &pairing.a_control);
            let state = match (a_side, target.state) {
                (Some(a), Some(b)) if a != b => Desired::from_bool(a),
                _ => Desired::NoOpinion,
            };
            return Decision {
                state,
                ..Decision::NO_OPINION
            };
        }
        self.evaluate_timers(target)
    }

    /// First scheduled event falling on the current minute that has not
    /// been delivered yet.
    fn due_event(&self, target: &Target<'_>) -> Option<DueEvent> {
        self.rules
            .programs_for(target.zone, target.control)
            .flat_map(|rule| &rule.events)
            .find_map(|event| {
                let at = event.due_at(self.clock, self.sun)?;
                if self.fired.fired_recently(target.device, target.control, at, self.now) {
                    return None;
                }
                let command = event.params.command(target.control, target.kind, self.programs)?;
                Some(DueEvent { at, command })
            })
    }

    fn evaluate_timers(&self, target: &Target<'_>) -> Decision {
        let mut state = Desired::NoOpinion;
        let mut motion_interval: Option<u32> = None;

        for rule in self.rules.timers_for(target.zone, target.control) {
            if state == Desired::NoOpinion {
                state = Desired::Off;
            }
            if self.timer_wants_on(rule, target.state) {
                state = Desired::On;
            }
            if let Some(motion) = &rule.motion {
                let on = motion.on.resolve(self.sun);
                let off = motion.off.resolve(self.sun);
                let interval = if in_window(self.clock, on, off) {
                    motion.interval
                } else {
                    0
                };
                motion_interval = Some(motion_interval.map_or(interval, |m| m.max(interval)));
            }
        }

        Decision {
            state,
            motion_interval,
            event: None,
        }
    }

    fn timer_wants_on(&self, rule: &TimerRule, current: Option<bool>) -> bool {
        let on = rule.on.resolve(self.sun);
        let off = rule.off.resolve(self.sun);
        if in_window(self.clock, on, off) {
            return true;
        }
        // keep an already-on switch on from the override anchor until the window opens
        match (rule.override_anchor, current) {
            (Some(anchor), Some(true)) => {
                let from = anchor.resolve(self.sun);
                from <= self.clock && self.clock < on
            }
            _ => false,
        }
    }
}

/// Whether `now` falls inside the window opened at `on` and closed at `off`.
///
/// Windows with `on > off` span midnight. `on == off` is an empty window.
#[must_use]
pub fn in_window(now: ClockTime, on: ClockTime, off: ClockTime) -> bool {
    if on < off {
        on <= now && now < off
    } else if on > off {
        now > on || now < off
    } else {
        false
    }
}
