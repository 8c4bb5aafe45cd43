//! Manual overrides: grace periods during which automation leaves a
//! manually switched control alone.

use std::collections::{HashMap, HashSet};

use chrono::TimeDelta;
use serde::Serialize;

use crate::control::SwitchContext;
use crate::time::Timestamp;

/// Default grace period after a manual switch.
pub const DEFAULT_GRACE_SECS: i64 = 5 * 60 * 60;

/// Zone and control name of a switch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ControlKey {
    pub zone: String,
    pub control: String,
}

impl ControlKey {
    #[must_use]
    pub fn new(zone: impl Into<String>, control: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            control: control.into(),
        }
    }
}

/// An active grace period for one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManualOverrideRecord {
    pub key: ControlKey,
    pub observed_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Table of manual overrides keyed by (zone, control).
///
/// A record is created the first time a control is seen in `manual`
/// context. Once it expires it is not re-armed until the control has left
/// `manual` context at least once, otherwise automation could never resume
/// while the device keeps reporting `manual`.
#[derive(Debug, Clone)]
pub struct ManualOverrides {
    grace: TimeDelta,
    records: HashMap<ControlKey, ManualOverrideRecord>,
    spent: HashSet<ControlKey>,
}

impl ManualOverrides {
    #[must_use]
    pub fn new(grace: TimeDelta) -> Self {
        Self {
            grace,
            records: HashMap::new(),
            spent: HashSet::new(),
        }
    }

    /// Record the observed context of a switch.
    ///
    /// Returns the new record when this observation armed one.
    pub fn observe(
        &mut self,
        zone: &str,
        control: &str,
        context: SwitchContext,
        now: Timestamp,
    ) -> Option<&ManualOverrideRecord> {
        let key = ControlKey::new(zone, control);
        if context != SwitchContext::Manual {
            // a live record runs until expiry; only the re-arm guard clears
            self.spent.remove(&key);
            return None;
        }
        if self.records.contains_key(&key) || self.spent.contains(&key) {
            return None;
        }
        let record = ManualOverrideRecord {
            key: key.clone(),
            observed_at: now,
            expires_at: now + self.grace,
        };
        Some(self.records.entry(key).or_insert(record))
    }

    /// Delete every record whose grace period has elapsed.
    pub fn expire(&mut self, now: Timestamp) -> Vec<ManualOverrideRecord> {
        let expired: Vec<ControlKey> = self
            .records
            .values()
            .filter(|r| r.expires_at <= now)
            .map(|r| r.key.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| {
                let record = self.records.remove(&key)?;
                self.spent.insert(key);
                Some(record)
            })
            .collect()
    }

    /// Whether an unexpired record exists for the control.
    #[must_use]
    pub fn is_live(&self, zone: &str, control: &str, now: Timestamp) -> bool {
        self.records
            .get(&ControlKey::new(zone, control))
            .is_some_and(|r| r.expires_at > now)
    }

    /// Active records ordered by key.
    #[must_use]
    pub fn records(&self) -> Vec<ManualOverrideRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }
}

impl Default for ManualOverrides {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_GRACE_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn should_arm_on_first_manual_sighting() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(1));
        let record = overrides
            .observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0))
            .cloned()
            .unwrap();
        assert_eq!(record.expires_at, at(11, 0));
        assert!(overrides.is_live("Kitchen", "Lights", at(10, 30)));
    }

    #[test]
    fn should_not_extend_existing_record() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(1));
        overrides.observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0));
        assert!(
            overrides
                .observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 30))
                .is_none()
        );
        assert_eq!(overrides.records()[0].expires_at, at(11, 0));
    }

    #[test]
    fn should_stop_being_live_at_expiry() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(1));
        overrides.observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0));
        assert!(!overrides.is_live("Kitchen", "Lights", at(11, 0)));
        let expired = overrides.expire(at(11, 0));
        assert_eq!(expired.len(), 1);
        assert!(overrides.records().is_empty());
    }

    #[test]
    fn should_not_rearm_while_still_manual_after_expiry() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(1));
        overrides.observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0));
        overrides.expire(at(11, 0));
        assert!(
            overrides
                .observe("Kitchen", "Lights", SwitchContext::Manual, at(11, 1))
                .is_none()
        );
        assert!(!overrides.is_live("Kitchen", "Lights", at(11, 1)));
    }

    #[test]
    fn should_rearm_after_leaving_manual_context() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(1));
        overrides.observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0));
        overrides.expire(at(11, 0));
        overrides.observe("Kitchen", "Lights", SwitchContext::Network, at(11, 5));
        assert!(
            overrides
                .observe("Kitchen", "Lights", SwitchContext::Manual, at(12, 0))
                .is_some()
        );
    }

    #[test]
    fn should_keep_record_live_when_context_changes() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(5));
        overrides.observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0));
        overrides.observe("Kitchen", "Lights", SwitchContext::Motion, at(10, 10));
        assert!(overrides.is_live("Kitchen", "Lights", at(10, 11)));
        assert_eq!(overrides.records()[0].expires_at, at(15, 0));
    }

    #[test]
    fn should_not_extend_record_when_manual_again_after_context_change() {
        let mut overrides = ManualOverrides::new(TimeDelta::hours(1));
        overrides.observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 0));
        overrides.observe("Kitchen", "Lights", SwitchContext::Network, at(10, 10));
        assert!(
            overrides
                .observe("Kitchen", "Lights", SwitchContext::Manual, at(10, 20))
                .is_none()
        );
        assert_eq!(overrides.records()[0].expires_at, at(11, 0));
    }

    #[test]
    fn should_default_to_five_hour_grace() {
        let mut overrides = ManualOverrides::default();
        let record = overrides
            .observe("Hall", "Lamp", SwitchContext::Manual, at(8, 0))
            .cloned()
            .unwrap();
        assert_eq!(record.expires_at, at(13, 0));
    }
}
