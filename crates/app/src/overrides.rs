//! Manual override table shared between the reconciler, which writes it,
//! and the console, which reports it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use switchyard_domain::manual_override::{ManualOverrideRecord, ManualOverrides};

#[derive(Debug, Default)]
pub struct OverrideTable {
    inner: Mutex<ManualOverrides>,
}

impl OverrideTable {
    #[must_use]
    pub fn new(overrides: ManualOverrides) -> Self {
        Self {
            inner: Mutex::new(overrides),
        }
    }

    /// Exclusive access for one reconciliation pass. Never held across an
    /// `.await`.
    pub fn lock(&self) -> MutexGuard<'_, ManualOverrides> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Active records ordered by zone and control.
    #[must_use]
    pub fn records(&self) -> Vec<ManualOverrideRecord> {
        self.lock().records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use switchyard_domain::control::SwitchContext;
    use switchyard_domain::time;

    #[test]
    fn should_expose_records_armed_through_the_lock() {
        let table = OverrideTable::new(ManualOverrides::new(TimeDelta::hours(1)));
        table
            .lock()
            .observe("Kitchen", "Lights", SwitchContext::Manual, time::now());
        let records = table.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.control, "Lights");
    }
}
