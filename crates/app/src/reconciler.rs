//! Reconciliation dispatcher: drives every switch toward its desired state
//! and delivers scheduled program events.
//!
//! Each tick works on one immutable view: the current rule set, the current
//! sun times and a registry snapshot. Commands to different devices run
//! concurrently; a failing device is logged and retried implicitly on the
//! next tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::FixedOffset;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use switchyard_domain::control::ControlCommand;
use switchyard_domain::device::Device;
use switchyard_domain::evaluator::{Evaluation, Target};
use switchyard_domain::program::{FiredEvents, ProgramLibrary};
use switchyard_domain::rule::RuleSet;
use switchyard_domain::time::{ClockTime, Timestamp};

use crate::overrides::OverrideTable;
use crate::ports::{Clock, DeviceClient};
use crate::registry::DeviceRegistry;
use crate::sun::SunTimeCache;

/// Outcome of one reconciliation tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Devices that needed at least one correction.
    pub dispatched: usize,
    /// Individual control commands sent.
    pub commands: usize,
    pub failed: usize,
}

/// Commands for one device and the scheduled events they deliver.
#[derive(Debug)]
struct Plan {
    device: Device,
    commands: Vec<ControlCommand>,
    events: Vec<(String, ClockTime)>,
}

/// Periodic reconciler.
pub struct Reconciler<C, K> {
    client: Arc<C>,
    clock: K,
    registry: Arc<DeviceRegistry>,
    sun: Arc<SunTimeCache>,
    rules: watch::Receiver<Arc<RuleSet>>,
    overrides: Arc<OverrideTable>,
    programs: ProgramLibrary,
    fired: Mutex<FiredEvents>,
    utc_offset: FixedOffset,
    interval: Duration,
}

impl<C, K> Reconciler<C, K>
where
    C: DeviceClient + 'static,
    K: Clock + 'static,
{
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        client: Arc<C>,
        clock: K,
        registry: Arc<DeviceRegistry>,
        sun: Arc<SunTimeCache>,
        rules: watch::Receiver<Arc<RuleSet>>,
        overrides: Arc<OverrideTable>,
        programs: ProgramLibrary,
        utc_offset: FixedOffset,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            clock,
            registry,
            sun,
            rules,
            overrides,
            programs,
            fired: Mutex::new(FiredEvents::new()),
            utc_offset,
            interval,
        }
    }

    /// Spawn the loop on the runtime.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Evaluate every control once and dispatch the corrections.
    pub async fn tick(&self) -> ReconcileReport {
        let now = self.clock.now();
        let plans = self.plan(now);

        let mut report = ReconcileReport::default();
        let mut tasks = JoinSet::new();
        for plan in plans {
            report.dispatched += 1;
            report.commands += plan.commands.len();
            tracing::info!(
                device = %plan.device.name,
                commands = ?plan.commands,
                "dispatching corrections"
            );
            let client = Arc::clone(&self.client);
            tasks.spawn(async move {
                let result = client.send_controls(&plan.device.endpoint, &plan.commands).await;
                (plan.device.name, plan.events, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, events, Ok(status))) => {
                    self.mark_fired(&name, &events, now);
                    if self.registry.upsert(&name, status, now).is_none() {
                        tracing::debug!(device = %name, "dropping response for evicted device");
                    }
                }
                Ok((name, _, Err(err))) => {
                    report.failed += 1;
                    tracing::warn!(device = %name, %err, "control command failed");
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(%err, "control task aborted");
                }
            }
        }
        report
    }

    fn fired_events(&self) -> MutexGuard<'_, FiredEvents> {
        self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_fired(&self, device: &str, events: &[(String, ClockTime)], now: Timestamp) {
        let mut fired = self.fired_events();
        for (control, at) in events {
            tracing::info!(device = %device, %control, %at, "scheduled event delivered");
            fired.record(device, control, *at, now);
        }
    }

    /// Refresh the override table and compute the commands per device.
    fn plan(&self, now: Timestamp) -> Vec<Plan> {
        let rules = Arc::clone(&self.rules.borrow());
        let sun = self.sun.current();
        let devices = self.registry.snapshot_all();

        let mut overrides = self.overrides.lock();
        for record in overrides.expire(now) {
            tracing::info!(zone = %record.key.zone, control = %record.key.control, "manual override expired");
        }
        for status in devices.iter().filter_map(|d| d.status.as_ref()) {
            for switch in status.switches() {
                if let Some(record) = overrides.observe(&status.zone, &switch.name, switch.context, now)
                {
                    tracing::info!(
                        zone = %status.zone,
                        control = %switch.name,
                        expires_at = %record.expires_at,
                        "manual override armed"
                    );
                }
            }
        }

        let mut fired = self.fired_events();
        fired.forget_stale(now);

        let evaluation = Evaluation {
            now,
            clock: ClockTime::at(now, self.utc_offset),
            rules: &rules,
            sun: &sun,
            overrides: &overrides,
            devices: &devices,
            programs: &self.programs,
            fired: &fired,
        };
        devices
            .iter()
            .filter_map(|device| plan_device(&evaluation, device))
            .collect()
    }
}

/// Commands needed to bring a device's controls to their desired state.
fn plan_device(evaluation: &Evaluation<'_>, device: &Device) -> Option<Plan> {
    let status = device.status.as_ref()?;
    let mut commands = Vec::new();
    let mut events = Vec::new();
    for control in &status.controls {
        let Some(name) = control.name() else {
            continue;
        };
        let switch = control.as_switch();
        let decision = evaluation.evaluate(&Target {
            device: &device.name,
            zone: &status.zone,
            control: name,
            kind: control.kind(),
            state: switch.map(|s| s.state),
        });
        if let Some(event) = decision.event {
            events.push((name.to_string(), event.at));
            commands.push(event.command);
            continue;
        }
        let Some(switch) = switch else {
            continue;
        };
        let mut command = ControlCommand::new(name);
        if let Some(state) = decision.state.correction(switch.state) {
            command = command.with_state(state);
        }
        // only switches wired to a motion sensor report an interval
        if let (Some(wanted), Some(current)) = (decision.motion_interval, switch.motion_interval) {
            if wanted != current {
                command = command.with_motion_interval(wanted);
            }
        }
        if !command.is_empty() {
            commands.push(command);
        }
    }
    (!commands.is_empty()).then(|| Plan {
        device: device.clone(),
        commands,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubClient, switch_status};
    use chrono::{TimeDelta, TimeZone, Utc};
    use switchyard_domain::control::{Control, ProgramControl, SwitchContext};
    use switchyard_domain::device::Endpoint;
    use switchyard_domain::manual_override::ManualOverrides;
    use switchyard_domain::rule::{MotionRule, PairedSwitchRule, TimerRule};
    use switchyard_domain::sun::SunTimes;
    use switchyard_domain::time::Timestamp;

    struct FixedClock(Mutex<Timestamp>);

    impl FixedClock {
        fn at(hour: u32, minute: u32) -> Self {
            Self(Mutex::new(ts(hour, minute)))
        }
    }

    impl Clock for Arc<FixedClock> {
        fn now(&self) -> Timestamp {
            *self.0.lock().unwrap()
        }
    }

    fn ts(hour: u32, minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 20, hour, minute, 0).unwrap()
    }

    fn kitchen_rule() -> TimerRule {
        TimerRule {
            zone: "Kitchen".to_string(),
            control: "Lights".to_string(),
            on: "sunset".parse().unwrap(),
            off: "0100".parse().unwrap(),
            override_anchor: None,
            motion: None,
            enabled: true,
        }
    }

    fn library() -> ProgramLibrary {
        serde_json::from_value(serde_json::json!({
            "rgb": {"warm": {"colours": ["0xFF8000"]}},
            "argb": {"warm": {"pattern": "fade", "colour": "0xFF8000"}}
        }))
        .unwrap()
    }

    struct Harness {
        registry: Arc<DeviceRegistry>,
        client: Arc<StubClient>,
        clock: Arc<FixedClock>,
        rules_tx: watch::Sender<Arc<RuleSet>>,
        overrides: Arc<OverrideTable>,
        reconciler: Reconciler<StubClient, Arc<FixedClock>>,
    }

    fn harness(rules: RuleSet, devices: Vec<(&str, &str, bool, SwitchContext)>) -> Harness {
        let registry = Arc::new(DeviceRegistry::new());
        let mut statuses = Vec::new();
        for (index, (zone, control, state, context)) in devices.into_iter().enumerate() {
            let name = format!("DEV-{index}");
            let host = format!("10.0.0.{index}");
            let status = switch_status(&name, zone, control, state, context);
            registry.upsert_address(&name, Endpoint::new(host.clone(), 80), ts(0, 0));
            registry.upsert(&name, status.clone(), ts(0, 0));
            statuses.push((host, status));
        }
        let client = Arc::new(StubClient::with(
            statuses.iter().map(|(h, s)| (h.as_str(), s.clone())).collect(),
        ));
        let sun = Arc::new(SunTimeCache::new(SunTimes::from_actual(
            ClockTime::from_hhmm(1930).unwrap(),
            ClockTime::from_hhmm(630).unwrap(),
            1800,
            None,
        )));
        let clock = Arc::new(FixedClock::at(12, 0));
        let (rules_tx, rules_rx) = watch::channel(Arc::new(rules));
        let overrides = Arc::new(OverrideTable::new(ManualOverrides::new(TimeDelta::hours(5))));
        let reconciler = Reconciler::new(
            Arc::clone(&client),
            Arc::clone(&clock),
            Arc::clone(&registry),
            sun,
            rules_rx,
            Arc::clone(&overrides),
            library(),
            FixedOffset::east_opt(0).unwrap(),
            Duration::from_secs(10),
        );
        Harness {
            registry,
            client,
            clock,
            rules_tx,
            overrides,
            reconciler,
        }
    }

    impl Harness {
        fn set_time(&self, hour: u32, minute: u32) {
            *self.clock.0.lock().unwrap() = ts(hour, minute);
        }

        fn reported(&self, device: &str) -> bool {
            let device = self.registry.get(device).unwrap();
            device.controls()[0].as_switch().unwrap().state
        }
    }

    #[tokio::test]
    async fn should_turn_on_after_shifted_sunset_and_off_after_window() {
        let rules = RuleSet {
            timers: vec![kitchen_rule()],
            ..RuleSet::default()
        };
        let harness = harness(rules, vec![("Kitchen", "Lights", false, SwitchContext::Init)]);

        harness.set_time(20, 0);
        let report = harness.reconciler.tick().await;
        assert_eq!(report.commands, 1);
        assert!(harness.reported("DEV-0"));

        harness.set_time(1, 30);
        harness.reconciler.tick().await;
        assert!(!harness.reported("DEV-0"));
    }

    #[tokio::test]
    async fn should_not_send_commands_when_already_in_desired_state() {
        let rules = RuleSet {
            timers: vec![kitchen_rule()],
            ..RuleSet::default()
        };
        let harness = harness(rules, vec![("Kitchen", "Lights", false, SwitchContext::Init)]);

        harness.set_time(12, 0);
        let report = harness.reconciler.tick().await;
        assert_eq!(report, ReconcileReport::default());
        assert!(harness.client.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_leave_manually_switched_control_alone_during_grace() {
        let rules = RuleSet {
            timers: vec![kitchen_rule()],
            ..RuleSet::default()
        };
        let harness = harness(rules, vec![("Kitchen", "Lights", true, SwitchContext::Manual)]);

        harness.set_time(12, 0);
        let report = harness.reconciler.tick().await;
        assert_eq!(report.commands, 0);
        assert_eq!(harness.overrides.records().len(), 1);

        harness.set_time(17, 0);
        let report = harness.reconciler.tick().await;
        assert_eq!(report.commands, 1);
        assert!(!harness.reported("DEV-0"));
        assert!(harness.overrides.records().is_empty());
    }

    #[tokio::test]
    async fn should_mirror_paired_switch() {
        let rules = RuleSet {
            paired: vec![PairedSwitchRule {
                a_zone: "Hall".to_string(),
                a_control: "Main".to_string(),
                b_zone: "Landing".to_string(),
                b_control: "Lamp".to_string(),
            }],
            ..RuleSet::default()
        };
        let harness = harness(
            rules,
            vec![
                ("Hall", "Main", true, SwitchContext::Manual),
                ("Landing", "Lamp", false, SwitchContext::Init),
            ],
        );

        harness.reconciler.tick().await;

        assert!(harness.reported("DEV-1"));
        let sent = harness.client.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "10.0.0.1");
    }

    #[tokio::test]
    async fn should_pick_up_new_rules_between_ticks() {
        let harness = harness(
            RuleSet::default(),
            vec![("Kitchen", "Lights", false, SwitchContext::Init)],
        );
        harness.set_time(20, 0);
        assert_eq!(harness.reconciler.tick().await.commands, 0);

        harness
            .rules_tx
            .send(Arc::new(RuleSet {
                timers: vec![kitchen_rule()],
                ..RuleSet::default()
            }))
            .unwrap();
        assert_eq!(harness.reconciler.tick().await.commands, 1);
    }

    #[tokio::test]
    async fn should_send_motion_interval_to_motion_capable_switch() {
        let mut rule = kitchen_rule();
        rule.motion = Some(MotionRule {
            on: "22:00".parse().unwrap(),
            off: "06:00".parse().unwrap(),
            interval: 60,
        });
        let harness = harness(
            RuleSet {
                timers: vec![rule],
                ..RuleSet::default()
            },
            vec![("Kitchen", "Lights", true, SwitchContext::Init)],
        );
        {
            let mut statuses = harness.client.statuses.lock().unwrap();
            let status = statuses.get_mut("10.0.0.0").unwrap();
            if let Control::Switch(switch) = &mut status.controls[0] {
                switch.motion_interval = Some(0);
            }
            harness.registry.upsert("DEV-0", status.clone(), ts(0, 0));
        }

        harness.set_time(23, 0);
        harness.reconciler.tick().await;

        let sent = harness.client.sent.lock().unwrap();
        assert_eq!(sent[0].1, vec![ControlCommand::new("Lights").with_motion_interval(60)]);
    }

    #[tokio::test]
    async fn should_count_failed_dispatches_without_evicting() {
        let rules = RuleSet {
            timers: vec![kitchen_rule()],
            ..RuleSet::default()
        };
        let harness = harness(rules, vec![("Kitchen", "Lights", false, SwitchContext::Init)]);
        harness.client.statuses.lock().unwrap().clear();

        harness.set_time(20, 0);
        let report = harness.reconciler.tick().await;

        assert_eq!(report.failed, 1);
        assert!(harness.registry.get("DEV-0").is_some());
    }

    #[tokio::test]
    async fn should_keep_grace_period_when_context_changes() {
        let rules = RuleSet {
            timers: vec![kitchen_rule()],
            ..RuleSet::default()
        };
        let harness = harness(rules, vec![("Kitchen", "Lights", true, SwitchContext::Manual)]);

        harness.set_time(12, 0);
        harness.reconciler.tick().await;

        // a motion pulse ten minutes later must not cancel the grace period
        let status = switch_status("DEV-0", "Kitchen", "Lights", true, SwitchContext::Motion);
        harness.registry.upsert("DEV-0", status, ts(12, 10));
        harness.set_time(12, 11);
        assert_eq!(harness.reconciler.tick().await.commands, 0);
        assert_eq!(harness.overrides.records().len(), 1);
        assert!(harness.client.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_deliver_scheduled_program_once_per_event() {
        let rules: RuleSet = serde_json::from_value(serde_json::json!({
            "programs": [{
                "zone": "Hall",
                "control": "Strip",
                "events": [{"times": ["07:00", "21:00"], "params": {"program": "warm"}}]
            }]
        }))
        .unwrap();
        let harness = harness(rules, vec![("Hall", "Lamp", false, SwitchContext::Init)]);
        {
            let mut statuses = harness.client.statuses.lock().unwrap();
            let status = statuses.get_mut("10.0.0.0").unwrap();
            status.controls.push(Control::Argb(ProgramControl {
                name: "Strip".to_string(),
                program: None,
            }));
            harness.registry.upsert("DEV-0", status.clone(), ts(0, 0));
        }

        harness.set_time(21, 0);
        assert_eq!(harness.reconciler.tick().await.commands, 1);
        assert_eq!(harness.reconciler.tick().await.commands, 0);

        harness.set_time(21, 1);
        assert_eq!(harness.reconciler.tick().await.commands, 0);

        let sent = harness.client.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].1,
            vec![
                ControlCommand::new("Strip")
                    .with_program(serde_json::json!({"pattern": "fade", "colour": "0xFF8000"}))
            ]
        );
    }

    #[tokio::test]
    async fn should_retry_scheduled_event_after_failed_delivery() {
        let rules: RuleSet = serde_json::from_value(serde_json::json!({
            "programs": [{
                "zone": "Kitchen",
                "control": "Lights",
                "events": [{"time": "07:00", "params": {"state": 1}}]
            }]
        }))
        .unwrap();
        let harness = harness(rules, vec![("Kitchen", "Lights", false, SwitchContext::Init)]);
        let saved = harness.client.statuses.lock().unwrap().remove("10.0.0.0").unwrap();

        harness.set_time(7, 0);
        assert_eq!(harness.reconciler.tick().await.failed, 1);

        harness.client.statuses.lock().unwrap().insert("10.0.0.0".to_string(), saved);
        assert_eq!(harness.reconciler.tick().await.commands, 1);
        assert!(harness.reported("DEV-0"));
    }
}
