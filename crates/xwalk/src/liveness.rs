//! Heartbeat tracking and ALIVE / STALE / UNKNOWN classification.
//!
//! Staleness is judged against the controller's receipt time, never the
//! sender's `sent_at`, so a station with a drifting clock is still judged
//! fairly.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

use xwalkproto::{ComponentReport, ComponentRole, ComponentStatus, Heartbeat};

/// What a heartbeat changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// First heartbeat ever seen from this component.
    New,
    /// Component was alive already.
    Refreshed,
    /// Component had been reported stale and is back.
    Recovered,
}

#[derive(Debug, Clone)]
struct ComponentRecord {
    role: ComponentRole,
    host: Option<String>,
    last_heartbeat: Option<DateTime<Utc>>,
    flagged_stale: bool,
}

#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: TimeDelta,
    components: BTreeMap<String, ComponentRecord>,
}

impl LivenessMonitor {
    pub fn new(timeout: TimeDelta) -> Self {
        Self {
            timeout,
            components: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    /// Make a component known before its first heartbeat; it reports
    /// UNKNOWN until then. Registering a known component is a no-op.
    pub fn register(&mut self, component: &str, role: Option<ComponentRole>) {
        self.components
            .entry(component.to_string())
            .or_insert_with(|| ComponentRecord {
                role: role.unwrap_or_else(|| ComponentRole::infer(component)),
                host: None,
                last_heartbeat: None,
                flagged_stale: false,
            });
    }

    /// Record a heartbeat received at `now`.
    pub fn heartbeat(&mut self, beat: &Heartbeat, now: DateTime<Utc>) -> HeartbeatOutcome {
        let record = self
            .components
            .entry(beat.component.clone())
            .or_insert_with(|| ComponentRecord {
                role: beat.role(),
                host: None,
                last_heartbeat: None,
                flagged_stale: false,
            });

        let outcome = if record.last_heartbeat.is_none() {
            HeartbeatOutcome::New
        } else if record.flagged_stale || now - record.last_heartbeat.unwrap_or(now) > self.timeout {
            HeartbeatOutcome::Recovered
        } else {
            HeartbeatOutcome::Refreshed
        };

        if beat.role.is_some() {
            record.role = beat.role();
        }
        if beat.host.is_some() {
            record.host = beat.host.clone();
        }
        // receipt time only moves forward
        record.last_heartbeat = Some(record.last_heartbeat.map_or(now, |last| last.max(now)));
        record.flagged_stale = false;
        outcome
    }

    fn classify(&self, record: &ComponentRecord, now: DateTime<Utc>) -> ComponentStatus {
        match record.last_heartbeat {
            None => ComponentStatus::Unknown,
            Some(last) if now - last > self.timeout => ComponentStatus::Stale,
            Some(_) => ComponentStatus::Alive,
        }
    }

    /// Status of one component. Ids never seen or registered are UNKNOWN.
    pub fn status_of(&self, component: &str, now: DateTime<Utc>) -> ComponentStatus {
        self.components
            .get(component)
            .map_or(ComponentStatus::Unknown, |record| self.classify(record, now))
    }

    pub fn last_heartbeat(&self, component: &str) -> Option<DateTime<Utc>> {
        self.components.get(component)?.last_heartbeat
    }

    /// Status of every known component, in id order.
    pub fn snapshot(&self, now: DateTime<Utc>) -> BTreeMap<String, ComponentStatus> {
        self.components
            .iter()
            .map(|(id, record)| (id.clone(), self.classify(record, now)))
            .collect()
    }

    /// Full per-component reports for the status API.
    pub fn reports(&self, now: DateTime<Utc>) -> BTreeMap<String, ComponentReport> {
        self.components
            .iter()
            .map(|(id, record)| {
                (
                    id.clone(),
                    ComponentReport {
                        status: self.classify(record, now),
                        role: record.role,
                        host: record.host.clone(),
                        last_heartbeat: record.last_heartbeat,
                    },
                )
            })
            .collect()
    }

    /// Components that went stale since the previous sweep. Each stale
    /// transition is reported once.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let timeout = self.timeout;
        self.components
            .iter_mut()
            .filter_map(|(id, record)| {
                let stale = record
                    .last_heartbeat
                    .is_some_and(|last| now - last > timeout);
                (stale && !record.flagged_stale).then(|| {
                    record.flagged_stale = true;
                    id.clone()
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(millis: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap() + TimeDelta::milliseconds(millis)
    }

    fn beat(component: &str) -> Heartbeat {
        Heartbeat::new(component).with_host("crosswalk-1")
    }

    fn monitor() -> LivenessMonitor {
        LivenessMonitor::new(TimeDelta::seconds(5))
    }

    #[test]
    fn alive_then_stale_at_timeout_boundary() {
        let mut monitor = monitor();
        assert_eq!(monitor.heartbeat(&beat("timer"), t(0)), HeartbeatOutcome::New);

        assert_eq!(monitor.status_of("timer", t(5_000)), ComponentStatus::Alive);
        assert_eq!(monitor.status_of("timer", t(5_001)), ComponentStatus::Stale);
        assert_eq!(monitor.status_of("matrix_driver", t(0)), ComponentStatus::Unknown);
    }

    #[test]
    fn heartbeat_stream_keeps_component_alive() {
        let mut monitor = monitor();
        for i in 0..10 {
            monitor.heartbeat(&beat("button_switch"), t(i * 1_000));
        }
        assert_eq!(
            monitor.status_of("button_switch", t(9_500)),
            ComponentStatus::Alive
        );
    }

    #[test]
    fn registered_component_is_unknown_until_first_beat() {
        let mut monitor = monitor();
        monitor.register("audio_player", None);
        assert_eq!(monitor.status_of("audio_player", t(0)), ComponentStatus::Unknown);
        assert_eq!(
            monitor.reports(t(0))["audio_player"].role,
            ComponentRole::AudioPlayer
        );
        assert_eq!(monitor.heartbeat(&beat("audio_player"), t(10)), HeartbeatOutcome::New);
    }

    #[test]
    fn sweep_reports_each_transition_once() {
        let mut monitor = monitor();
        monitor.heartbeat(&beat("timer"), t(0));
        monitor.heartbeat(&beat("scheduler"), t(3_000));

        assert!(monitor.sweep(t(4_000)).is_empty());
        assert_eq!(monitor.sweep(t(6_000)), vec!["timer".to_string()]);
        assert!(monitor.sweep(t(7_000)).is_empty());
        assert_eq!(monitor.sweep(t(9_000)), vec!["scheduler".to_string()]);

        assert_eq!(
            monitor.heartbeat(&beat("timer"), t(9_500)),
            HeartbeatOutcome::Recovered
        );
        assert_eq!(monitor.status_of("timer", t(9_500)), ComponentStatus::Alive);
    }

    #[test]
    fn recovery_without_sweep_is_still_reported() {
        let mut monitor = monitor();
        monitor.heartbeat(&beat("timer"), t(0));
        assert_eq!(
            monitor.heartbeat(&beat("timer"), t(20_000)),
            HeartbeatOutcome::Recovered
        );
    }

    #[test]
    fn snapshot_and_host() {
        let mut monitor = monitor();
        monitor.heartbeat(&beat("timer"), t(0));
        monitor.heartbeat(&beat("matrix_driver"), t(4_000));

        let snapshot = monitor.snapshot(t(6_000));
        assert_eq!(snapshot["timer"], ComponentStatus::Stale);
        assert_eq!(snapshot["matrix_driver"], ComponentStatus::Alive);

        let reports = monitor.reports(t(6_000));
        assert_eq!(reports["timer"].host.as_deref(), Some("crosswalk-1"));
        assert_eq!(reports["timer"].last_heartbeat, Some(t(0)));
        assert_eq!(monitor.len(), 2);
    }
}
