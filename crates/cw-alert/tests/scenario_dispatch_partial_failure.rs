//! Scenario: one failing delivery among several.
//!
//! # Invariants under test
//! - Every event is attempted, in order, even after a failure
//! - The failed one is reported as not accepted with the error text
//! - Healthy transitions resolve, unhealthy ones trigger

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cw_alert::{
    Ack, ActionKind, AlertDispatcher, AlertingService, DispatchError, ResolveIncident,
    TriggerIncident,
};
use cw_reconcile::{diff, ChannelStatus, DeviceFamily, ObservedChannels, ReconcilePolicy, Snapshot, StatusValue};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(ActionKind, String)>>,
    fail_key: Option<String>,
}

impl Recorder {
    fn record(&self, kind: ActionKind, key: &str) -> Result<Ack, DispatchError> {
        self.calls.lock().unwrap().push((kind, key.to_string()));
        if self.fail_key.as_deref() == Some(key) {
            return Err(DispatchError::Transport("connection reset".to_string()));
        }
        Ok(Ack {
            status: "success".to_string(),
            message: "Event processed".to_string(),
            incident_key: Some(key.to_string()),
        })
    }
}

#[async_trait]
impl AlertingService for Recorder {
    async fn trigger_incident(&self, i: &TriggerIncident) -> Result<Ack, DispatchError> {
        self.record(ActionKind::Trigger, &i.incident_key)
    }

    async fn resolve_incident(&self, i: &ResolveIncident) -> Result<Ack, DispatchError> {
        self.record(ActionKind::Resolve, &i.incident_key)
    }
}

#[tokio::test]
async fn scenario_middle_failure_does_not_stop_dispatch() {
    let mut previous = Snapshot::empty();
    previous.insert("10.0.0.1", "1", StatusValue::Running);
    previous.insert("10.0.0.1", "2", StatusValue::Running);
    previous.insert("10.0.0.1", "3", StatusValue::Idle);
    let current: ObservedChannels = [
        ChannelStatus::new("10.0.0.1", "1", "A", StatusValue::Error),
        ChannelStatus::new("10.0.0.1", "2", "B", StatusValue::Error),
        ChannelStatus::new("10.0.0.1", "3", "C", StatusValue::Running),
    ]
    .into_iter()
    .collect();
    let out = diff(&previous, &current, &ReconcilePolicy::default());
    assert_eq!(out.events.len(), 3);

    let recorder = Arc::new(Recorder {
        fail_key: Some("B state change".to_string()),
        ..Recorder::default()
    });
    let dispatcher = AlertDispatcher::new(recorder.clone());

    let outcomes = dispatcher
        .dispatch(DeviceFamily::ElementalConductor, &out.events)
        .await;

    assert_eq!(
        *recorder.calls.lock().unwrap(),
        vec![
            (ActionKind::Trigger, "A state change".to_string()),
            (ActionKind::Trigger, "B state change".to_string()),
            (ActionKind::Resolve, "C state change".to_string()),
        ]
    );
    let accepted: Vec<bool> = outcomes.iter().map(|o| o.accepted).collect();
    assert_eq!(accepted, vec![true, false, true]);
    assert!(outcomes[1].message.contains("connection reset"));
    assert_eq!(outcomes[2].action, ActionKind::Resolve);
}
