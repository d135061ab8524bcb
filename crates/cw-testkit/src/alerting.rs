use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;
use cw_alert::{Ack, ActionKind, AlertingService, DispatchError, ResolveIncident, TriggerIncident};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub action: ActionKind,
    pub incident_key: String,
    pub description: String,
}

/// Records every call; keys listed via [`fail_key`](Self::fail_key) are
/// refused with a transport error (but still recorded as attempted).
#[derive(Debug, Default)]
pub struct RecordingAlertingService {
    calls: Mutex<Vec<RecordedCall>>,
    failing: Mutex<BTreeSet<String>>,
}

impl RecordingAlertingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_key(&self, incident_key: &str) {
        self.failing.lock().unwrap().insert(incident_key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, action: ActionKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.action == action)
            .count()
    }

    fn record(&self, action: ActionKind, key: &str, description: &str) -> Result<Ack, DispatchError> {
        self.calls.lock().unwrap().push(RecordedCall {
            action,
            incident_key: key.to_string(),
            description: description.to_string(),
        });
        if self.failing.lock().unwrap().contains(key) {
            return Err(DispatchError::Transport(format!("simulated outage for '{key}'")));
        }
        Ok(Ack {
            status: "success".to_string(),
            message: "Event processed".to_string(),
            incident_key: Some(key.to_string()),
        })
    }
}

#[async_trait]
impl AlertingService for RecordingAlertingService {
    async fn trigger_incident(&self, i: &TriggerIncident) -> Result<Ack, DispatchError> {
        self.record(ActionKind::Trigger, &i.incident_key, &i.description)
    }

    async fn resolve_incident(&self, i: &ResolveIncident) -> Result<Ack, DispatchError> {
        self.record(ActionKind::Resolve, &i.incident_key, &i.description)
    }
}
