use std::sync::Arc;

use cw_reconcile::{DeviceFamily, TransitionEvent};
use tracing::{info, warn};

use crate::{action_for, ActionKind, AlertAction, AlertingService};

/// Result of delivering one event's action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub incident_key: String,
    pub action: ActionKind,
    pub accepted: bool,
    pub message: String,
}

/// Sends one action per transition event, in event order.
#[derive(Clone)]
pub struct AlertDispatcher {
    service: Arc<dyn AlertingService>,
}

impl AlertDispatcher {
    pub fn new(service: Arc<dyn AlertingService>) -> Self {
        Self { service }
    }

    /// Every event is attempted; a failure for one never stops the rest.
    pub async fn dispatch(
        &self,
        family: DeviceFamily,
        events: &[TransitionEvent],
    ) -> Vec<DispatchOutcome> {
        let mut out = Vec::with_capacity(events.len());

        for ev in events {
            let action = action_for(family, ev);
            let result = match &action {
                AlertAction::Trigger(t) => self.service.trigger_incident(t).await,
                AlertAction::Resolve(r) => self.service.resolve_incident(r).await,
            };

            let outcome = match result {
                Ok(ack) => {
                    info!(
                        %family,
                        incident_key = action.incident_key(),
                        action = action.kind().as_str(),
                        ack = %ack.message,
                        "alert accepted"
                    );
                    DispatchOutcome {
                        incident_key: action.incident_key().to_string(),
                        action: action.kind(),
                        accepted: true,
                        message: ack.message,
                    }
                }
                Err(e) => {
                    warn!(
                        %family,
                        incident_key = action.incident_key(),
                        action = action.kind().as_str(),
                        error = %e,
                        "alert not accepted"
                    );
                    DispatchOutcome {
                        incident_key: action.incident_key().to_string(),
                        action: action.kind(),
                        accepted: false,
                        message: e.to_string(),
                    }
                }
            };
            out.push(outcome);
        }

        out
    }
}
