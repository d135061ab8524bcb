//! cw-alert
//!
//! Turns transition events into trigger/resolve calls on an alerting service.
//!
//! - Incident keys are derived from the channel only, so the same channel
//!   always lands on the same incident across cycles and restarts
//! - HEALTHY current status resolves, anything else triggers
//! - A failed delivery is reported and logged, never raised

mod action;
mod dispatcher;
mod error;
mod pagerduty;
mod service;

pub use action::{action_for, describe, incident_key, ActionKind, AlertAction, ResolveIncident, TriggerIncident};
pub use dispatcher::{AlertDispatcher, DispatchOutcome};
pub use error::DispatchError;
pub use pagerduty::{PagerDutyClient, PagerDutyConfig, DEFAULT_EVENTS_BASE_URL};
pub use service::{Ack, AlertingService};
