use std::collections::BTreeMap;

use cw_reconcile::{ChannelStatus, DeviceFamily, NamingScheme, TransitionEvent};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Trigger,
    Resolve,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Trigger => "trigger",
            ActionKind::Resolve => "resolve",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerIncident {
    pub incident_key: String,
    pub description: String,
    pub client: String,
    pub client_url: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveIncident {
    pub incident_key: String,
    pub description: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlertAction {
    Trigger(TriggerIncident),
    Resolve(ResolveIncident),
}

impl AlertAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            AlertAction::Trigger(_) => ActionKind::Trigger,
            AlertAction::Resolve(_) => ActionKind::Resolve,
        }
    }

    pub fn incident_key(&self) -> &str {
        match self {
            AlertAction::Trigger(t) => &t.incident_key,
            AlertAction::Resolve(r) => &r.incident_key,
        }
    }
}

/// De-duplication key for a channel's incident. Depends only on the channel's
/// identity fields, never on its status.
pub fn incident_key(family: DeviceFamily, ch: &ChannelStatus) -> String {
    match (family.naming(), ch.kind.as_deref()) {
        (NamingScheme::ChannelName, _) => format!("{} state change", ch.name),
        (NamingScheme::OutputOnDevice, Some(kind)) => {
            format!("{}({}) state change on {}", ch.name, kind, ch.device_address)
        }
        (NamingScheme::OutputOnDevice, None) => {
            format!("{} state change on {}", ch.name, ch.device_address)
        }
    }
}

/// Human-readable line for the incident, naming the current status.
pub fn describe(family: DeviceFamily, ch: &ChannelStatus) -> String {
    match (family.naming(), ch.kind.as_deref()) {
        (NamingScheme::ChannelName, _) => {
            let location = ch.node.as_deref().unwrap_or(&ch.device_address);
            format!("Channel {} is currently {} on {}", ch.name, ch.status, location)
        }
        (NamingScheme::OutputOnDevice, Some(kind)) => format!(
            "{}({}) is currently {} on {}",
            ch.name, kind, ch.status, ch.device_address
        ),
        (NamingScheme::OutputOnDevice, None) => format!(
            "{} is currently {} on {}",
            ch.name, ch.status, ch.device_address
        ),
    }
}

/// HEALTHY current status => resolve; everything else => trigger.
pub fn action_for(family: DeviceFamily, event: &TransitionEvent) -> AlertAction {
    let ch = &event.channel;
    let incident_key = incident_key(family, ch);
    let description = describe(family, ch);
    let details = ch.details.clone();

    if event.current.is_healthy() {
        AlertAction::Resolve(ResolveIncident {
            incident_key,
            description,
            details,
        })
    } else {
        AlertAction::Trigger(TriggerIncident {
            incident_key,
            description,
            client: ch.device_address.clone(),
            client_url: family.management_url(&ch.device_address),
            details,
        })
    }
}
