//! Scenario: first observation baselines, later changes emit events.
//!
//! # Invariants under test
//! - An empty previous snapshot never produces events by default
//! - The current observation always becomes the next snapshot
//! - A changed status yields exactly one event carrying both statuses

use cw_reconcile::*;

fn live_channel(id: &str, status: StatusValue) -> ChannelStatus {
    ChannelStatus::new("10.0.0.1", id, format!("Channel {id}"), status)
}

#[test]
fn scenario_first_run_is_baseline_only() {
    let current: ObservedChannels = [live_channel("5", StatusValue::Error)].into_iter().collect();

    let out = diff(&Snapshot::empty(), &current, &ReconcilePolicy::default());

    assert!(out.is_quiet());
    assert_eq!(out.next.get("10.0.0.1", "5"), Some(StatusValue::Error));
    assert_eq!(out.next.len(), 1);
}

#[test]
fn scenario_idle_to_running_emits_one_event() {
    let mut previous = Snapshot::empty();
    previous.insert("10.0.0.1", "5", StatusValue::Idle);
    let current: ObservedChannels = [live_channel("5", StatusValue::Running)]
        .into_iter()
        .collect();

    let out = diff(&previous, &current, &ReconcilePolicy::default());

    assert_eq!(out.events.len(), 1);
    let ev = &out.events[0];
    assert_eq!(ev.device_address, "10.0.0.1");
    assert_eq!(ev.channel_id, "5");
    assert_eq!(ev.previous, Some(StatusValue::Idle));
    assert_eq!(ev.current, StatusValue::Running);
    assert_eq!(ev.kind(), TransitionKind::BecameHealthy);
    assert_eq!(ev.channel.name, "Channel 5");
    assert_eq!(out.next.get("10.0.0.1", "5"), Some(StatusValue::Running));
}

#[test]
fn scenario_running_to_error_is_unhealthy_transition() {
    let mut previous = Snapshot::empty();
    previous.insert("10.0.0.1", "5", StatusValue::Running);
    let current: ObservedChannels = [live_channel("5", StatusValue::Error)].into_iter().collect();

    let out = diff(&previous, &current, &ReconcilePolicy::default());

    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].kind(), TransitionKind::BecameUnhealthy);
}

#[test]
fn scenario_same_channel_id_on_two_devices_is_two_channels() {
    let mut previous = Snapshot::empty();
    previous.insert("10.0.0.1", "1", StatusValue::Running);
    previous.insert("10.0.0.2", "1", StatusValue::Running);
    let current: ObservedChannels = [
        ChannelStatus::new("10.0.0.1", "1", "A", StatusValue::Running),
        ChannelStatus::new("10.0.0.2", "1", "B", StatusValue::Error),
    ]
    .into_iter()
    .collect();

    let out = diff(&previous, &current, &ReconcilePolicy::default());

    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].device_address, "10.0.0.2");
    assert_eq!(out.next.len(), 2);
}

#[test]
fn scenario_healthy_variants_are_classified_healthy() {
    assert!(StatusValue::Running.is_healthy());
    assert!(StatusValue::Started.is_healthy());
    for s in ["idle", "pending", "error", "unreachable", "stopping", "suspended", "complete"] {
        assert_eq!(StatusValue::parse(s).health(), Health::Unhealthy, "{s}");
    }
    assert_eq!(StatusValue::parse("RUNNING"), StatusValue::Running);
    assert_eq!(StatusValue::parse("rebooting"), StatusValue::Unknown);
}
