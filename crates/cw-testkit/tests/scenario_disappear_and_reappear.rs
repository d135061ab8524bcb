//! Scenario: a channel drops out of its device's listing and comes back.
//!
//! # Invariants under test
//! - With disappearances marked, the missing channel is triggered under the
//!   incident key it had while reported
//! - Its return resolves that same incident key

use std::sync::Arc;

use cw_alert::{ActionKind, AlertDispatcher};
use cw_reconcile::{DeviceFamily, DisappearancePolicy, FirstSightPolicy, ReconcilePolicy, StatusValue};
use cw_runtime::{ReconciliationRun, RunStatus};
use cw_testkit::{MemoryStateStore, OutcomeBuilder, RecordingAlertingService, ScriptedSource};

const FAM: DeviceFamily = DeviceFamily::ElementalConductor;
const DEV: &str = "10.3.0.4";

#[tokio::test]
async fn missing_channel_triggers_and_resolves_one_incident() {
    let source = Arc::new(ScriptedSource::new(FAM));
    let store = Arc::new(MemoryStateStore::new());
    let alerts = Arc::new(RecordingAlertingService::new());
    let run = ReconciliationRun::new(
        source.clone(),
        store.clone(),
        AlertDispatcher::new(alerts.clone()),
        ReconcilePolicy {
            first_sight: FirstSightPolicy::Baseline,
            on_disappear: DisappearancePolicy::MarkUnreachable,
        },
    );

    source.push(
        OutcomeBuilder::new()
            .device(DEV, &[("1", "News", StatusValue::Running)])
            .build(),
    );
    let first = run.execute().await;
    assert_eq!(first.status, RunStatus::Ok);
    assert!(alerts.calls().is_empty());

    source.push(OutcomeBuilder::new().device(DEV, &[]).build());
    let gone = run.execute().await;
    assert_eq!(gone.events, 1);
    assert_eq!(store.current(FAM).get(DEV, "1"), Some(StatusValue::Unreachable));

    source.push(
        OutcomeBuilder::new()
            .device(DEV, &[("1", "News", StatusValue::Running)])
            .build(),
    );
    let back = run.execute().await;
    assert_eq!(back.events, 1);

    let calls = alerts.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].action, ActionKind::Trigger);
    assert_eq!(calls[0].incident_key, "News state change");
    assert_eq!(calls[0].description, format!("Channel News is currently unreachable on {DEV}"));
    assert_eq!(calls[1].action, ActionKind::Resolve);
    assert_eq!(calls[1].incident_key, calls[0].incident_key);
}
