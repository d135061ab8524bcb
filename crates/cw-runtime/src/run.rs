use std::sync::{Arc, Mutex};

use chrono::Utc;
use cw_alert::AlertDispatcher;
use cw_reconcile::{
    diff, diff_with_last_seen, DeviceFamily, ObservedChannels, ReconcileOutcome, ReconcilePolicy,
    Snapshot,
};
use cw_source::ChannelStatusSource;
use cw_state::StateStore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{FamilyLocks, RunPhase, RunReport, RunStatus};

/// Drives fetch -> load -> diff -> dispatch -> save for one family.
///
/// Reusable: every [`execute`](Self::execute) is a fresh cycle with its own
/// run id. Runs sharing a [`FamilyLocks`] never overlap for the same family.
///
/// When a save fails, the snapshot that should have been written is kept in
/// memory and used as the baseline of the next cycle, so transitions already
/// alerted on are not detected (and alerted) a second time.
///
/// The last observation of every tracked channel is remembered so that a
/// channel reported missing is alerted under the same name it had while
/// present. That memory does not survive a restart.
pub struct ReconciliationRun {
    source: Arc<dyn ChannelStatusSource>,
    store: Arc<dyn StateStore>,
    dispatcher: AlertDispatcher,
    policy: ReconcilePolicy,
    locks: Arc<FamilyLocks>,
    unsaved: Mutex<Option<Snapshot>>,
    last_seen: Mutex<ObservedChannels>,
}

/// Phase bookkeeping for a single execution.
struct Cycle {
    run_id: Uuid,
    family: DeviceFamily,
    phase: RunPhase,
}

impl Cycle {
    fn enter(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal run transition {} -> {}",
            self.phase,
            next
        );
        debug!(run_id = %self.run_id, family = %self.family, from = %self.phase, to = %next, "run phase");
        self.phase = next;
    }
}

impl ReconciliationRun {
    pub fn new(
        source: Arc<dyn ChannelStatusSource>,
        store: Arc<dyn StateStore>,
        dispatcher: AlertDispatcher,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            source,
            store,
            dispatcher,
            policy,
            locks: Arc::new(FamilyLocks::new()),
            unsaved: Mutex::new(None),
            last_seen: Mutex::new(ObservedChannels::new()),
        }
    }

    /// Share locks with other runs (e.g. a second runner for the same family).
    pub fn with_locks(mut self, locks: Arc<FamilyLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn family(&self) -> DeviceFamily {
        self.source.family()
    }

    /// True while a snapshot is waiting to be written by a later cycle.
    pub fn has_unsaved_state(&self) -> bool {
        self.unsaved.lock().map(|u| u.is_some()).unwrap_or(false)
    }

    fn take_unsaved(&self) -> Option<Snapshot> {
        self.unsaved.lock().ok().and_then(|mut u| u.take())
    }

    fn keep_unsaved(&self, snapshot: Snapshot) {
        if let Ok(mut u) = self.unsaved.lock() {
            *u = Some(snapshot);
        }
    }

    fn diff_remembering(
        &self,
        comparable: &Snapshot,
        observed: &ObservedChannels,
    ) -> ReconcileOutcome {
        let Ok(mut seen) = self.last_seen.lock() else {
            return diff(comparable, observed, &self.policy);
        };
        let outcome = diff_with_last_seen(comparable, observed, &seen, &self.policy);
        for ch in observed.iter() {
            seen.insert(ch.clone());
        }
        outcome
    }

    /// Drop remembered channels the next baseline no longer tracks.
    fn forget_untracked(&self, next: &Snapshot) {
        if let Ok(mut seen) = self.last_seen.lock() {
            seen.retain(|ch| next.contains(&ch.device_address, &ch.channel_id));
        }
    }

    pub async fn execute(&self) -> RunReport {
        let family = self.source.family();
        let mut report = RunReport {
            run_id: Uuid::new_v4(),
            family,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            phase: RunPhase::Idle,
            failed_at: None,
            status: RunStatus::Ok,
            message: String::new(),
            devices_ok: 0,
            failed_devices: Vec::new(),
            channels_observed: 0,
            events: 0,
            outcomes: Vec::new(),
        };
        let mut cycle = Cycle {
            run_id: report.run_id,
            family,
            phase: RunPhase::Idle,
        };

        let _guard = self.locks.acquire(family).await;

        // ----------------------------------------------------------------
        // Fetch
        // ----------------------------------------------------------------
        cycle.enter(RunPhase::Fetching);
        let fetched = match self.source.fetch().await {
            Ok(f) => f,
            Err(e) => {
                return fail(report, &mut cycle, format!("{family}: fetch failed: {e}"));
            }
        };

        let mut observed = ObservedChannels::new();
        for (address, res) in fetched {
            match res {
                Ok(chans) => {
                    report.devices_ok += 1;
                    for ch in chans {
                        if ch.device_address != address {
                            warn!(%family, %address, reported = %ch.device_address, "channel reported under another address; ignored");
                            continue;
                        }
                        observed.insert(ch);
                    }
                }
                Err(e) => {
                    warn!(run_id = %report.run_id, %family, %address, error = %e, "device skipped this cycle");
                    report.failed_devices.push(address);
                }
            }
        }
        report.channels_observed = observed.len();

        if report.devices_ok == 0 && !report.failed_devices.is_empty() {
            let msg = format!(
                "{family}: every device failed to respond ({})",
                report.failed_devices.join(", ")
            );
            return fail(report, &mut cycle, msg);
        }

        // ----------------------------------------------------------------
        // Reconcile
        // ----------------------------------------------------------------
        cycle.enter(RunPhase::Reconciling);
        let previous = match self.take_unsaved() {
            Some(pending) => {
                debug!(run_id = %report.run_id, %family, "baseline from unsaved previous cycle");
                pending
            }
            None => self.store.load(family),
        };

        // Failed devices are neither compared nor dropped: their previous
        // entries are carried forward untouched.
        let mut comparable = previous.clone();
        for address in &report.failed_devices {
            comparable.remove_device(address);
        }
        let mut outcome = self.diff_remembering(&comparable, &observed);
        for address in &report.failed_devices {
            outcome.next.carry_device_from(&previous, address);
        }
        self.forget_untracked(&outcome.next);
        report.events = outcome.events.len();

        // ----------------------------------------------------------------
        // Dispatch
        // ----------------------------------------------------------------
        cycle.enter(RunPhase::Dispatching);
        report.outcomes = self.dispatcher.dispatch(family, &outcome.events).await;

        // ----------------------------------------------------------------
        // Persist
        // ----------------------------------------------------------------
        cycle.enter(RunPhase::Persisting);
        if let Err(e) = self.store.save(family, &outcome.next) {
            self.keep_unsaved(outcome.next);
            let msg = format!("{family}: state not saved, will retry next cycle: {e}");
            return fail(report, &mut cycle, msg);
        }

        cycle.enter(RunPhase::Done);
        report.phase = RunPhase::Done;
        report.finished_at = Utc::now();

        let alerts_failed = report.alerts_failed();
        report.status = if report.failed_devices.is_empty() && alerts_failed == 0 {
            RunStatus::Ok
        } else {
            RunStatus::Degraded
        };
        report.message = format!(
            "{family}: check completed; {} channel(s), {} transition(s), {} alert(s) failed, {} device(s) skipped",
            report.channels_observed,
            report.events,
            alerts_failed,
            report.failed_devices.len()
        );

        info!(
            run_id = %report.run_id,
            %family,
            status = report.status.as_str(),
            channels = report.channels_observed,
            events = report.events,
            alerts_failed,
            "run complete"
        );
        report
    }
}

fn fail(mut report: RunReport, cycle: &mut Cycle, message: String) -> RunReport {
    let at = cycle.phase;
    cycle.enter(RunPhase::Failed);
    error!(run_id = %report.run_id, family = %report.family, phase = %at, "{message}");
    report.phase = RunPhase::Failed;
    report.failed_at = Some(at);
    report.status = RunStatus::Failed;
    report.message = message;
    report.finished_at = Utc::now();
    report
}
