use chrono::{DateTime, Utc};
use cw_alert::DispatchOutcome;
use cw_reconcile::DeviceFamily;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Reconciling,
    Dispatching,
    Persisting,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Reconciling => "reconciling",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Persisting => "persisting",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }

    /// Legal moves: one step forward along the happy path, or to `Failed`
    /// from any non-terminal phase.
    pub fn can_advance_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Fetching, Reconciling)
                | (Reconciling, Dispatching)
                | (Dispatching, Persisting)
                | (Persisting, Done)
        ) || (!self.is_terminal() && next == Failed)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Everything fetched, every alert accepted, state saved.
    Ok,
    /// State saved, but some device or some alert failed.
    Degraded,
    /// State not saved.
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Degraded => "degraded",
            RunStatus::Failed => "failed",
        }
    }
}

/// Outcome of one [`crate::ReconciliationRun::execute`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub family: DeviceFamily,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `Done` or `Failed`.
    pub phase: RunPhase,
    /// Phase the run was in when it failed.
    pub failed_at: Option<RunPhase>,
    pub status: RunStatus,
    pub message: String,
    pub devices_ok: usize,
    pub failed_devices: Vec<String>,
    pub channels_observed: usize,
    pub events: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

impl RunReport {
    pub fn alerts_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.accepted).count()
    }

    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward_or_fail() {
        assert!(RunPhase::Idle.can_advance_to(RunPhase::Fetching));
        assert!(RunPhase::Dispatching.can_advance_to(RunPhase::Persisting));
        assert!(RunPhase::Persisting.can_advance_to(RunPhase::Failed));
        assert!(!RunPhase::Fetching.can_advance_to(RunPhase::Persisting));
        assert!(!RunPhase::Done.can_advance_to(RunPhase::Failed));
        assert!(!RunPhase::Failed.can_advance_to(RunPhase::Fetching));
    }
}
