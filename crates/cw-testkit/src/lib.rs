//! In-memory collaborators for driving reconciliation runs in tests.
//!
//! No network and no filesystem, unless a scenario brings its own store.

use anyhow::{Context, Result};
use cw_reconcile::Snapshot;

mod alerting;
mod source;
mod store;

pub use alerting::{RecordedCall, RecordingAlertingService};
pub use source::{OutcomeBuilder, ScriptedSource};
pub use store::MemoryStateStore;

/// Parse a snapshot from the persisted JSON layout.
pub fn snapshot_from_json(raw: &str) -> Result<Snapshot> {
    serde_json::from_str(raw).context("parse snapshot json")
}
