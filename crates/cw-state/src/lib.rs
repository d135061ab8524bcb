//! cw-state
//!
//! Durable per-family snapshot storage.
//!
//! - One JSON document per device family: `address -> { channel_id -> status }`
//! - `load` never fails: absent, empty or corrupt state is "no prior state"
//! - `save` is atomic (temp file in the same directory, then rename)

mod error;
mod file_store;

pub use error::PersistenceError;
pub use file_store::JsonFileStateStore;

use cw_reconcile::{DeviceFamily, Snapshot};

/// Storage for the last observed snapshot of each device family.
///
/// Callers serialize load/save per family; implementations need not.
pub trait StateStore: Send + Sync {
    /// Last persisted snapshot, or empty if there is none worth trusting.
    fn load(&self, family: DeviceFamily) -> Snapshot;

    /// Replace the persisted snapshot for `family`.
    fn save(&self, family: DeviceFamily, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}
