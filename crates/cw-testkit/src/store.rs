use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use cw_reconcile::{DeviceFamily, Snapshot};
use cw_state::{PersistenceError, StateStore};

/// Process-local state store with switchable save failures.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    snapshots: Mutex<BTreeMap<DeviceFamily, Snapshot>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, family: DeviceFamily, snapshot: Snapshot) {
        self.snapshots.lock().unwrap().insert(family, snapshot);
    }

    /// What a fresh `load` would return.
    pub fn current(&self, family: DeviceFamily) -> Snapshot {
        self.load(family)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, family: DeviceFamily) -> Snapshot {
        self.snapshots
            .lock()
            .unwrap()
            .get(&family)
            .cloned()
            .unwrap_or_default()
    }

    fn save(&self, family: DeviceFamily, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io {
                path: format!("memory://{family}").into(),
                message: "simulated disk full".to_string(),
            });
        }
        self.snapshots
            .lock()
            .unwrap()
            .insert(family, snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
