use cw_reconcile::DeviceFamily;
use tokio::sync::{Mutex, MutexGuard};

/// One async mutex per family: a family's load/save pair never interleaves
/// with another run of the same family. Different families never contend.
#[derive(Debug, Default)]
pub struct FamilyLocks {
    locks: [Mutex<()>; 4],
}

impl FamilyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(family: DeviceFamily) -> usize {
        match family {
            DeviceFamily::ElementalConductor => 0,
            DeviceFamily::ElementalLive => 1,
            DeviceFamily::ElementalDelta => 2,
            DeviceFamily::EnvivioHalo => 3,
        }
    }

    pub async fn acquire(&self, family: DeviceFamily) -> MutexGuard<'_, ()> {
        self.locks[Self::slot(family)].lock().await
    }

    pub fn try_acquire(&self, family: DeviceFamily) -> Option<MutexGuard<'_, ()>> {
        self.locks[Self::slot(family)].try_lock().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_family_excludes_other_families_do_not() {
        let locks = FamilyLocks::new();
        let held = locks.try_acquire(DeviceFamily::ElementalLive);
        assert!(held.is_some());
        assert!(locks.try_acquire(DeviceFamily::ElementalLive).is_none());
        assert!(locks.try_acquire(DeviceFamily::EnvivioHalo).is_some());
        drop(held);
        assert!(locks.try_acquire(DeviceFamily::ElementalLive).is_some());
    }
}
