use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use cw_reconcile::{DeviceFamily, Snapshot};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{PersistenceError, StateStore};

/// Snapshot files under one state directory, one per family
/// (see [`DeviceFamily::state_file_name`]).
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    dir: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, family: DeviceFamily) -> PathBuf {
        self.dir.join(family.state_file_name())
    }

    /// First run: leave an empty document behind so the operator can see
    /// where state lives. Failure here only costs the placeholder.
    fn write_placeholder(&self, path: &Path) {
        let res = fs::create_dir_all(&self.dir).and_then(|_| fs::write(path, "{}\n"));
        match res {
            Ok(()) => info!(path = %path.display(), "created empty state file"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not create state placeholder"),
        }
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self, family: DeviceFamily) -> Snapshot {
        let path = self.path_for(family);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.write_placeholder(&path);
                return Snapshot::empty();
            }
            Err(e) => {
                warn!(%family, path = %path.display(), error = %e, "state unreadable; starting empty");
                return Snapshot::empty();
            }
        };

        if raw.trim().is_empty() {
            info!(%family, path = %path.display(), "state file empty; starting from baseline");
            return Snapshot::empty();
        }

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snap) => {
                debug!(%family, channels = snap.len(), "state loaded");
                snap
            }
            Err(e) => {
                warn!(%family, path = %path.display(), error = %e, "state corrupt; starting empty");
                Snapshot::empty()
            }
        }
    }

    fn save(&self, family: DeviceFamily, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let path = self.path_for(family);

        let mut json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;
        json.push('\n');

        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;

        // Same directory as the target so the rename never crosses filesystems.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PersistenceError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| PersistenceError::io(&path, e.error))?;

        debug!(%family, channels = snapshot.len(), path = %path.display(), "state saved");
        Ok(())
    }
}
