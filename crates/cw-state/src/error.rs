use std::fmt;
use std::path::PathBuf;

/// Errors raised by [`crate::StateStore::save`].
#[derive(Debug)]
pub enum PersistenceError {
    /// The snapshot could not be encoded.
    Serialize(String),
    /// Filesystem failure while writing or renaming.
    Io { path: PathBuf, message: String },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialize(msg) => write!(f, "snapshot serialize failed: {msg}"),
            PersistenceError::Io { path, message } => {
                write!(f, "state write failed ({}): {message}", path.display())
            }
        }
    }
}

impl std::error::Error for PersistenceError {}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        PersistenceError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
