//! Change-cursor persistence.
//!
//! The cursor is an opaque bookmark into the remote change stream. It is read
//! once at the start of a run and written once at the end, strictly after all
//! artifacts have been written back. A persistence failure is fatal for the
//! run: the run must not be considered complete if the cursor cannot advance.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RunError, RunResult};

/// Storage seam for the change cursor.
pub trait CursorStore: Send + Sync {
    /// Returns the persisted cursor, or `None` on the first run.
    fn load(&self) -> RunResult<Option<String>>;

    /// Overwrites the persisted cursor, creating any missing backing
    /// location transparently.
    fn save(&self, cursor: &str) -> RunResult<()>;
}

/// Filesystem-backed cursor store: `<state_dir>/cursor/current`.
pub struct FsCursorStore {
    path: PathBuf,
}

impl FsCursorStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("cursor").join("current"),
        }
    }

    /// Location of the backing file, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the persisted cursor so the next run starts from the beginning.
    pub fn reset(&self) -> RunResult<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RunError::state("removing cursor", e)),
        }
    }
}

impl CursorStore for FsCursorStore {
    fn load(&self) -> RunResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no cursor found — first run");
                Ok(None)
            }
            Err(e) => Err(RunError::state("reading cursor", e)),
        }
    }

    fn save(&self, cursor: &str) -> RunResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RunError::state("creating cursor directory", e))?;
        }
        std::fs::write(&self.path, cursor).map_err(|e| RunError::state("writing cursor", e))?;
        info!("saved cursor");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_returns_none_on_first_run() {
        let tmp = TempDir::new().unwrap();
        let store = FsCursorStore::new(tmp.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_creates_directories_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = FsCursorStore::new(tmp.path());
        store.save("token-1").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("token-1"));
        store.save("token-2").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("token-2"));
    }

    #[test]
    fn reset_removes_the_cursor() {
        let tmp = TempDir::new().unwrap();
        let store = FsCursorStore::new(tmp.path());
        assert!(!store.reset().unwrap());
        store.save("token").unwrap();
        assert!(store.reset().unwrap());
        assert_eq!(store.load().unwrap(), None);
    }
}
