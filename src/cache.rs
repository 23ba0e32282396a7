//! Content-addressed per-file summary cache.
//!
//! Summaries are stored keyed by the SHA-256 hex digest of the file's raw
//! bytes, so identical content maps to the same entry regardless of filename
//! or path. Entries are immutable once written: a re-put for the same key can
//! only carry a summary of the same content, so overwrites are idempotent and
//! no read-modify-write discipline is needed.
//!
//! The empty-byte digest is never stored — empty or unreadable files would
//! otherwise all collapse onto one degenerate key. Callers enforce this by
//! only putting summaries for non-empty content.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{RunError, RunResult};

/// Compute the lowercase SHA-256 hex digest of file content.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Storage seam for cached summaries.
///
/// `get` on a missing key returns `Ok(None)`. A backend failure that is not
/// "key missing" is an error, not a miss: degrading to never-cache silently
/// would defeat the optimization without anyone noticing.
pub trait SummaryCache: Send + Sync {
    fn get(&self, content_hash: &str) -> RunResult<Option<String>>;

    /// Store a summary, creating any missing backing location transparently.
    fn put(&self, content_hash: &str, summary: &str) -> RunResult<()>;
}

/// Filesystem-backed cache: one UTF-8 file per key under `<state_dir>/cache/`.
pub struct FsSummaryCache {
    dir: PathBuf,
}

impl FsSummaryCache {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join("cache"),
        }
    }
}

impl SummaryCache for FsSummaryCache {
    fn get(&self, content_hash: &str) -> RunResult<Option<String>> {
        match std::fs::read_to_string(self.dir.join(content_hash)) {
            Ok(summary) => {
                debug!(hash = content_hash, "cache hit");
                Ok(Some(summary))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(hash = content_hash, "cache miss");
                Ok(None)
            }
            Err(e) => Err(RunError::state("reading cache entry", e)),
        }
    }

    fn put(&self, content_hash: &str, summary: &str) -> RunResult<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| RunError::state("creating cache directory", e))?;
        std::fs::write(self.dir.join(content_hash), summary)
            .map_err(|e| RunError::state("writing cache entry", e))?;
        debug!(hash = content_hash, "cache stored");
        Ok(())
    }
}
