//! Run orchestration: one linear pass from cursor load to cursor commit.
//!
//! ```text
//! cursor → fetch changes → resolve folders → list each folder
//!        → generate + write back each artifact → commit cursor
//! ```
//!
//! The cursor is committed strictly after every surviving folder's artifact
//! has been written back. If any write-back fails, the cursor stays put and
//! the next run re-fetches the same change range — at-least-once delivery.
//! A folder already rewritten before the failure gets redundantly rewritten
//! on the retry; artifact regeneration is idempotent, so that costs only an
//! extra upload.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::artifact::generate_artifact;
use crate::cache::SummaryCache;
use crate::cursor::CursorStore;
use crate::delta::ChangeFetcher;
use crate::error::RunResult;
use crate::models::{DriveItem, FolderListing};
use crate::remote::RemoteStore;
use crate::summarizer::Summarizer;

/// Outcome of one completed run, for caller-side logging.
#[derive(Debug)]
pub struct RunReport {
    /// Listings whose artifacts were regenerated and written back.
    pub listings: Vec<FolderListing>,
    /// Folders dropped because enumeration failed (e.g. deleted since the
    /// change was recorded).
    pub folders_skipped: u32,
}

pub struct Pipeline<'a> {
    remote: &'a dyn RemoteStore,
    summarizer: &'a dyn Summarizer,
    cursor_store: &'a dyn CursorStore,
    cache: &'a dyn SummaryCache,
    artifact_filename: String,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        remote: &'a dyn RemoteStore,
        summarizer: &'a dyn Summarizer,
        cursor_store: &'a dyn CursorStore,
        cache: &'a dyn SummaryCache,
        artifact_filename: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            summarizer,
            cursor_store,
            cache,
            artifact_filename: artifact_filename.into(),
        }
    }

    /// Execute one full run.
    pub async fn run(&self) -> RunResult<RunReport> {
        info!("starting sync run");
        let cursor = self.cursor_store.load()?;

        let fetcher = ChangeFetcher::new(self.remote, self.artifact_filename.clone());
        let (items, next_cursor) = fetcher.fetch(cursor.as_deref()).await?;
        info!(item_count = items.len(), "fetched changes");

        let folder_ids = resolve_folders(&items);
        info!(folder_count = folder_ids.len(), "resolved folders");

        let mut listings = Vec::new();
        let mut folders_skipped = 0u32;
        for folder_id in &folder_ids {
            match self.list_folder(folder_id).await {
                Ok(listing) => listings.push(listing),
                Err(e) => {
                    warn!(folder_id = folder_id.as_str(), error = %e, "skipping folder — enumeration failed");
                    folders_skipped += 1;
                }
            }
        }

        for listing in &listings {
            self.describe_folder(listing).await?;
        }

        // Every surviving artifact is written back; only now may the cursor
        // advance.
        self.cursor_store.save(&next_cursor)?;

        info!(
            listing_count = listings.len(),
            folders_skipped, "run complete"
        );
        Ok(RunReport {
            listings,
            folders_skipped,
        })
    }

    /// Enumerate a folder's current files, preserving the remote-reported
    /// order. The folder path comes from the children's own parent metadata.
    async fn list_folder(&self, folder_id: &str) -> RunResult<FolderListing> {
        let children = self.remote.list_children(folder_id).await?;

        let folder_path = children
            .first()
            .map(|c| c.parent_path.clone())
            .unwrap_or_default();

        let mut file_names = Vec::new();
        let mut file_ids = Vec::new();
        for child in children {
            if child.is_folder {
                continue;
            }
            file_names.push(child.name);
            file_ids.push(child.id);
        }

        Ok(FolderListing {
            folder_id: folder_id.to_string(),
            folder_path,
            file_names,
            file_ids,
        })
    }

    /// Generate the folder's artifact and write it back.
    async fn describe_folder(&self, listing: &FolderListing) -> RunResult<()> {
        let mut contents = Vec::with_capacity(listing.file_ids.len());
        for (name, id) in listing.files() {
            match self.remote.get_content(id).await {
                Ok(bytes) => contents.push(bytes),
                Err(e) => {
                    // Degrade to empty content; empty content is never cached,
                    // so a transient download failure cannot poison the cache.
                    warn!(filename = name, error = %e, "content download failed, substituting empty");
                    contents.push(Vec::new());
                }
            }
        }

        let artifact = generate_artifact(listing, &contents, self.summarizer, self.cache).await?;
        let markdown = artifact.to_markdown();

        self.remote
            .put_content(
                &listing.folder_id,
                &self.artifact_filename,
                markdown.as_bytes(),
                "text/markdown",
            )
            .await?;
        info!(
            folder_path = listing.folder_path.as_str(),
            file_count = artifact.files.len(),
            "uploaded folder description"
        );
        Ok(())
    }
}

/// Deduplicate the affected folder ids from a change batch, first-seen order.
///
/// Every non-folder item contributes its parent, deletions included — a
/// deletion still requires the parent's artifact to be regenerated. Folders
/// never contribute their own id: a folder created or renamed with no file
/// changes does not by itself trigger regeneration. That asymmetry mirrors
/// the upstream behavior and may be worth revisiting.
pub fn resolve_folders(items: &[DriveItem]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut folder_ids = Vec::new();
    for item in items {
        if item.is_folder {
            continue;
        }
        if seen.insert(&item.parent_id) {
            folder_ids.push(item.parent_id.clone());
        }
    }
    folder_ids
}
