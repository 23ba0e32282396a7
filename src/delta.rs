//! Change fetching over the remote delta stream.
//!
//! [`ChangeFetcher::fetch`] turns one cursor into the accumulated batch of
//! changed items plus the cursor for the next run, following pagination to
//! completion and applying self-change loop prevention before returning.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::error::{RunError, RunResult};
use crate::models::{DriveItem, PageContinuation};
use crate::remote::RemoteStore;

pub struct ChangeFetcher<'a> {
    remote: &'a dyn RemoteStore,
    artifact_filename: String,
}

impl<'a> ChangeFetcher<'a> {
    pub fn new(remote: &'a dyn RemoteStore, artifact_filename: impl Into<String>) -> Self {
        Self {
            remote,
            artifact_filename: artifact_filename.into(),
        }
    }

    /// Fetch all changes since `cursor` (all current items when `cursor` is
    /// absent) and the cursor for the next run.
    ///
    /// Follows next-page links until a page carries the final cursor. A page
    /// carrying neither marker fails the run with [`RunError::Protocol`]:
    /// stopping silently there would either drop changes or loop forever.
    pub async fn fetch(&self, cursor: Option<&str>) -> RunResult<(Vec<DriveItem>, String)> {
        let mut items: Vec<DriveItem> = Vec::new();
        let mut page = self.remote.query_changes(cursor).await?;

        let next_cursor = loop {
            items.extend(page.items);
            match page.continuation {
                PageContinuation::Final(token) => break token,
                PageContinuation::Next(link) => {
                    page = self.remote.query_changes_page(&link).await?;
                }
                PageContinuation::Missing => {
                    return Err(RunError::Protocol(
                        "delta page carried neither a next link nor a delta link".into(),
                    ));
                }
            }
        };

        Ok((self.apply_loop_prevention(items), next_cursor))
    }

    /// Drop change groups caused by this pipeline's own output.
    ///
    /// Items are grouped by `parent_id`; a group is excluded when its only
    /// non-deleted item names are exactly the artifact filename. A group
    /// that is all deletions is kept — a deletion still requires the parent's
    /// artifact to be regenerated.
    fn apply_loop_prevention(&self, items: Vec<DriveItem>) -> Vec<DriveItem> {
        let mut non_deleted_names: HashMap<&str, HashSet<&str>> = HashMap::new();
        for item in &items {
            let names = non_deleted_names.entry(&item.parent_id).or_default();
            if !item.is_deleted {
                names.insert(&item.name);
            }
        }

        let excluded: HashSet<String> = non_deleted_names
            .iter()
            .filter(|(_, names)| {
                names.len() == 1 && names.contains(self.artifact_filename.as_str())
            })
            .map(|(parent, _)| parent.to_string())
            .collect();

        for parent_id in &excluded {
            info!(
                parent_id = parent_id.as_str(),
                filename = self.artifact_filename.as_str(),
                "excluding folder — only the description file changed"
            );
        }

        items
            .into_iter()
            .filter(|item| !excluded.contains(&item.parent_id))
            .collect()
    }
}
