//! Core data models for the sync pipeline.
//!
//! These types represent the change-stream items, folder listings, and
//! pagination pages that flow from the remote store through the pipeline.

/// One changed entity reported by the remote change stream.
///
/// The `id` is stable across renames. `parent_id` is empty only for the
/// drive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub parent_path: String,
    pub is_folder: bool,
    pub is_deleted: bool,
}

/// How a delta page continues (or terminates) pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContinuation {
    /// More pages follow; fetch this link next.
    Next(String),
    /// Final page; the contained value is the cursor for the next run.
    Final(String),
    /// The page carried neither marker. Protocol violation — the fetcher
    /// must fail the run rather than loop or silently stop.
    Missing,
}

/// One page of the remote change stream.
#[derive(Debug, Clone)]
pub struct ChangePage {
    pub items: Vec<DriveItem>,
    pub continuation: PageContinuation,
}

/// One child returned by a folder enumeration.
#[derive(Debug, Clone)]
pub struct ChildEntry {
    pub id: String,
    pub name: String,
    pub is_folder: bool,
    /// Path of the containing folder (the remote reports it on each child).
    pub parent_path: String,
}

/// Current snapshot of one folder's file contents.
///
/// `file_names` and `file_ids` are positionally paired and always the same
/// length, preserving the remote-reported order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderListing {
    pub folder_id: String,
    pub folder_path: String,
    pub file_names: Vec<String>,
    pub file_ids: Vec<String>,
}

impl FolderListing {
    /// Iterate over `(name, id)` pairs in listing order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.file_names
            .iter()
            .map(String::as_str)
            .zip(self.file_ids.iter().map(String::as_str))
    }
}
