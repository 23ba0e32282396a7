//! Folder artifact generation and serialization.
//!
//! One artifact describes one folder: a front-matter header (path, AI
//! classification, generation date) followed by a `##` section per file in
//! listing order. Artifacts are always regenerated whole — never patched.

use chrono::Utc;
use tracing::debug;

use crate::cache::{content_hash, SummaryCache};
use crate::error::RunResult;
use crate::models::FolderListing;
use crate::summarizer::Summarizer;

/// Summary of one file within a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub filename: String,
    pub summary: String,
}

/// Generated description of one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderArtifact {
    pub folder_path: String,
    pub folder_type: String,
    pub files: Vec<FileSummary>,
    /// Generation date, `YYYY-MM-DD`.
    pub updated_at: String,
}

impl FolderArtifact {
    /// Serialize to Markdown with YAML front matter, trailing newline
    /// included.
    pub fn to_markdown(&self) -> String {
        let mut lines: Vec<String> = vec![
            "---".to_string(),
            format!("path: {}", self.folder_path),
            format!("type: \"{}\"", self.folder_type),
            format!("updated_at: {}", self.updated_at),
            "---".to_string(),
        ];
        for file in &self.files {
            lines.push(String::new());
            lines.push(format!("## {}", file.filename));
            lines.push(String::new());
            lines.push(file.summary.clone());
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

/// Generate a folder's artifact from its listing and downloaded contents.
///
/// `contents` is positionally paired with the listing's files. The folder
/// classification is requested unconditionally — it depends on the complete
/// current file list, which is exactly what changed. Per-file summaries are
/// served from the cache on a content hash hit; fresh summaries of non-empty
/// content are cached, empty content never is.
pub async fn generate_artifact(
    listing: &FolderListing,
    contents: &[Vec<u8>],
    summarizer: &dyn Summarizer,
    cache: &dyn SummaryCache,
) -> RunResult<FolderArtifact> {
    debug_assert_eq!(listing.file_names.len(), contents.len());

    let folder_type = summarizer
        .classify_folder(&listing.folder_path, &listing.file_names)
        .await?;

    let mut files = Vec::with_capacity(listing.file_names.len());
    for (name, content) in listing.file_names.iter().zip(contents) {
        let summary = cached_or_fresh_summary(name, content, summarizer, cache).await?;
        files.push(FileSummary {
            filename: name.clone(),
            summary,
        });
    }

    Ok(FolderArtifact {
        folder_path: listing.folder_path.clone(),
        folder_type,
        files,
        updated_at: Utc::now().format("%Y-%m-%d").to_string(),
    })
}

async fn cached_or_fresh_summary(
    filename: &str,
    content: &[u8],
    summarizer: &dyn Summarizer,
    cache: &dyn SummaryCache,
) -> RunResult<String> {
    if content.is_empty() {
        // Unreadable and empty files all hash to the same degenerate key, so
        // they bypass the cache entirely.
        return summarizer.summarize_file(filename, content).await;
    }

    let key = content_hash(content);
    if let Some(cached) = cache.get(&key)? {
        debug!(filename, "using cached summary");
        return Ok(cached);
    }

    let summary = summarizer.summarize_file(filename, content).await?;
    cache.put(&key, &summary)?;
    Ok(summary)
}
