use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub remote: RemoteConfig,
    pub state: StateConfig,
    #[serde(default)]
    pub artifact: ArtifactConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

/// Remote drive settings. The client secret is deliberately not part of the
/// config file — it is read from `GRAPH_CLIENT_SECRET` when the client is
/// constructed.
#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    pub tenant_id: String,
    pub client_id: String,
    /// UPN or object ID of the user whose drive is polled.
    pub drive_user: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    /// Directory holding `cursor/current` and `cache/<sha256>`.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArtifactConfig {
    /// Name of the generated description file. Also the filename excluded by
    /// loop prevention, so changing it mid-deployment orphans old artifacts.
    #[serde(default = "default_artifact_filename")]
    pub filename: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            filename: default_artifact_filename(),
        }
    }
}

fn default_artifact_filename() -> String {
    "folder_description.md".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Retry attempts for rate-limited requests (client-level backoff).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Minimum delay before each provider call, in milliseconds. Zero disables
    /// throttling.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Max bytes of file content sent per summarization request.
    #[serde(default = "default_max_file_content_bytes")]
    pub max_file_content_bytes: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_retries: default_max_retries(),
            request_delay_ms: default_request_delay_ms(),
            max_file_content_bytes: default_max_file_content_bytes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_max_file_content_bytes() -> usize {
    8192
}
fn default_timeout_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.remote.tenant_id.trim().is_empty() {
        anyhow::bail!("remote.tenant_id must not be empty");
    }
    if config.remote.client_id.trim().is_empty() {
        anyhow::bail!("remote.client_id must not be empty");
    }
    if config.remote.drive_user.trim().is_empty() {
        anyhow::bail!("remote.drive_user must not be empty");
    }
    if config.artifact.filename.trim().is_empty() {
        anyhow::bail!("artifact.filename must not be empty");
    }
    if config.summarizer.max_file_content_bytes == 0 {
        anyhow::bail!("summarizer.max_file_content_bytes must be > 0");
    }

    Ok(config)
}
