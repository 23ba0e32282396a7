//! AI summarization and classification.
//!
//! [`Summarizer`] is the seam between the pipeline and the description
//! provider; [`AnthropicSummarizer`] calls the Anthropic Messages API.
//!
//! # Content Dispatch
//!
//! Files are encoded per extension before being sent:
//!
//! | Extension | Encoding |
//! |-----------|----------|
//! | `.docx` | local text extraction, sent as text |
//! | `.pdf` | base64 document content block |
//! | `.png` `.jpg` `.jpeg` `.gif` `.webp` | base64 image content block |
//! | everything else | UTF-8 text (lossy), truncated |
//!
//! # Retry Strategy
//!
//! Rate limits (HTTP 429) and server errors (5xx) are retried with
//! exponential backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5), up to the
//! configured attempt count. Other 4xx responses fail immediately. The
//! pipeline adds no retry layer of its own on top of this.
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY` — required.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SummarizerConfig;
use crate::error::{RunError, RunResult};
use crate::extract::extract_docx_text;
use crate::throttle::{FixedDelay, Throttle};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Output budget for a one-sentence file summary.
const SUMMARY_MAX_TOKENS: u32 = 150;
/// Output budget for a short folder classification label.
const CLASSIFY_MAX_TOKENS: u32 = 50;

/// Summarization provider seam.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate a one-line summary of a file.
    async fn summarize_file(&self, filename: &str, content: &[u8]) -> RunResult<String>;

    /// Classify a folder into a short category label (e.g. "project-docs")
    /// from its path and complete current file list.
    async fn classify_folder(&self, folder_path: &str, filenames: &[String]) -> RunResult<String>;
}

/// Anthropic Messages API client.
pub struct AnthropicSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
    max_file_content_bytes: usize,
    throttle: Box<dyn Throttle>,
}

impl AnthropicSummarizer {
    /// Build a client from config, reading the key from `ANTHROPIC_API_KEY`.
    /// The configured request delay becomes a [`FixedDelay`] gate applied
    /// before every call.
    pub fn new(config: &SummarizerConfig) -> RunResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            RunError::Auth("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
            max_file_content_bytes: config.max_file_content_bytes,
            throttle: Box::new(FixedDelay::from_millis(config.request_delay_ms)),
        })
    }

    /// Swap the throttle gate (e.g. for a future token-bucket limiter).
    pub fn with_throttle(mut self, throttle: Box<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Send one Messages request with throttle and bounded backoff, returning
    /// the first text block of the response.
    async fn create_message(&self, max_tokens: u32, content: Value) -> RunResult<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": content }],
        });

        self.throttle.wait().await;

        let mut last_err: Option<RunError> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return extract_text(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(status = status.as_u16(), attempt, "provider throttled, backing off");
                        last_err = Some(RunError::Summarizer(format!(
                            "provider error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error other than 429: retrying won't help.
                    return Err(RunError::Summarizer(format!(
                        "provider error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RunError::Summarizer("request failed after retries".into())))
    }

    fn text_prompt(&self, filename: &str, content: &[u8]) -> String {
        let truncated = &content[..content.len().min(self.max_file_content_bytes)];
        let text = String::from_utf8_lossy(truncated);
        format!(
            "Summarize this file in one sentence. File name: {}\n\nContent:\n{}",
            filename, text
        )
    }

    fn docx_prompt(&self, filename: &str, content: &[u8]) -> String {
        let extracted = match extract_docx_text(content) {
            Ok(text) if !text.is_empty() => text,
            _ => {
                warn!(filename, "docx text extraction empty");
                format!("[could not extract text from {}]", filename)
            }
        };
        let truncated: String = extracted
            .chars()
            .take(self.max_file_content_bytes)
            .collect();
        format!(
            "Summarize this file in one sentence. File name: {}\n\nContent:\n{}",
            filename, truncated
        )
    }
}

/// Media types for image extensions the provider accepts natively.
fn image_media_type(extension: &str) -> Option<&'static str> {
    match extension {
        ".png" => Some("image/png"),
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".gif" => Some("image/gif"),
        ".webp" => Some("image/webp"),
        _ => None,
    }
}

/// Lowercased file extension including the dot, or empty.
fn file_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(dot) => filename[dot..].to_lowercase(),
        None => String::new(),
    }
}

/// Pull the first `text` content block out of a Messages response.
fn extract_text(response: &Value) -> RunResult<String> {
    response
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
        })
        .and_then(|b| b.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| RunError::Summarizer("no text block in provider response".into()))
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    async fn summarize_file(&self, filename: &str, content: &[u8]) -> RunResult<String> {
        let ext = file_extension(filename);

        let message_content: Value = if ext == ".docx" {
            debug!(filename, "sending docx prompt");
            json!(self.docx_prompt(filename, content))
        } else if ext == ".pdf" {
            debug!(filename, raw_bytes = content.len(), "sending pdf document block");
            let encoded = base64::engine::general_purpose::STANDARD.encode(content);
            json!([
                {
                    "type": "document",
                    "source": {
                        "type": "base64",
                        "media_type": "application/pdf",
                        "data": encoded,
                    },
                },
                {
                    "type": "text",
                    "text": format!("Summarize this file in one sentence. File name: {}", filename),
                },
            ])
        } else if let Some(media_type) = image_media_type(&ext) {
            debug!(filename, raw_bytes = content.len(), "sending image block");
            let encoded = base64::engine::general_purpose::STANDARD.encode(content);
            json!([
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": media_type,
                        "data": encoded,
                    },
                },
                {
                    "type": "text",
                    "text": format!("Summarize this file in one sentence. File name: {}", filename),
                },
            ])
        } else {
            debug!(filename, "sending text prompt");
            json!(self.text_prompt(filename, content))
        };

        let summary = self.create_message(SUMMARY_MAX_TOKENS, message_content).await?;
        info!(filename, "received summary");
        Ok(summary)
    }

    async fn classify_folder(&self, folder_path: &str, filenames: &[String]) -> RunResult<String> {
        let file_list: String = filenames
            .iter()
            .map(|f| format!("- {}\n", f))
            .collect();
        let prompt = format!(
            "Classify this folder into a short category label (1-2 words, lowercase, hyphenated). \
             Folder path: {}\nFiles:\n{}",
            folder_path, file_list
        );

        debug!(folder = folder_path, file_count = filenames.len(), "classifying folder");
        let label = self.create_message(CLASSIFY_MAX_TOKENS, json!(prompt)).await?;
        Ok(label.trim().to_string())
    }
}
