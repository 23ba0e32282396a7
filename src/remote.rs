//! Remote drive access.
//!
//! [`RemoteStore`] is the seam between the pipeline and the drive backend;
//! [`GraphStore`] is the production implementation against Microsoft Graph
//! v1.0 with OAuth2 client-credentials authentication.
//!
//! # Environment Variables
//!
//! - `GRAPH_CLIENT_SECRET` — required; the application client secret. Kept
//!   out of the config file so it never lands in version control.
//!
//! # Error Mapping
//!
//! - Token acquisition failure → [`RunError::Auth`] (fatal, no retry).
//! - Non-2xx API response → [`RunError::Api`] with status and the `error.message`
//!   field from the body when present.

use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{RunError, RunResult};
use crate::models::{ChangePage, ChildEntry, DriveItem, PageContinuation};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const AUTHORITY_BASE_URL: &str = "https://login.microsoftonline.com";

/// Remote hierarchical file store, Microsoft-Graph-delta-shaped.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Issue the initial change query: unparameterized when `cursor` is
    /// absent (first run), else parameterized by the cursor.
    async fn query_changes(&self, cursor: Option<&str>) -> RunResult<ChangePage>;

    /// Follow a pagination link from a previous page.
    async fn query_changes_page(&self, next_link: &str) -> RunResult<ChangePage>;

    /// Enumerate the current children of a folder.
    async fn list_children(&self, folder_id: &str) -> RunResult<Vec<ChildEntry>>;

    /// Download one item's raw content.
    async fn get_content(&self, item_id: &str) -> RunResult<Vec<u8>>;

    /// Upload a file into a folder, overwriting any existing file of the
    /// same name.
    async fn put_content(
        &self,
        folder_id: &str,
        filename: &str,
        content: &[u8],
        content_type: &str,
    ) -> RunResult<()>;
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Microsoft Graph client using the client-credentials flow.
pub struct GraphStore {
    http: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    drive_user: String,
    token: Mutex<Option<CachedToken>>,
}

impl GraphStore {
    /// Build a client from config, reading the secret from
    /// `GRAPH_CLIENT_SECRET`.
    pub fn new(config: &RemoteConfig) -> RunResult<Self> {
        let client_secret = std::env::var("GRAPH_CLIENT_SECRET")
            .map_err(|_| RunError::Auth("GRAPH_CLIENT_SECRET environment variable not set".into()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            tenant_id: config.tenant_id.clone(),
            client_id: config.client_id.clone(),
            client_secret,
            drive_user: config.drive_user.clone(),
            token: Mutex::new(None),
        })
    }

    /// Acquire (or reuse) a Bearer token. Tokens are cached until one minute
    /// before expiry.
    async fn acquire_token(&self) -> RunResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            AUTHORITY_BASE_URL, self.tenant_id
        );
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let resp = self.http.post(&url).form(&params).send().await?;
        let status = resp.status();
        let body: Value = resp.json().await?;

        if !status.is_success() {
            let error = body
                .get("error_description")
                .and_then(|v| v.as_str())
                .unwrap_or("no description provided");
            return Err(RunError::Auth(format!(
                "token endpoint returned {}: {}",
                status, error
            )));
        }

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RunError::Auth("token response missing access_token".into()))?
            .to_string();
        let expires_in = body
            .get("expires_in")
            .and_then(|v| v.as_u64())
            .unwrap_or(300);

        let expires_at = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));
        *guard = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });
        debug!("acquired access token");
        Ok(access_token)
    }

    /// Authenticated GET returning JSON; `path` is relative to the Graph base
    /// URL and must start with `/`.
    async fn get_json(&self, path: &str) -> RunResult<Value> {
        let token = self.acquire_token().await?;
        let resp = self
            .http
            .get(format!("{}{}", GRAPH_BASE_URL, path))
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(resp.json().await?)
    }

    fn delta_base(&self) -> String {
        format!("/users/{}/drive/root/delta", self.drive_user)
    }
}

/// Map a non-2xx Graph response to [`RunError::Api`], pulling the
/// `error.message` field out of the JSON body when present.
fn api_error(status: u16, body: &str) -> RunError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    RunError::Api { status, message }
}

/// Map one raw delta item to a [`DriveItem`].
fn parse_drive_item(raw: &Value) -> DriveItem {
    let parent = raw.get("parentReference");
    DriveItem {
        id: str_field(raw, "id"),
        name: str_field(raw, "name"),
        parent_id: parent.map(|p| str_field(p, "id")).unwrap_or_default(),
        parent_path: parent.map(|p| str_field(p, "path")).unwrap_or_default(),
        is_folder: raw.get("folder").is_some(),
        is_deleted: raw.get("deleted").is_some(),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Parse one delta response body into a [`ChangePage`].
fn parse_change_page(body: &Value) -> ChangePage {
    let items = body
        .get("value")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().map(parse_drive_item).collect())
        .unwrap_or_default();

    let continuation = if let Some(delta_link) = body.get("@odata.deltaLink").and_then(|v| v.as_str())
    {
        PageContinuation::Final(extract_cursor_token(delta_link))
    } else if let Some(next_link) = body.get("@odata.nextLink").and_then(|v| v.as_str()) {
        PageContinuation::Next(relative_path(next_link))
    } else {
        PageContinuation::Missing
    };

    ChangePage {
        items,
        continuation,
    }
}

/// Extract the `token` query parameter from a deltaLink URL. Some Graph
/// deployments embed the full URL instead of a bare token; in that case the
/// whole link is the cursor.
fn extract_cursor_token(delta_link: &str) -> String {
    let Some((_, query)) = delta_link.split_once('?') else {
        return delta_link.to_string();
    };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("token=") {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    delta_link.to_string()
}

/// Strip the Graph base URL from a pagination link so it can be replayed
/// through [`GraphStore::get_json`].
fn relative_path(full_url: &str) -> String {
    full_url
        .strip_prefix(GRAPH_BASE_URL)
        .unwrap_or(full_url)
        .to_string()
}

#[async_trait]
impl RemoteStore for GraphStore {
    async fn query_changes(&self, cursor: Option<&str>) -> RunResult<ChangePage> {
        let path = match cursor {
            None => self.delta_base(),
            Some(token) => format!("{}?token={}", self.delta_base(), token),
        };
        let body = self.get_json(&path).await?;
        Ok(parse_change_page(&body))
    }

    async fn query_changes_page(&self, next_link: &str) -> RunResult<ChangePage> {
        let body = self.get_json(next_link).await?;
        Ok(parse_change_page(&body))
    }

    async fn list_children(&self, folder_id: &str) -> RunResult<Vec<ChildEntry>> {
        let path = format!(
            "/users/{}/drive/items/{}/children",
            self.drive_user, folder_id
        );
        let body = self.get_json(&path).await?;
        let children = body
            .get("value")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|raw| ChildEntry {
                        id: str_field(raw, "id"),
                        name: str_field(raw, "name"),
                        is_folder: raw.get("folder").is_some(),
                        parent_path: raw
                            .get("parentReference")
                            .map(|p| str_field(p, "path"))
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(children)
    }

    async fn get_content(&self, item_id: &str) -> RunResult<Vec<u8>> {
        let token = self.acquire_token().await?;
        let path = format!("/users/{}/drive/items/{}/content", self.drive_user, item_id);
        let resp = self
            .http
            .get(format!("{}{}", GRAPH_BASE_URL, path))
            .bearer_auth(&token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn put_content(
        &self,
        folder_id: &str,
        filename: &str,
        content: &[u8],
        content_type: &str,
    ) -> RunResult<()> {
        let token = self.acquire_token().await?;
        let path = format!(
            "/users/{}/drive/items/{}:/{}:/content",
            self.drive_user, folder_id, filename
        );
        let resp = self
            .http
            .put(format!("{}{}", GRAPH_BASE_URL, path))
            .bearer_auth(&token)
            .header("Content-Type", content_type)
            .body(content.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_item_parsing_maps_graph_fields() {
        let raw = json!({
            "id": "item-1",
            "name": "a.txt",
            "parentReference": { "id": "F1", "path": "/drive/root:/Projects" },
        });
        let item = parse_drive_item(&raw);
        assert_eq!(item.id, "item-1");
        assert_eq!(item.name, "a.txt");
        assert_eq!(item.parent_id, "F1");
        assert_eq!(item.parent_path, "/drive/root:/Projects");
        assert!(!item.is_folder);
        assert!(!item.is_deleted);
    }

    #[test]
    fn folder_and_deleted_facets_are_detected() {
        let raw = json!({
            "id": "item-2",
            "name": "Reports",
            "folder": { "childCount": 3 },
            "deleted": { "state": "deleted" },
        });
        let item = parse_drive_item(&raw);
        assert!(item.is_folder);
        assert!(item.is_deleted);
    }

    #[test]
    fn delta_link_token_is_extracted_from_query() {
        let link = "https://graph.microsoft.com/v1.0/users/u/drive/root/delta?token=abc123";
        assert_eq!(extract_cursor_token(link), "abc123");
    }

    #[test]
    fn delta_link_without_token_param_is_used_whole() {
        let link = "https://graph.microsoft.com/v1.0/users/u/drive/root/delta?cursor=xyz";
        assert_eq!(extract_cursor_token(link), link);
        let bare = "https://graph.microsoft.com/v1.0/delta-opaque";
        assert_eq!(extract_cursor_token(bare), bare);
    }

    #[test]
    fn next_link_is_made_relative() {
        let link = "https://graph.microsoft.com/v1.0/users/u/drive/root/delta?skiptoken=s1";
        assert_eq!(relative_path(link), "/users/u/drive/root/delta?skiptoken=s1");
        // Unexpected hosts are passed through untouched.
        assert_eq!(relative_path("https://other/x"), "https://other/x");
    }

    #[test]
    fn page_with_delta_link_is_final() {
        let body = json!({
            "value": [{ "id": "1", "name": "a.txt", "parentReference": { "id": "F1", "path": "" } }],
            "@odata.deltaLink": "https://graph.microsoft.com/v1.0/users/u/drive/root/delta?token=t9",
        });
        let page = parse_change_page(&body);
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.continuation,
            PageContinuation::Final("t9".to_string())
        );
    }

    #[test]
    fn page_with_next_link_continues() {
        let body = json!({
            "value": [],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users/u/drive/root/delta?skiptoken=s1",
        });
        let page = parse_change_page(&body);
        assert_eq!(
            page.continuation,
            PageContinuation::Next("/users/u/drive/root/delta?skiptoken=s1".to_string())
        );
    }

    #[test]
    fn page_without_markers_is_flagged() {
        let page = parse_change_page(&json!({ "value": [] }));
        assert_eq!(page.continuation, PageContinuation::Missing);
    }

    #[test]
    fn api_error_prefers_graph_error_message() {
        let err = api_error(404, r#"{"error":{"code":"itemNotFound","message":"gone"}}"#);
        match err {
            RunError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "gone");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
