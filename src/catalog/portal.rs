//! HTTP catalog client for the portal sharing REST API.
//!
//! [`PortalClient`] implements [`CatalogClient`] against a portal's
//! `/sharing/rest` endpoints: paginated item search, per-account folder
//! enumeration, item payload fetch, and item summary fetch. Session and
//! credential bootstrap is out of scope; a pre-acquired token is carried as
//! a query parameter when configured.
//!
//! Transient transport failures and 5xx responses are retried with bounded
//! exponential backoff. Permanent failures (4xx, undecodable bodies) fail
//! fast. The portal reports many "soft" failures as a 200 response carrying
//! an `error` document; those are mapped to `None` for the item-scoped
//! lookups and to a hard error for catalog-wide listings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

use crate::constants::{MAX_BACKOFF_DELAY_MS, MAX_HTTP_RETRIES, STARTING_BACKOFF_DELAY_MS};

use super::{CatalogClient, CatalogError, CatalogItem, FolderIndex, deep_link};

/// Page size for paginated portal listings.
const PAGE_SIZE: usize = 100;

/// Catalog client backed by the portal sharing REST API.
#[derive(Debug, Clone)]
pub struct PortalClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

/// One page of search results.
#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<RawItem>,
    /// -1 signals the last page
    #[serde(default, rename = "nextStart")]
    next_start: i64,
}

/// One page of the community user listing.
#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<RawUser>,
    #[serde(default, rename = "nextStart")]
    next_start: i64,
}

#[derive(Deserialize)]
struct RawUser {
    username: String,
}

/// Folder listing under a user's content root.
#[derive(Deserialize)]
struct UserContent {
    #[serde(default)]
    folders: Vec<RawFolder>,
}

#[derive(Deserialize)]
struct RawFolder {
    id: String,
    title: String,
}

/// Item fields as the portal returns them. Everything beyond identity is
/// optional; the schema has drifted across platform versions.
#[derive(Deserialize)]
struct RawItem {
    id: String,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default, rename = "ownerFolder")]
    owner_folder: Option<String>,
}

impl RawItem {
    fn into_item(self, base_url: &str) -> CatalogItem {
        let homepage = deep_link(base_url, &self.id);
        let mut item = CatalogItem::new(
            self.id,
            self.type_tag,
            self.title.unwrap_or_default(),
            self.owner.unwrap_or_default(),
        )
        .with_homepage(homepage);
        if let Some(url) = self.url.filter(|u| !u.is_empty()) {
            item = item.with_service_url(url);
        }
        if let Some(folder) = self.owner_folder.filter(|f| !f.is_empty()) {
            item = item.with_folder(folder);
        }
        item
    }
}

impl PortalClient {
    /// Create a client for the given portal base URL.
    ///
    /// The base URL is the portal root (e.g. `https://org.maps.example.com`),
    /// not the `/sharing/rest` path.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            http: reqwest::Client::new(),
        }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/sharing/rest/{path}", self.base_url)
    }

    /// Issue one GET with `f=json` and the configured token, retrying
    /// transient failures with exponential backoff.
    async fn get_json(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, CatalogError> {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .factor(2)
            .take(MAX_HTTP_RETRIES);

        RetryIf::spawn(
            strategy,
            || self.get_json_once(operation, url, query),
            |err: &CatalogError| {
                let transient = err.is_transient();
                if transient {
                    debug!("retrying {operation} after transient failure: {err}");
                }
                transient
            },
        )
        .await
    }

    async fn get_json_once(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, CatalogError> {
        let mut request = self.http.get(url).query(&[("f", "json")]).query(query);
        if let Some(token) = &self.token {
            request = request.query(&[("token", token.as_str())]);
        }

        let response = request.send().await.map_err(|e| CatalogError::Transport {
            operation: operation.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Request {
                operation: operation.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CatalogError::InvalidResponse {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }

    fn decode<T: serde::de::DeserializeOwned>(
        operation: &str,
        value: Value,
    ) -> Result<T, CatalogError> {
        serde_json::from_value(value).map_err(|e| CatalogError::InvalidResponse {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }

    /// Whether a 200 response body is actually a portal error document.
    fn portal_error(value: &Value) -> Option<String> {
        value
            .get("error")
            .map(|err| err.get("message").and_then(Value::as_str).unwrap_or("portal error").to_string())
    }
}

impl CatalogClient for PortalClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_items(&self, max: usize) -> Result<Vec<CatalogItem>, CatalogError> {
        let url = self.rest_url("search");
        let mut items = Vec::new();
        let mut start: i64 = 1;

        while items.len() < max {
            let num = PAGE_SIZE.min(max - items.len());
            let page = self
                .get_json(
                    "search",
                    &url,
                    &[
                        ("q", "*".to_string()),
                        ("num", num.to_string()),
                        ("start", start.to_string()),
                    ],
                )
                .await?;

            if let Some(message) = Self::portal_error(&page) {
                return Err(CatalogError::Request {
                    operation: "search".to_string(),
                    status: 200,
                    reason: message,
                });
            }

            let page: SearchPage = Self::decode("search", page)?;
            if page.results.is_empty() {
                break;
            }
            items.extend(page.results.into_iter().map(|raw| raw.into_item(&self.base_url)));

            if page.next_start <= 0 {
                break;
            }
            start = page.next_start;
        }

        debug!("catalog listing returned {} items", items.len());
        Ok(items)
    }

    async fn folder_index(&self) -> Result<FolderIndex, CatalogError> {
        let users_url = self.rest_url("portals/self/users");
        let mut index = FolderIndex::new();
        let mut start: i64 = 1;

        loop {
            let page = self
                .get_json(
                    "user listing",
                    &users_url,
                    &[
                        ("num", PAGE_SIZE.to_string()),
                        ("start", start.to_string()),
                    ],
                )
                .await?;

            if let Some(message) = Self::portal_error(&page) {
                return Err(CatalogError::Request {
                    operation: "user listing".to_string(),
                    status: 200,
                    reason: message,
                });
            }

            let page: UserPage = Self::decode("user listing", page)?;
            if page.users.is_empty() {
                break;
            }

            for user in &page.users {
                let content_url = self.rest_url(&format!("content/users/{}", user.username));
                let content = self.get_json("folder listing", &content_url, &[]).await?;

                if Self::portal_error(&content).is_some() {
                    // Some accounts deny folder enumeration; their items
                    // resolve to the root label instead of failing the run.
                    warn!("folder listing denied for account {}", user.username);
                    continue;
                }

                let content: UserContent = Self::decode("folder listing", content)?;
                for folder in content.folders {
                    index.insert(&user.username, folder.id, folder.title);
                }
            }

            if page.next_start <= 0 {
                break;
            }
            start = page.next_start;
        }

        debug!("folder index holds {} folders", index.len());
        Ok(index)
    }

    async fn item_payload(&self, id: &str) -> Result<Option<Value>, CatalogError> {
        let url = self.rest_url(&format!("content/items/{id}/data"));
        let value = match self.get_json("item payload", &url, &[]).await {
            Ok(value) => value,
            // Items without a stored payload come back as 500 "not found" on
            // some platform versions; the caller treats that as no payload.
            Err(CatalogError::Request { status: 400..=599, .. })
            | Err(CatalogError::InvalidResponse { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if Self::portal_error(&value).is_some() {
            return Ok(None);
        }
        Ok(Some(value))
    }

    async fn item_summary(&self, id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        let url = self.rest_url(&format!("content/items/{id}"));
        let value = match self.get_json("item summary", &url, &[]).await {
            Ok(value) => value,
            Err(CatalogError::Request { status: 400..=499, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if Self::portal_error(&value).is_some() {
            return Ok(None);
        }

        let raw: RawItem = Self::decode("item summary", value)?;
        Ok(Some(raw.into_item(&self.base_url)))
    }
}
